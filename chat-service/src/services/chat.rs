//! Per-turn chat workflow.

use crate::models::{Conversation, Message, MessageType, Role};
use crate::services::assets::AssetPublisher;
use crate::services::intent::{IntentRouter, RouterDecision};
use crate::services::metrics::{record_image_published, record_intent};
use crate::services::providers::{GeneratedImage, ImageProvider};
use crate::services::{ConversationStore, MessageStore};
use service_core::error::AppError;
use std::sync::Arc;

pub const CHAT_FALLBACK: &str = "Sorry — I couldn't generate a response.";
pub const UNKNOWN_INTENT_FALLBACK: &str = "Sorry — I couldn't understand that request.";

/// Assistant output for one turn. `data` is reply text or an image URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub conversation_id: String,
    pub message_type: MessageType,
    pub data: String,
}

#[derive(Clone)]
pub struct ChatService {
    conversations: ConversationStore,
    messages: MessageStore,
    router: IntentRouter,
    images: Arc<dyn ImageProvider>,
    assets: AssetPublisher,
    history_limit: i64,
}

impl ChatService {
    pub fn new(
        conversations: ConversationStore,
        messages: MessageStore,
        router: IntentRouter,
        images: Arc<dyn ImageProvider>,
        assets: AssetPublisher,
        history_limit: i64,
    ) -> Self {
        Self {
            conversations,
            messages,
            router,
            images,
            assets,
            history_limit,
        }
    }

    /// Stores the user's message, asks the router what to do with it and
    /// stores the assistant's answer. `message` must already be non-empty.
    pub async fn handle_message(
        &self,
        user_id: &str,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply, AppError> {
        let conversation_id = self
            .conversations
            .ensure_conversation(user_id, conversation_id, Some(message))
            .await?;

        self.messages
            .append_message(user_id, &conversation_id, Role::User, MessageType::Text, message)
            .await?;

        let history = self
            .messages
            .recent_history(&conversation_id, self.history_limit)
            .await?;

        let decision = self.router.classify(&history).await?;
        record_intent(decision.label());

        let (message_type, data) = match decision {
            RouterDecision::Chat { response } => (
                MessageType::Text,
                response.unwrap_or_else(|| CHAT_FALLBACK.to_string()),
            ),
            RouterDecision::CreateInvitation { prompt_for_model } => {
                let prompt = prompt_for_model.unwrap_or_else(|| message.to_string());
                let url = self.generate_image(&prompt, user_id, &conversation_id).await?;
                (MessageType::Image, url)
            }
            RouterDecision::Unknown(intent) => {
                tracing::warn!(intent = ?intent, "Router returned an unrecognised intent");
                (MessageType::Text, UNKNOWN_INTENT_FALLBACK.to_string())
            }
        };

        self.messages
            .append_message(user_id, &conversation_id, Role::Assistant, message_type, &data)
            .await?;

        Ok(ChatReply {
            conversation_id,
            message_type,
            data,
        })
    }

    async fn generate_image(
        &self,
        prompt: &str,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<String, AppError> {
        match self.images.generate(prompt).await? {
            GeneratedImage::Url(url) => Ok(url),
            GeneratedImage::Base64(data) => {
                let url = self.assets.publish(&data, user_id, conversation_id).await?;
                record_image_published();
                Ok(url)
            }
        }
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Conversation>, AppError> {
        self.conversations.list_conversations(user_id).await
    }

    pub async fn session_history(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<(Conversation, Vec<Message>), AppError> {
        let conversation = self
            .conversations
            .get_conversation_if_owned(user_id, conversation_id)
            .await?;
        let messages = self.messages.full_history(&conversation.id).await?;
        Ok((conversation, messages))
    }

    /// Removes the messages of an owned conversation, then the conversation
    /// itself.
    pub async fn delete_session(&self, user_id: &str, conversation_id: &str) -> Result<(), AppError> {
        let conversation = self
            .conversations
            .get_conversation_if_owned(user_id, conversation_id)
            .await?;
        let removed = self.messages.delete_for_conversation(&conversation.id).await?;
        self.conversations
            .delete_conversation(user_id, &conversation.id)
            .await?;
        tracing::info!(conversation_id, removed, "Session deleted");
        Ok(())
    }
}
