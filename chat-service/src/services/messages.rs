//! Message persistence and history reads.

use crate::models::{HistoryEntry, Message, MessageType, Role};
use crate::services::{ChatDb, ConversationStore};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MessageStore {
    messages: Collection<Message>,
    conversations: ConversationStore,
}

impl MessageStore {
    pub fn new(db: &ChatDb, conversations: ConversationStore) -> Self {
        Self {
            messages: db.messages(),
            conversations,
        }
    }

    /// Inserts the message, then updates the parent's counter and timestamp.
    ///
    /// The two writes are not transactional: a failure between them leaves the
    /// message stored and the conversation metadata stale.
    pub async fn append_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: Role,
        message_type: MessageType,
        content: &str,
    ) -> Result<Message, AppError> {
        let message = Message::new(
            conversation_id.to_string(),
            user_id.to_string(),
            role,
            message_type,
            content.to_string(),
        );

        self.messages.insert_one(&message, None).await.map_err(|e| {
            tracing::error!(
                "Failed to insert message {} into database: {}",
                message.id,
                e
            );
            AppError::from(e)
        })?;

        self.conversations
            .record_append(user_id, conversation_id, message.created_at)
            .await?;

        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            role = role.as_str(),
            "Message appended"
        );

        Ok(message)
    }

    /// The `limit` newest messages, oldest first, in model-ready form.
    pub async fn recent_history(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(limit)
            .build();

        let cursor = self
            .messages
            .find(doc! { "conversation_id": conversation_id }, find_options)
            .await?;
        let newest_first: Vec<Message> = cursor.try_collect().await?;

        Ok(chronological_history(newest_first))
    }

    /// Every message of the conversation, oldest first.
    pub async fn full_history(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();

        let cursor = self
            .messages
            .find(doc! { "conversation_id": conversation_id }, find_options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    pub async fn delete_for_conversation(&self, conversation_id: &str) -> Result<u64, AppError> {
        let result = self
            .messages
            .delete_many(doc! { "conversation_id": conversation_id }, None)
            .await?;
        Ok(result.deleted_count)
    }
}

/// Turns a newest-first page of messages into oldest-first history entries.
pub fn chronological_history(mut newest_first: Vec<Message>) -> Vec<HistoryEntry> {
    newest_first.reverse();
    newest_first.iter().map(Message::to_history_entry).collect()
}
