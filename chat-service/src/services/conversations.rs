//! Conversation records: creation, ownership checks and listing.

use crate::models::Conversation;
use crate::services::ChatDb;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection};
use service_core::error::AppError;

#[derive(Clone)]
pub struct ConversationStore {
    conversations: Collection<Conversation>,
}

impl ConversationStore {
    pub fn new(db: &ChatDb) -> Self {
        Self {
            conversations: db.conversations(),
        }
    }

    /// Returns the id of an existing conversation owned by `user_id`, or of a
    /// newly created one when `conversation_id` is `None`.
    pub async fn ensure_conversation(
        &self,
        user_id: &str,
        conversation_id: Option<&str>,
        seed_message: Option<&str>,
    ) -> Result<String, AppError> {
        if let Some(conversation_id) = conversation_id {
            return match self.get_conversation_if_owned(user_id, conversation_id).await {
                Ok(conversation) => Ok(conversation.id),
                Err(AppError::NotFound(_)) => Err(AppError::AuthorizationError(anyhow::anyhow!(
                    "Invalid conversationId for this user."
                ))),
                Err(e) => Err(e),
            };
        }

        let conversation = Conversation::new(user_id.to_string(), seed_message);
        self.conversations
            .insert_one(&conversation, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to insert conversation {} into database: {}",
                    conversation.id,
                    e
                );
                AppError::from(e)
            })?;

        tracing::info!(
            conversation_id = %conversation.id,
            "Conversation created"
        );

        Ok(conversation.id)
    }

    /// All conversations of `user_id`, most recently updated first.
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, AppError> {
        let find_options = FindOptions::builder()
            .sort(doc! { "updated_at": -1 })
            .build();

        let cursor = self
            .conversations
            .find(doc! { "owner_id": user_id }, find_options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    /// Conversations of other users are indistinguishable from missing ones.
    pub async fn get_conversation_if_owned(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<Conversation, AppError> {
        self.conversations
            .find_one(doc! { "_id": conversation_id, "owner_id": user_id }, None)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Conversation not found or access denied"))
            })
    }

    /// Bumps the message counter by one and moves `updated_at` forward to
    /// `at` (never backwards).
    pub async fn record_append(
        &self,
        user_id: &str,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = self
            .conversations
            .update_one(
                doc! { "_id": conversation_id, "owner_id": user_id },
                doc! {
                    "$inc": { "message_count": 1_i64 },
                    "$max": { "updated_at": mongodb::bson::DateTime::from_chrono(at) },
                },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Conversation not found or access denied"
            )));
        }
        Ok(())
    }

    /// Removes the conversation record. Messages are removed by the caller.
    pub async fn delete_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<(), AppError> {
        let result = self
            .conversations
            .delete_one(doc! { "_id": conversation_id, "owner_id": user_id }, None)
            .await?;

        if result.deleted_count == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Conversation not found or access denied"
            )));
        }
        tracing::info!(conversation_id = %conversation_id, "Conversation deleted");
        Ok(())
    }
}
