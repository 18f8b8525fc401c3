use super::now_millis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix used when an image reply is replayed to the text model.
pub const IMAGE_HISTORY_MARKER: &str = "[Generated image]";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
}

/// One immutable turn of a conversation. For `MessageType::Image` the content
/// is the public URL of the image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub conversation_id: String,
    pub owner_id: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        conversation_id: String,
        owner_id: String,
        role: Role,
        message_type: MessageType,
        content: String,
    ) -> Self {
        Self {
            // v7 ids sort by creation time, which breaks created_at ties.
            id: format!("msg_{}", Uuid::now_v7().simple()),
            conversation_id,
            owner_id,
            role,
            message_type,
            content,
            created_at: now_millis(),
        }
    }

    /// Textual form of this message as fed back to the text model.
    pub fn to_history_entry(&self) -> HistoryEntry {
        let content = match self.message_type {
            MessageType::Text => self.content.clone(),
            MessageType::Image => format!("{} {}", IMAGE_HISTORY_MARKER, self.content),
        };
        HistoryEntry {
            role: self.role,
            content,
        }
    }
}

/// A `{role, content}` pair of conversation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
