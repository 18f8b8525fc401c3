use super::now_millis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used when a conversation is created without a seed message.
pub const DEFAULT_TITLE: &str = "Chat";

/// Characters of the seed message kept in a derived title.
pub const TITLE_MAX_CHARS: usize = 50;

/// A thread of messages owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub message_count: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(owner_id: String, seed_message: Option<&str>) -> Self {
        let now = now_millis();
        Self {
            id: format!("conv_{}", Uuid::new_v4().simple()),
            owner_id,
            title: derive_title(seed_message),
            message_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// First [`TITLE_MAX_CHARS`] characters of the seed, with `...` appended when
/// anything was cut off.
pub fn derive_title(seed_message: Option<&str>) -> String {
    match seed_message {
        Some(seed) if !seed.is_empty() => {
            let mut chars = seed.chars();
            let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
            if chars.next().is_some() {
                format!("{}...", head)
            } else {
                head
            }
        }
        _ => DEFAULT_TITLE.to_string(),
    }
}
