use crate::models::{Conversation, Message, MessageType, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub conversation_id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: i64,
}

impl From<Conversation> for SessionSummary {
    fn from(conversation: Conversation) -> Self {
        Self {
            conversation_id: conversation.id,
            title: conversation.title,
            created_at: conversation.created_at.to_rfc3339(),
            updated_at: conversation.updated_at.to_rfc3339(),
            message_count: conversation.message_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub role: Role,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            message_type: message.message_type,
            content: message.content,
        }
    }
}
