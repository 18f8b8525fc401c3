use crate::models::MessageType;
use crate::services::ChatReply;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// The trimmed message, or `None` when absent, not a string or blank.
    pub fn message_text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// An empty id is treated the same as no id.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub conversation_id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub data: String,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            conversation_id: reply.conversation_id,
            message_type: reply.message_type,
            data: reply.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ChatRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn message_is_trimmed() {
        assert_eq!(parse(r#"{"message":"  hi  "}"#).message_text(), Some("hi"));
    }

    #[test]
    fn blank_missing_or_non_string_message_is_absent() {
        assert_eq!(parse(r#"{"message":"   "}"#).message_text(), None);
        assert_eq!(parse(r#"{}"#).message_text(), None);
        assert_eq!(parse(r#"{"message":42}"#).message_text(), None);
        assert_eq!(parse(r#"{"message":null}"#).message_text(), None);
    }

    #[test]
    fn empty_or_null_conversation_id_is_absent() {
        assert_eq!(parse(r#"{"message":"x","conversationId":""}"#).conversation_id(), None);
        assert_eq!(parse(r#"{"message":"x","conversationId":null}"#).conversation_id(), None);
        assert_eq!(
            parse(r#"{"message":"x","conversationId":"conv_1"}"#).conversation_id(),
            Some("conv_1")
        );
    }

    #[test]
    fn response_uses_wire_field_names() {
        let json = serde_json::to_value(ChatResponse {
            conversation_id: "conv_1".to_string(),
            message_type: MessageType::Image,
            data: "https://img".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "conversationId": "conv_1", "type": "image", "data": "https://img" })
        );
    }
}
