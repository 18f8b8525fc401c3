//! Routes a user turn to a chat reply or to invitation-image generation.

use crate::models::HistoryEntry;
use crate::services::providers::TextProvider;
use serde_json::{Map, Value};
use service_core::error::AppError;
use std::sync::Arc;

pub const SYSTEM_PROMPT: &str = r#"You are a router for a chatbot.
Return ONLY valid JSON with keys:
- intent: "chat" | "create_invitation"
- response: string (only if intent="chat")
- prompt_for_model: string (only if intent="create_invitation")

Rules:
- If the user asks to generate or create an invitation image, use intent="create_invitation".
- Otherwise, use intent="chat".
"#;

/// Parsed router output. Optional fields are `None` when absent, empty or not
/// a string; the caller decides the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterDecision {
    Chat { response: Option<String> },
    CreateInvitation { prompt_for_model: Option<String> },
    /// Any other intent value, or none at all.
    Unknown(Option<String>),
}

impl RouterDecision {
    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RouterDecision::Chat { .. } => "chat",
            RouterDecision::CreateInvitation { .. } => "create_invitation",
            RouterDecision::Unknown(_) => "unknown",
        }
    }
}

#[derive(Clone)]
pub struct IntentRouter {
    provider: Arc<dyn TextProvider>,
}

impl IntentRouter {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self { provider }
    }

    pub async fn classify(&self, history: &[HistoryEntry]) -> Result<RouterDecision, AppError> {
        let content = self.provider.complete_json(SYSTEM_PROMPT, history).await?;
        let decision = parse_decision(&content)?;

        tracing::info!(intent = decision.label(), "Router decision");
        Ok(decision)
    }
}

pub fn parse_decision(content: &str) -> Result<RouterDecision, AppError> {
    let value: Value = serde_json::from_str(content).map_err(|e| {
        AppError::UpstreamError(anyhow::anyhow!("Router reply is not valid JSON: {}", e))
    })?;
    let object = value.as_object().ok_or_else(|| {
        AppError::UpstreamError(anyhow::anyhow!("Router reply is not a JSON object"))
    })?;

    let decision = match object.get("intent").and_then(Value::as_str) {
        Some("chat") => RouterDecision::Chat {
            response: non_empty_str(object, "response"),
        },
        Some("create_invitation") => RouterDecision::CreateInvitation {
            prompt_for_model: non_empty_str(object, "prompt_for_model"),
        },
        other => RouterDecision::Unknown(other.map(str::to_string)),
    };
    Ok(decision)
}

fn non_empty_str(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
