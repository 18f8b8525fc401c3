//! OpenAI-compatible chat-completions provider.

use super::{ProviderError, TextProvider};
use crate::config::OpenAiConfig;
use crate::models::HistoryEntry;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

/// Text provider backed by `POST {base_url}/chat/completions`.
pub struct OpenAiTextProvider {
    api_key: Option<Secret<String>>,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAiTextProvider {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn build_request<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [HistoryEntry],
    ) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(|entry| ChatMessage {
            role: entry.role.as_str(),
            content: &entry.content,
        }));

        ChatCompletionRequest {
            model: &self.model,
            messages,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        }
    }
}

#[async_trait]
impl TextProvider for OpenAiTextProvider {
    async fn complete_json(
        &self,
        system_prompt: &str,
        history: &[HistoryEntry],
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured(
                "OPENAI_API_KEY is missing or OpenAI client not initialized.".to_string(),
            )
        })?;

        let request = self.build_request(system_prompt, history);
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            model = %self.model,
            history_len = history.len(),
            "Sending request to chat completions API"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "Chat completions API error {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("Completion contained no message content".to_string())
            })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
