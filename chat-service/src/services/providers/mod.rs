//! Model provider abstractions and implementations.
//!
//! The router talks to a [`TextProvider`], the invitation branch to an
//! [`ImageProvider`]; both are trait objects so tests can swap in mocks.

pub mod image_endpoint;
pub mod mock;
pub mod openai;

use crate::models::HistoryEntry;
use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(_) => AppError::ConfigurationError(anyhow::Error::new(err)),
            _ => AppError::UpstreamError(anyhow::Error::new(err)),
        }
    }
}

/// Output of an image-generation call: either a URL the image already lives
/// at, or the encoded image itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    Url(String),
    Base64(String),
}

/// Trait for chat-completion providers constrained to JSON-object output.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Sends `system_prompt` followed by `history` and returns the raw content
    /// of the model's reply.
    async fn complete_json(
        &self,
        system_prompt: &str,
        history: &[HistoryEntry],
    ) -> Result<String, ProviderError>;
}

/// Trait for text-to-image providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError>;
}
