//! Republishes inline image data as a public URL.

use crate::services::storage::Storage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

pub const IMAGE_CONTENT_TYPE: &str = "image/png";

#[derive(Clone)]
pub struct AssetPublisher {
    storage: Option<Arc<dyn Storage>>,
}

impl AssetPublisher {
    /// `None` leaves publishing unconfigured; every call then fails with a
    /// configuration error.
    pub fn new(storage: Option<Arc<dyn Storage>>) -> Self {
        Self { storage }
    }

    pub async fn publish(
        &self,
        base64_image: &str,
        user_id: &str,
        conversation_id: &str,
    ) -> Result<String, AppError> {
        let storage = self.storage.as_ref().ok_or_else(|| {
            AppError::ConfigurationError(anyhow::anyhow!(
                "Blob client not initialized. Check BLOB_CONN_STRING/BLOB_CONTAINER."
            ))
        })?;

        let bytes = decode_image(base64_image)?;
        let key = format!("{}/{}/{}.png", user_id, conversation_id, Uuid::new_v4().simple());
        let size = bytes.len();

        let url = storage.upload(&key, bytes, IMAGE_CONTENT_TYPE).await?;

        tracing::info!(key = %key, size, "Image published");
        Ok(url)
    }
}

/// Accepts raw base64 or a `data:<mime>;base64,` URI. ASCII whitespace is
/// ignored.
pub fn decode_image(input: &str) -> Result<Vec<u8>, AppError> {
    let payload = match input.trim_start().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| AppError::ValidationError(anyhow::anyhow!("Malformed data URI")))?,
        None => input,
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| {
        AppError::ValidationError(anyhow::anyhow!("Image data is not valid base64: {}", e))
    })?;

    if bytes.is_empty() {
        return Err(AppError::ValidationError(anyhow::anyhow!("Image data is empty")));
    }
    Ok(bytes)
}
