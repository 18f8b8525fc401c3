//! Same-origin proxy so browsers can render stored or external images inline.

use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Url;
use serde::Deserialize;
use service_core::error::AppError;

const DEFAULT_CONTENT_TYPE: &str = "image/png";
const CACHE_CONTROL: &str = "private, max-age=86400";

#[derive(Debug, Deserialize)]
pub struct ImageParams {
    pub url: Option<String>,
}

pub async fn proxy_image(
    State(state): State<AppState>,
    Query(params): Query<ImageParams>,
) -> Result<Response, AppError> {
    let url = params
        .url
        .as_deref()
        .and_then(|raw| Url::parse(raw).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing or invalid url")))?;

    let upstream = match state
        .http_client
        .get(url.clone())
        .header(header::ACCEPT, "image/*")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url = %url, "Image proxy fetch failed: {}", e);
            return Ok(StatusCode::BAD_GATEWAY.into_response());
        }
    };

    if !upstream.status().is_success() {
        tracing::warn!(url = %url, status = %upstream.status(), "Image proxy upstream refused");
        return Ok(upstream.status().into_response());
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let body = match upstream.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(url = %url, "Image proxy body read failed: {}", e);
            return Ok(StatusCode::BAD_GATEWAY.into_response());
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
        ],
        body,
    )
        .into_response())
}
