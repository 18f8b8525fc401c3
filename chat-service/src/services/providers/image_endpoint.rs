//! Image generation through a hosted inference endpoint.
//!
//! The endpoint takes `{"prompt": "..."}` and answers with either
//! `image_url` or `image_base64`.

use super::{GeneratedImage, ImageProvider, ProviderError};
use crate::config::ImageEndpointConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;

pub struct EndpointImageProvider {
    endpoint: Option<String>,
    token: Option<Secret<String>>,
    timeout_secs: u64,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

impl EndpointImageProvider {
    pub fn new(config: &ImageEndpointConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.token.is_some()
    }
}

#[async_trait]
impl ImageProvider for EndpointImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let (endpoint, token) = match (&self.endpoint, &self.token) {
            (Some(endpoint), Some(token)) => (endpoint, token),
            _ => {
                return Err(ProviderError::NotConfigured(
                    "Missing IMAGE_ENDPOINT_URL or IMAGE_ENDPOINT_TOKEN.".to_string(),
                ))
            }
        };

        tracing::info!(prompt_len = prompt.len(), "Requesting image generation");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(token.expose_secret())
            .json(&GenerateRequest { prompt })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "Image endpoint error {}: {}",
                status, error_text
            )));
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else {
                ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
            }
        })?;

        parse_generated_image(&payload)
    }
}

/// `image_url` takes precedence; empty strings count as absent.
pub fn parse_generated_image(payload: &serde_json::Value) -> Result<GeneratedImage, ProviderError> {
    let non_empty = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(url) = non_empty("image_url") {
        return Ok(GeneratedImage::Url(url));
    }
    if let Some(data) = non_empty("image_base64") {
        return Ok(GeneratedImage::Base64(data));
    }
    Err(ProviderError::InvalidResponse(
        "Image endpoint response missing image_url/image_base64.".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(endpoint: Option<String>, timeout_secs: u64) -> EndpointImageProvider {
        EndpointImageProvider::new(&ImageEndpointConfig {
            endpoint,
            token: Some(Secret::new("ml-token".to_string())),
            timeout_secs,
        })
        .unwrap()
    }

    #[test]
    fn url_wins_over_base64() {
        let image = parse_generated_image(&json!({
            "image_url": "https://img/1.png",
            "image_base64": "AAAA"
        }))
        .unwrap();
        assert_eq!(image, GeneratedImage::Url("https://img/1.png".to_string()));
    }

    #[test]
    fn empty_url_falls_back_to_base64() {
        let image = parse_generated_image(&json!({ "image_url": "", "image_base64": "AAAA" })).unwrap();
        assert_eq!(image, GeneratedImage::Base64("AAAA".to_string()));
    }

    #[test]
    fn neither_field_is_invalid_response() {
        let err = parse_generated_image(&json!({ "status": "ok" })).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn posts_prompt_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/score"))
            .and(header("authorization", "Bearer ml-token"))
            .and(body_json(json!({ "prompt": "birthday invitation" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "image_url": "https://img/2.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let image = provider(Some(format!("{}/score", server.uri())), 5)
            .generate("birthday invitation")
            .await
            .unwrap();
        assert_eq!(image, GeneratedImage::Url("https://img/2.png".to_string()));
    }

    #[tokio::test]
    async fn error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = provider(Some(server.uri()), 5).generate("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError(_)));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "image_url": "https://img/late.png" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = provider(Some(server.uri()), 1).generate("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(1)));
    }

    #[tokio::test]
    async fn missing_endpoint_is_not_configured() {
        let err = provider(None, 5).generate("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(!provider(None, 5).is_configured());
    }
}
