//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by one of the keys Google publishes as a JWK
//! set. The key set is cached for the `max-age` the endpoint advertises;
//! verified tokens themselves are never cached.

use crate::config::FirebaseConfig;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::AppError;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Used when the key endpoint sends no usable `Cache-Control: max-age`.
const DEFAULT_KEYS_MAX_AGE: Duration = Duration::from_secs(3600);

/// An unknown `kid` triggers a refetch at most this often.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Identity established by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, AppError>;
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::AuthenticationError(anyhow::anyhow!(
                "Missing Authorization: Bearer <firebase_id_token> header."
            ))
        })
}

#[derive(Debug, Deserialize)]
struct ServiceAccount {
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    #[serde(default)]
    sub: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    max_age: Duration,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.max_age
    }
}

pub struct FirebaseVerifier {
    service_account_json: Option<Secret<String>>,
    project_id: OnceLock<Result<String, String>>,
    jwks_url: String,
    client: Client,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            service_account_json: config.service_account_json.clone(),
            project_id: OnceLock::new(),
            jwks_url: config.jwks_url.clone(),
            client: Client::new(),
            keys: RwLock::new(None),
        }
    }

    /// Parsed from the service-account credential on first use; the outcome,
    /// success or failure, is kept for the life of the process.
    fn project_id(&self) -> Result<&str, AppError> {
        let parsed = self.project_id.get_or_init(|| {
            let raw = self
                .service_account_json
                .as_ref()
                .ok_or_else(|| "Missing FIREBASE_SERVICE_ACCOUNT_JSON in app settings.".to_string())?;
            let account: ServiceAccount = serde_json::from_str(raw.expose_secret())
                .map_err(|e| format!("Invalid FIREBASE_SERVICE_ACCOUNT_JSON: {}", e))?;
            Ok(account.project_id)
        });

        parsed
            .as_deref()
            .map_err(|e| AppError::ConfigurationError(anyhow::anyhow!(e.clone())))
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AppError> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                let may_refresh = cached.fetched_at.elapsed() >= MIN_REFRESH_INTERVAL;
                if let Some(jwk) = cached.keys.find(kid) {
                    if cached.is_fresh() {
                        return key_from_jwk(jwk);
                    }
                } else if !may_refresh {
                    return Err(unknown_kid(kid));
                }
            }
        }

        let mut cached = self.keys.write().await;
        // Another request may have refreshed while we waited for the lock.
        let still_usable = cached
            .as_ref()
            .is_some_and(|c| c.is_fresh() && c.keys.find(kid).is_some());
        if !still_usable {
            *cached = Some(self.fetch_keys().await?);
        }

        cached
            .as_ref()
            .and_then(|c| c.keys.find(kid))
            .ok_or_else(|| unknown_kid(kid))
            .and_then(key_from_jwk)
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, AppError> {
        tracing::debug!(url = %self.jwks_url, "Fetching token signing keys");

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AppError::UpstreamError(anyhow::anyhow!("Failed to fetch signing keys: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamError(anyhow::anyhow!(
                "Signing key endpoint returned {}",
                response.status()
            )));
        }

        let max_age = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_KEYS_MAX_AGE);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamError(anyhow::anyhow!("Invalid signing key set: {}", e)))?;

        tracing::info!(keys = keys.keys.len(), max_age_secs = max_age.as_secs(), "Signing keys refreshed");

        Ok(CachedKeys {
            keys,
            fetched_at: Instant::now(),
            max_age,
        })
    }
}

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, AppError> {
        let project_id = self.project_id()?;

        let header = decode_header(token).map_err(invalid_token)?;
        if header.alg != Algorithm::RS256 {
            return Err(invalid_token(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| invalid_token("token header has no kid"))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("{}{}", ISSUER_PREFIX, project_id)]);

        let claims = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(invalid_token)?
            .claims;

        let uid = claims.sub.filter(|s| !s.is_empty()).ok_or_else(|| {
            AppError::AuthenticationError(anyhow::anyhow!("Firebase token verified but uid not found."))
        })?;

        Ok(VerifiedUser { uid })
    }
}

fn key_from_jwk(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, AppError> {
    DecodingKey::from_jwk(jwk)
        .map_err(|e| AppError::UpstreamError(anyhow::anyhow!("Unusable signing key: {}", e)))
}

fn unknown_kid(kid: &str) -> AppError {
    invalid_token(format!("no signing key with kid {}", kid))
}

fn invalid_token(reason: impl std::fmt::Display) -> AppError {
    tracing::debug!(%reason, "Token rejected");
    AppError::AuthenticationError(anyhow::anyhow!("Invalid or expired token"))
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
