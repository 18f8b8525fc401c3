use crate::services::identity::bearer_token;
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use service_core::error::AppError;

/// Caller identity from a verified `Authorization: Bearer` identity token.
///
/// Every request is verified afresh; nothing about the token is cached.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
}

impl AuthUser {
    /// For handlers that must validate their body before authenticating.
    pub async fn from_headers(headers: &HeaderMap, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(headers)?;
        let user = state.verifier.verify(token).await?;

        // Add to tracing span for observability
        tracing::Span::current().record("user_id", user.uid.as_str());

        Ok(AuthUser { uid: user.uid })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers, state).await
    }
}
