use crate::dtos::{ChatRequest, ChatResponse};
use crate::middleware::AuthUser;
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use service_core::error::AppError;

/// `POST /chat`. The body is checked before the caller is authenticated, so a
/// malformed request is a 400 regardless of credentials.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid JSON body")))?;

    let message = request.message_text().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Missing 'message' in request body."))
    })?;

    let user = AuthUser::from_headers(&headers, &state).await?;

    let reply = state
        .chat
        .handle_message(&user.uid, message, request.conversation_id())
        .await?;

    tracing::info!(
        conversation_id = %reply.conversation_id,
        reply_type = ?reply.message_type,
        "Chat turn completed"
    );

    Ok(Json(ChatResponse::from(reply)))
}
