use crate::dtos::{ConversationResponse, MessageResponse, SessionSummary};
use crate::middleware::AuthUser;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let conversations = state.chat.list_sessions(&user.uid).await?;
    Ok(Json(
        conversations.into_iter().map(SessionSummary::from).collect(),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let (conversation, messages) = state
        .chat
        .session_history(&user.uid, &conversation_id)
        .await?;

    Ok(Json(ConversationResponse {
        conversation_id: conversation.id,
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.chat.delete_session(&user.uid, &conversation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
