pub mod chat;
pub mod sessions;

pub use chat::{ChatRequest, ChatResponse};
pub use sessions::{ConversationResponse, MessageResponse, SessionSummary};
