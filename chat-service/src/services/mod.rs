pub mod assets;
pub mod chat;
pub mod conversations;
pub mod database;
pub mod identity;
pub mod intent;
pub mod messages;
pub mod metrics;
pub mod providers;
pub mod storage;

pub use assets::AssetPublisher;
pub use chat::{ChatReply, ChatService};
pub use conversations::ConversationStore;
pub use database::ChatDb;
pub use identity::{FirebaseVerifier, TokenVerifier, VerifiedUser};
pub use intent::{IntentRouter, RouterDecision};
pub use messages::MessageStore;
pub use storage::{AzureBlobStorage, LocalStorage, Storage};
