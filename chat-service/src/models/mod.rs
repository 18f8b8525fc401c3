pub mod conversation;
pub mod message;

pub use conversation::Conversation;
pub use message::{HistoryEntry, Message, MessageType, Role};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the millisecond precision BSON dates can hold, so values
/// compare equal before and after a database round-trip.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
