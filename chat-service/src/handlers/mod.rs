pub mod chat;
pub mod health;
pub mod image_proxy;
pub mod sessions;

pub use chat::chat;
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use image_proxy::proxy_image;
pub use sessions::{delete_session, get_session, list_sessions};
