pub mod metrics;
pub mod preflight;
pub mod security_headers;
pub mod tracing;
