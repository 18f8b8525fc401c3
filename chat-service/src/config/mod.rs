use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Messages of context sent to the router model.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Upper bound on a single image-generation call.
pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub openai: OpenAiConfig,
    pub image: ImageEndpointConfig,
    pub storage: StorageConfig,
    pub firebase: FirebaseConfig,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub conversations_collection: String,
    pub messages_collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// Requests fail with a configuration error while unset.
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageEndpointConfig {
    pub endpoint: Option<String>,
    pub token: Option<Secret<String>>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: String,
    /// Prefix for URLs of locally stored assets, e.g. `https://chat.example.com`.
    pub public_base_url: String,
    pub azure_connection_string: Option<Secret<String>>,
    pub azure_container: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Azure,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirebaseConfig {
    pub service_account_json: Option<Secret<String>>,
    pub jwks_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    pub history_limit: i64,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ChatConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("chat_db"), is_prod)?,
                conversations_collection: get_env(
                    "MONGODB_CONVERSATIONS_COLLECTION",
                    Some("conversations"),
                    is_prod,
                )?,
                messages_collection: get_env(
                    "MONGODB_MESSAGES_COLLECTION",
                    Some("messages"),
                    is_prod,
                )?,
            },
            openai: OpenAiConfig {
                api_key: get_secret("OPENAI_API_KEY"),
                base_url: get_env("OPENAI_BASE_URL", Some("https://api.openai.com/v1"), is_prod)?,
                model: get_env("OPENAI_MODEL", Some("gpt-4.1-nano"), is_prod)?,
            },
            image: ImageEndpointConfig {
                endpoint: get_optional("IMAGE_ENDPOINT_URL"),
                token: get_secret("IMAGE_ENDPOINT_TOKEN"),
                timeout_secs: parse_positive(
                    "IMAGE_ENDPOINT_TIMEOUT_SECS",
                    &get_env(
                        "IMAGE_ENDPOINT_TIMEOUT_SECS",
                        Some(&DEFAULT_IMAGE_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                )?,
            },
            storage: StorageConfig {
                backend: get_env("STORAGE_BACKEND", Some("local"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigurationError(anyhow::anyhow!(e)))?,
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage"), is_prod)?,
                public_base_url: get_env(
                    "PUBLIC_BASE_URL",
                    Some("http://localhost:8080"),
                    is_prod,
                )?,
                azure_connection_string: get_secret("BLOB_CONN_STRING"),
                azure_container: get_env("BLOB_CONTAINER", Some("invites"), is_prod)?,
            },
            firebase: FirebaseConfig {
                service_account_json: get_secret("FIREBASE_SERVICE_ACCOUNT_JSON"),
                jwks_url: get_env("FIREBASE_JWKS_URL", Some(DEFAULT_FIREBASE_JWKS_URL), is_prod)?,
            },
            chat: ChatSettings {
                history_limit: parse_positive(
                    "CHAT_HISTORY_LIMIT",
                    &get_env(
                        "CHAT_HISTORY_LIMIT",
                        Some(&DEFAULT_HISTORY_LIMIT.to_string()),
                        is_prod,
                    )?,
                )?,
            },
        })
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "azure" => Ok(StorageBackend::Azure),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigurationError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigurationError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Numeric settings must parse and be greater than zero.
fn parse_positive<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(AppError::ConfigurationError(anyhow::anyhow!(
            "{} must be a positive integer, got '{}'",
            key,
            raw
        ))),
    }
}

/// Collaborator settings that may be absent; the owning client reports a
/// configuration error when it is first used.
fn get_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_secret(key: &str) -> Option<Secret<String>> {
    get_optional(key).map(Secret::new)
}
