#![allow(dead_code)]

use axum::Router;
use chat_service::config::{
    ChatConfig, ChatSettings, FirebaseConfig, ImageEndpointConfig, MongoConfig, OpenAiConfig,
    StorageBackend, StorageConfig,
};
use chat_service::services::ChatDb;
use chat_service::startup::{router, AppState, Application};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::Secret;
use serde_json::json;
use service_core::config::Config as CoreConfig;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MONGODB_URI: &str = "mongodb://localhost:27017/?serverSelectionTimeoutMS=3000";
pub const TEST_PROJECT_ID: &str = "chat-test";
pub const TEST_USER_ID: &str = "test_user_123";
pub const OTHER_USER_ID: &str = "other_user_456";
/// Prefix of locally published asset URLs; tests swap it for the live address.
pub const PUBLIC_BASE_URL: &str = "http://assets.test";

const PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_key.pem");
const JWKS: &str = include_str!("../fixtures/test_jwks.json");
const TEST_KEY_ID: &str = "test-key-1";

/// Stand-ins for the text model, the image endpoint and the identity
/// provider's signing keys.
pub struct Upstreams {
    pub openai: MockServer,
    pub images: MockServer,
    pub identity: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        let identity = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "public, max-age=3600")
                    .set_body_raw(JWKS, "application/json"),
            )
            .mount(&identity)
            .await;

        Self {
            openai: MockServer::start().await,
            images: MockServer::start().await,
            identity,
        }
    }

    /// Every router call answers with `decision` as the model's JSON content.
    pub async fn router_replies(&self, decision: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": decision.to_string() } }]
            })))
            .mount(&self.openai)
            .await;
    }

    pub async fn image_endpoint_replies(&self, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/score"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.images)
            .await;
    }
}

pub fn test_config(upstreams: &Upstreams, db_name: &str, storage_dir: &Path) -> ChatConfig {
    ChatConfig {
        common: CoreConfig {
            port: 0,
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        mongodb: MongoConfig {
            uri: MONGODB_URI.to_string(),
            database: db_name.to_string(),
            conversations_collection: "conversations".to_string(),
            messages_collection: "messages".to_string(),
        },
        openai: OpenAiConfig {
            api_key: Some(Secret::new("sk-test".to_string())),
            base_url: format!("{}/v1", upstreams.openai.uri()),
            model: "gpt-4.1-nano".to_string(),
        },
        image: ImageEndpointConfig {
            endpoint: Some(format!("{}/score", upstreams.images.uri())),
            token: Some(Secret::new("ml-token".to_string())),
            timeout_secs: 5,
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            local_path: storage_dir.to_string_lossy().to_string(),
            public_base_url: PUBLIC_BASE_URL.to_string(),
            azure_connection_string: None,
            azure_container: "invites".to_string(),
        },
        firebase: FirebaseConfig {
            service_account_json: Some(Secret::new(
                json!({ "type": "service_account", "project_id": TEST_PROJECT_ID }).to_string(),
            )),
            jwks_url: format!("{}/jwks", upstreams.identity.uri()),
        },
        chat: ChatSettings { history_limit: 20 },
    }
}

/// A signed identity token for `uid`, accepted by the test key set.
pub fn mint_token(uid: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": uid,
        "aud": TEST_PROJECT_ID,
        "iss": format!("https://securetoken.google.com/{}", TEST_PROJECT_ID),
        "iat": now,
        "exp": now + 3600,
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KEY_ID.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).expect("Invalid test key");
    encode(&header, &claims, &key).expect("Failed to sign test token")
}

pub fn bearer(uid: &str) -> String {
    format!("Bearer {}", mint_token(uid))
}

/// Router with real collaborators but no database round-trip at build time.
/// Only routes that never reach MongoDB may be exercised through it.
pub async fn offline_router(upstreams: &Upstreams, storage_dir: &Path) -> Router {
    let config = test_config(upstreams, "unused", storage_dir);
    let db = ChatDb::connect(&config.mongodb)
        .await
        .expect("Failed to create MongoDB client");
    let state = AppState::build(config, db)
        .await
        .expect("Failed to build application state");
    router(state)
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: ChatDb,
    pub db_name: String,
    pub upstreams: Upstreams,
    pub storage_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Starts the full application on a random port against a fresh database.
    pub async fn spawn() -> Self {
        let upstreams = Upstreams::start().await;
        let storage_dir = TempDir::new().expect("Failed to create storage dir");
        let db_name = format!("chat_test_{}", Uuid::new_v4().simple());
        let config = test_config(&upstreams, &db_name, storage_dir.path());

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            db_name,
            upstreams,
            storage_dir,
            client,
        }
    }

    pub async fn post_chat(&self, uid: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.address))
            .header("Authorization", bearer(uid))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_as(&self, uid: &str, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .header("Authorization", bearer(uid))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete_as(&self, uid: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .header("Authorization", bearer(uid))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Rewrites a published asset URL to point at this instance.
    pub fn local_asset_url(&self, published: &str) -> String {
        published.replacen(PUBLIC_BASE_URL, &self.address, 1)
    }

    pub async fn cleanup(&self) {
        let _ = self.db.client().database(&self.db_name).drop(None).await;
    }
}

/// A database handle on a fresh, uniquely named database.
pub async fn test_db() -> ChatDb {
    let db = ChatDb::connect(&MongoConfig {
        uri: MONGODB_URI.to_string(),
        database: format!("chat_store_test_{}", Uuid::new_v4().simple()),
        conversations_collection: "conversations".to_string(),
        messages_collection: "messages".to_string(),
    })
    .await
    .expect("Failed to create MongoDB client");
    db.initialize_indexes()
        .await
        .expect("Failed to initialize indexes");
    db
}
