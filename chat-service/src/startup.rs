use crate::config::{ChatConfig, StorageBackend};
use crate::handlers;
use crate::services::providers::image_endpoint::EndpointImageProvider;
use crate::services::providers::openai::OpenAiTextProvider;
use crate::services::{
    AssetPublisher, AzureBlobStorage, ChatDb, ChatService, ConversationStore,
    FirebaseVerifier, IntentRouter, LocalStorage, MessageStore, Storage, TokenVerifier,
};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    preflight::preflight_middleware,
    security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,
    pub db: ChatDb,
    pub chat: ChatService,
    pub verifier: Arc<dyn TokenVerifier>,
    pub http_client: reqwest::Client,
    /// Directory served at `/assets` when images are stored locally.
    pub local_assets: Option<PathBuf>,
}

impl AppState {
    /// Wires every collaborator from configuration. No network round-trip
    /// happens here.
    pub async fn build(config: ChatConfig, db: ChatDb) -> Result<Self, AppError> {
        let conversations = ConversationStore::new(&db);
        let messages = MessageStore::new(&db, conversations.clone());

        let text_provider = OpenAiTextProvider::new(&config.openai);
        if !text_provider.is_configured() {
            tracing::warn!("OPENAI_API_KEY not set; chat requests will fail until it is configured");
        }
        let image_provider = EndpointImageProvider::new(&config.image)?;
        if !image_provider.is_configured() {
            tracing::warn!("Image endpoint not configured; invitation requests will fail");
        }

        let (storage, local_assets) = build_storage(&config).await?;

        let chat = ChatService::new(
            conversations,
            messages,
            IntentRouter::new(Arc::new(text_provider)),
            Arc::new(image_provider),
            AssetPublisher::new(storage),
            config.chat.history_limit,
        );

        Ok(Self {
            verifier: Arc::new(FirebaseVerifier::new(&config.firebase)),
            config,
            db,
            chat,
            http_client: reqwest::Client::new(),
            local_assets,
        })
    }
}

async fn build_storage(
    config: &ChatConfig,
) -> Result<(Option<Arc<dyn Storage>>, Option<PathBuf>), AppError> {
    match config.storage.backend {
        StorageBackend::Local => {
            let storage = LocalStorage::new(
                &config.storage.local_path,
                &config.storage.public_base_url,
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to initialize local storage at {}: {}",
                    config.storage.local_path,
                    e
                );
                e
            })?;
            let dir = storage.base_path().clone();
            let storage: Arc<dyn Storage> = Arc::new(storage);
            Ok((Some(storage), Some(dir)))
        }
        StorageBackend::Azure => match &config.storage.azure_connection_string {
            Some(conn) => {
                let storage = AzureBlobStorage::from_connection_string(
                    conn.expose_secret(),
                    &config.storage.azure_container,
                )?;
                tracing::info!(
                    account = %storage.account(),
                    container = %config.storage.azure_container,
                    "Using Azure Blob Storage"
                );
                let storage: Arc<dyn Storage> = Arc::new(storage);
                Ok((Some(storage), None))
            }
            None => {
                tracing::warn!("BLOB_CONN_STRING not set; image publishing is disabled");
                Ok((None, None))
            }
        },
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/sessions", get(handlers::list_sessions))
        .route(
            "/sessions/:conversation_id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/chat", post(handlers::chat))
        .route("/image", get(handlers::proxy_image));

    if let Some(dir) = &state.local_assets {
        app = app.nest_service("/assets", ServeDir::new(dir));
    }

    // Outermost last: preflight rewrites whatever CORS and routing produced.
    app.layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
        .layer(from_fn(preflight_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let db = ChatDb::connect(&config.mongodb).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            e
        })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let state = AppState::build(config.clone(), db).await?;
        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &ChatDb {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
