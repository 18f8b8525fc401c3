//! MongoDB connection and collection handles for the chat service.

use crate::config::MongoConfig;
use crate::models::{Conversation, Message};
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct ChatDb {
    client: MongoClient,
    db: Database,
    conversations_collection: String,
    messages_collection: String,
}

impl ChatDb {
    /// Builds the client. No round-trip happens here; the driver connects on
    /// first use.
    pub async fn connect(config: &MongoConfig) -> Result<Self, AppError> {
        tracing::info!(database = %config.database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(&config.uri).await.map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&config.database);
        Ok(Self {
            client,
            db,
            conversations_collection: config.conversations_collection.clone(),
            messages_collection: config.messages_collection.clone(),
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for chat-service");

        // Session listing: owner's conversations, most recently updated first
        let owner_updated_index = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "updated_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("owner_updated_idx".to_string())
                    .build(),
            )
            .build();

        self.conversations()
            .create_index(owner_updated_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create owner_updated index: {}", e);
                AppError::from(e)
            })?;

        // History reads: newest-first scan within one conversation
        let conversation_created_index = IndexModel::builder()
            .keys(doc! { "conversation_id": 1, "created_at": -1, "_id": -1 })
            .options(
                IndexOptions::builder()
                    .name("conversation_created_idx".to_string())
                    .build(),
            )
            .build();

        self.messages()
            .create_index(conversation_created_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create conversation_created index: {}", e);
                AppError::from(e)
            })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn conversations(&self) -> Collection<Conversation> {
        self.db.collection(&self.conversations_collection)
    }

    pub fn messages(&self) -> Collection<Message> {
        self.db.collection(&self.messages_collection)
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
