use async_trait::async_trait;
use azure_core::StatusCode;
use azure_storage::{CloudLocation, ConnectionString};
use azure_storage_blobs::prelude::{BlobClient, ClientBuilder, ContainerClient};
use axum::body::Bytes;
use service_core::error::AppError;
use std::path::PathBuf;
use tokio::fs;

const PUBLIC_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Object storage whose objects are readable without credentials.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores `data` under `key` and returns the object's public URL.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError>;
}

/// Files under a local directory, served by this process at `/assets`.
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: &str,
    ) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<String, AppError> {
        let path = self.base_path.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(format!("{}/assets/{}", self.public_base_url, key))
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.base_path.join(key);
        let data = fs::read(path).await?;
        Ok(data)
    }
}

/// Azure Blob Storage container. The container must allow anonymous blob
/// reads for the returned URLs to resolve.
pub struct AzureBlobStorage {
    account: String,
    container: ContainerClient,
}

impl AzureBlobStorage {
    /// Builds the container client from a storage connection string.
    /// `BlobEndpoint` wins over `EndpointSuffix`.
    pub fn from_connection_string(conn: &str, container: &str) -> Result<Self, AppError> {
        let parsed = ConnectionString::new(conn).map_err(|e| {
            AppError::ConfigurationError(anyhow::anyhow!("Invalid BLOB_CONN_STRING: {}", e))
        })?;
        let account = parsed
            .account_name
            .ok_or_else(|| {
                AppError::ConfigurationError(anyhow::anyhow!("BLOB_CONN_STRING is missing AccountName"))
            })?
            .to_string();
        let credentials = parsed.storage_credentials().map_err(|e| {
            AppError::ConfigurationError(anyhow::anyhow!("Invalid BLOB_CONN_STRING credentials: {}", e))
        })?;

        let custom_uri = match (parsed.blob_endpoint, parsed.endpoint_suffix) {
            (Some(endpoint), _) => Some(endpoint.trim_end_matches('/').to_string()),
            (None, Some(suffix)) if suffix != PUBLIC_ENDPOINT_SUFFIX => {
                Some(format!("https://{}.blob.{}", account, suffix))
            }
            _ => None,
        };
        let builder = match custom_uri {
            Some(uri) => ClientBuilder::with_location(
                CloudLocation::Custom {
                    account: account.clone(),
                    uri,
                },
                credentials,
            ),
            None => ClientBuilder::new(account.clone(), credentials),
        };

        Ok(Self {
            container: builder.container_client(container),
            account,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    fn blob(&self, key: &str) -> BlobClient {
        self.container.blob_client(key)
    }

    /// Public URL of the blob stored under `key`.
    pub fn blob_url(&self, key: &str) -> Result<String, AppError> {
        self.blob(key)
            .url()
            .map(|url| url.to_string())
            .map_err(|e| AppError::ConfigurationError(anyhow::anyhow!("Invalid blob URL: {}", e)))
    }
}

#[async_trait]
impl Storage for AzureBlobStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        self.blob(key)
            .put_block_blob(Bytes::from(data))
            .content_type(content_type.to_string())
            .await
            .map_err(|e| {
                tracing::error!(key, error = %e, "Blob upload rejected");
                AppError::UpstreamError(anyhow::anyhow!("Blob upload failed: {}", e))
            })?;

        tracing::info!(key, account = %self.account, "Blob uploaded");
        self.blob_url(key)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, AppError> {
        self.blob(key).get_content().await.map_err(|e| {
            match e.as_http_error().map(|http| http.status()) {
                Some(StatusCode::NotFound) => {
                    AppError::NotFound(anyhow::anyhow!("Blob {} not found", key))
                }
                _ => AppError::UpstreamError(anyhow::anyhow!("Blob download failed: {}", e)),
            }
        })
    }
}
