//! Object storage interface for export output (S3/MinIO compatible).

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, MultipartId, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::{debug, instrument};

use station_common::{ExplorerError, ExplorerResult, SessionId};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "station-exports".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

impl ObjectStorageConfig {
    /// Read the connection settings from `S3_*` environment variables,
    /// falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, fallback: String| std::env::var(name).unwrap_or(fallback);

        Self {
            endpoint: var("S3_ENDPOINT", defaults.endpoint),
            bucket: var("S3_BUCKET", defaults.bucket),
            access_key_id: var("S3_ACCESS_KEY", defaults.access_key_id),
            secret_access_key: var("S3_SECRET_KEY", defaults.secret_access_key),
            region: var("S3_REGION", defaults.region),
            allow_http: std::env::var("S3_ALLOW_HTTP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.allow_http),
        }
    }
}

/// Object storage client for exported observation files.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> ExplorerResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| ExplorerError::StorageError(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Wrap an existing store (an in-memory store in tests).
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> ExplorerResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| ExplorerError::StorageError(format!("Failed to read {}: {}", path, e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| ExplorerError::StorageError(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Start a multipart upload and return an ordered, append-only writer.
    ///
    /// The object becomes visible once the writer is shut down.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn open_writer(
        &self,
        path: &str,
    ) -> ExplorerResult<(MultipartId, Box<dyn AsyncWrite + Unpin + Send>)> {
        let location = Path::from(path);

        self.store.put_multipart(&location).await.map_err(|e| {
            ExplorerError::StorageError(format!("Failed to start upload {}: {}", path, e))
        })
    }

    /// Abort a multipart upload started with [`open_writer`](Self::open_writer).
    pub async fn abort_writer(&self, path: &str, id: &MultipartId) -> ExplorerResult<()> {
        let location = Path::from(path);

        self.store
            .abort_multipart(&location, id)
            .await
            .map_err(|e| ExplorerError::StorageError(format!("Failed to abort {}: {}", path, e)))
    }
}

/// Path builder for consistent storage layout.
pub struct StoragePath;

impl StoragePath {
    /// Build the object path of one export.
    /// Format: exports/{session}/{begin}-{end}/{stamp}.csv
    pub fn export_object(session: &SessionId, year_begin: i32, year_end: i32, stamp: &str) -> String {
        format!("exports/{}/{}-{}/{}.csv", session, year_begin, year_end, stamp)
    }
}
