//! Object storage interface for rendered heatmaps (MinIO/S3 compatible).

use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder, memory::InMemory, path::Path, Attribute, Attributes, ObjectStore,
    PutOptions,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{StorageError, StorageResult};

/// Content type used for heatmap uploads unless the caller overrides it.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

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
            bucket: "heatmaps".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

/// Object storage client for heatmap images.
#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::Config("bucket name must not be empty".to_string()));
        }

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
            .map_err(|e| StorageError::Config(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::from_store(Arc::new(store), &config.bucket))
    }

    /// Wrap an existing store.
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
        }
    }

    /// In-process store, for tests and local runs without S3.
    pub fn in_memory(bucket: &str) -> Self {
        Self::from_store(Arc::new(InMemory::new()), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload a local file under `key` and return the storage ETag.
    ///
    /// No retries; store errors (credentials, validation, client) are
    /// returned as they come.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn upload_file(
        &self,
        file_path: &std::path::Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let data = tokio::fs::read(file_path)
            .await
            .map_err(|source| StorageError::FileRead {
                path: file_path.display().to_string(),
                source,
            })?;
        let size = data.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let result = self
            .store
            .put_opts(&Path::from(key), Bytes::from(data).into(), opts)
            .await
            .map_err(|source| StorageError::Upload {
                key: key.to_string(),
                source,
            })?;

        let etag = result.e_tag.unwrap_or_default();
        info!(key = %key, size, etag = %etag, "Uploaded heatmap");
        Ok(etag)
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StorageResult<Option<String>> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        let result = self
            .store
            .put(&location, data.into())
            .await
            .map_err(|source| StorageError::Upload {
                key: path.to_string(),
                source,
            })?;

        Ok(result.e_tag)
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);
        let request_err = |source| StorageError::Request {
            key: path.to_string(),
            source,
        };

        let result = self.store.get(&location).await.map_err(request_err)?;
        let bytes = result.bytes().await.map_err(request_err)?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Content type recorded for an object, if any.
    pub async fn content_type(&self, path: &str) -> StorageResult<Option<String>> {
        let result = self
            .store
            .get(&Path::from(path))
            .await
            .map_err(|source| StorageError::Request {
                key: path.to_string(),
                source,
            })?;

        Ok(result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| String::from(&**v)))
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(source) => Err(StorageError::Request {
                key: path.to_string(),
                source,
            }),
        }
    }

    /// List objects with a given prefix.
    pub async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|source| StorageError::Request {
                key: prefix.to_string(),
                source,
            })?
        {
            paths.push(meta.location.to_string());
        }

        paths.sort();
        Ok(paths)
    }

    /// Delete an object.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        let location = Path::from(path);

        self.store
            .delete(&location)
            .await
            .map_err(|source| StorageError::Request {
                key: path.to_string(),
                source,
            })?;

        Ok(())
    }
}

/// Key builder for consistent storage layout.
pub struct StoragePath;

impl StoragePath {
    /// Object key for an uploaded image.
    /// Format: {prefix}/{image_id}, or just {image_id} without a prefix
    pub fn heatmap(prefix: Option<&str>, image_id: &str) -> String {
        match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}/{}", prefix, image_id),
            None => image_id.to_string(),
        }
    }
}
