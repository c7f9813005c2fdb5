//! Storage error types.

use heatmap_common::HeatmapError;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage configuration: {0}")]
    Config(String),

    #[error("Failed to read local file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload {key}: {source}")]
    Upload {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Storage request for {key} failed: {source}")]
    Request {
        key: String,
        #[source]
        source: object_store::Error,
    },
}

impl From<StorageError> for HeatmapError {
    fn from(err: StorageError) -> Self {
        HeatmapError::UploadError(err.to_string())
    }
}
