//! Storage for rendered heatmaps.
//!
//! Provides an object storage client (MinIO/S3 compatible) used to publish
//! rendered images, with an in-memory backend for tests.

pub mod error;
pub mod object_store;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StoragePath, DEFAULT_CONTENT_TYPE};
pub use error::{StorageError, StorageResult};
