//! Storage module for report images
//!
//! Provides the [`ImageStorage`] port used by report submission and its
//! MinIO/S3-compatible implementation.

mod minio_client;

use async_trait::async_trait;

use crate::core::error::Result;

pub use minio_client::MinIOClient;

/// An object written to storage
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    /// Object key within the bucket
    pub key: String,
    /// Publicly reachable URL of the object
    pub url: String,
}

/// Object storage port for report images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Upload an image for `report_id` and return where it was stored
    async fn upload_report_image(
        &self,
        report_id: i64,
        data: Vec<u8>,
        content_type: &str,
        extension: &str,
    ) -> Result<StoredObject>;

    /// Delete a previously stored object
    async fn delete(&self, key: &str) -> Result<()>;
}
