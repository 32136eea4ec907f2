//! Object storage backends.
//!
//! Provides a single interface over S3 (including S3-compatible endpoints
//! such as LocalStack) and a directory-backed local store, plus a standalone
//! multipart [`Uploader`] for files that were written locally first.

mod error;
mod local;
mod s3;
mod target;
mod upload;

pub use error::StorageError;
pub use local::LocalConfig;
pub use s3::{S3Config, DEFAULT_BUCKET, DEFAULT_LOCALSTACK_ENDPOINT, DEFAULT_REGION};
pub use target::RemoteTarget;
pub use upload::{UploadMethod, UploadStats, Uploader, DEFAULT_CHUNK_SIZE};

use std::sync::Arc;

use log::{debug, info};
use object_store::ObjectStore;

/// Outcome of a bucket check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    /// Bucket was already present
    Existing,
    /// Bucket was created by this call
    Created,
}

/// Where remote objects live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// AWS S3 or an S3-compatible endpoint
    S3(S3Config),
    /// Local directory with one sub-directory per bucket
    Local(LocalConfig),
}

impl StorageBackend {
    /// Bucket used for bare object keys
    pub fn default_bucket(&self) -> &str {
        match self {
            Self::S3(config) => &config.bucket_name,
            Self::Local(config) => &config.bucket_name,
        }
    }

    /// Human readable endpoint for logs
    pub fn describe(&self) -> String {
        match self {
            Self::S3(config) => format!("S3 ({})", config.endpoint_label()),
            Self::Local(config) => format!("local ({})", config.root.display()),
        }
    }

    /// Build a client for `bucket`
    pub fn store_for_bucket(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        match self {
            Self::S3(config) => config.build_store(bucket),
            Self::Local(config) => config.build_store(bucket),
        }
    }

    /// Verify that `bucket` exists, creating it when the backend can.
    ///
    /// Buckets cannot be created through the S3 object API, so a missing S3
    /// bucket yields [`StorageError::BucketMissing`].
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<BucketStatus, StorageError> {
        match self {
            Self::S3(config) => {
                let store = config.build_store(bucket)?;
                match store.list_with_delimiter(None).await {
                    Ok(_) => {
                        debug!("Bucket already exists: {}", bucket);
                        Ok(BucketStatus::Existing)
                    }
                    Err(object_store::Error::NotFound { .. }) => {
                        Err(StorageError::BucketMissing(bucket.to_string()))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Self::Local(config) => {
                if config.bucket_exists(bucket) {
                    debug!("Bucket already exists: {}", bucket);
                    return Ok(BucketStatus::Existing);
                }
                info!("Creating bucket: {}", bucket);
                tokio::fs::create_dir_all(config.bucket_dir(bucket)).await?;
                info!("Created bucket: {}", bucket);
                Ok(BucketStatus::Created)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_local_bucket_created_once() {
        let dir = tempdir().unwrap();
        let backend = StorageBackend::Local(LocalConfig::new(dir.path(), "bucket"));
        let rt = runtime();

        assert_eq!(
            rt.block_on(backend.ensure_bucket("bucket")).unwrap(),
            BucketStatus::Created
        );
        assert_eq!(
            rt.block_on(backend.ensure_bucket("bucket")).unwrap(),
            BucketStatus::Existing
        );
        assert!(backend.store_for_bucket("bucket").is_ok());
    }

    #[test]
    fn test_default_bucket_and_description() {
        let backend = StorageBackend::S3(S3Config::default());
        assert_eq!(backend.default_bucket(), DEFAULT_BUCKET);
        assert_eq!(
            backend.describe(),
            format!("S3 ({})", DEFAULT_LOCALSTACK_ENDPOINT)
        );
    }
}
