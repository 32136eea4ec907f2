//! Local filesystem storage backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use object_store::ObjectStore;

use super::error::StorageError;

/// Directory-backed object storage. Each sub-directory of `root` is a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Directory holding one sub-directory per bucket
    pub root: PathBuf,
    /// Bucket used for bare object keys
    pub bucket_name: String,
}

impl LocalConfig {
    /// Store buckets under `root`, resolving bare keys against `bucket_name`
    pub fn new(root: impl Into<PathBuf>, bucket_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket_name: bucket_name.into(),
        }
    }

    /// Directory holding the objects of `bucket`
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    /// Build a store rooted at the bucket directory, which must exist
    pub fn build_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let dir = self.bucket_dir(bucket);
        Ok(Arc::new(LocalFileSystem::new_with_prefix(&dir)?))
    }

    pub(super) fn bucket_exists(&self, bucket: &str) -> bool {
        is_dir(&self.bucket_dir(bucket))
    }
}

fn is_dir(path: &Path) -> bool {
    path.metadata().map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_requires_bucket_directory() {
        let dir = tempdir().unwrap();
        let config = LocalConfig::new(dir.path(), "bucket");

        assert!(!config.bucket_exists("bucket"));
        assert!(config.build_store("bucket").is_err());

        std::fs::create_dir(config.bucket_dir("bucket")).unwrap();
        assert!(config.bucket_exists("bucket"));
        assert!(config.build_store("bucket").is_ok());
    }
}
