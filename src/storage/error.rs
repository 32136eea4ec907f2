use std::path::PathBuf;

/// Errors that can occur while talking to object storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Error from the object store client
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// I/O error on the local filesystem
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Target could not be parsed into a bucket and key
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Bucket does not exist and the backend cannot create it
    #[error("Bucket does not exist and cannot be created by this backend: {0}")]
    BucketMissing(String),

    /// Local file to upload does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid backend configuration
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),
}
