use crate::storage::StorageError;

/// Errors that can occur during a block writing session
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// An operation was attempted before `start`
    #[error("Writer not started. Call start() first")]
    NotStarted,

    /// `start` was called on a session that has not been closed
    #[error("Writer already started. Call close() before starting a new output")]
    AlreadyStarted,

    /// A write or finish was attempted after the session was finished
    #[error("Writer already finished. Call close() before starting a new output")]
    AlreadyFinished,

    /// A block's schema differs from the schema fixed by the first block
    #[error("Block schema mismatch. Expected {expected}, got {found}")]
    SchemaMismatch {
        /// Schema fixed by the first non-empty block
        expected: String,
        /// Schema of the rejected block
        found: String,
    },

    /// `finish` was called before any non-empty block was written
    #[error("No blocks written. Call write_block() with a non-empty block at least once")]
    NoBlocksWritten,

    /// The destination path or bucket could not be reached
    #[error("Target unavailable: {target}: {reason}")]
    TargetUnavailable {
        /// Target location as given to `start`
        target: String,
        /// Underlying failure
        reason: String,
    },

    /// Error from the Parquet encoder
    #[error("Encoding failure: {0}")]
    EncodingFailure(#[from] parquet::errors::ParquetError),

    /// Error from the Arrow library
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from the object store client
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the storage layer
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid writer configuration, such as an unknown codec name
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WriterError {
    pub(crate) fn target_unavailable(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::TargetUnavailable {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}
