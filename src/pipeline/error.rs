use crate::config::ConfigError;
use crate::source::SourceError;
use crate::storage::StorageError;
use crate::verify::VerifyError;
use crate::writer::WriterError;

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The block source failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The block writer failed
    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),

    /// Uploading the finished file failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The run configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Round-trip verification could not be carried out
    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),
}
