/// Errors that can occur while producing blocks
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Error assembling a record batch
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A page could not be fetched from the transaction API
    #[error("Failed to fetch page {page}: {reason}")]
    Fetch {
        /// Requested page number (1-based)
        page: u32,
        /// Underlying failure
        reason: String,
    },

    /// Invalid source parameters, such as a zero block size
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A block could not be copied to the verification CSV
    #[error("Failed to mirror block to CSV: {0}")]
    Mirror(#[from] crate::verify::VerifyError),
}
