//! # Block Writer Module
//!
//! Writes Arrow record batches ("blocks") into a single Parquet file while
//! holding at most one block in memory.
//!
//! ## Design Principles
//!
//! 1. **One block, one row group**: every non-empty block is encoded and
//!    flushed as its own row group before the next block is accepted.
//!
//! 2. **Lazy encoder**: the output is opened on the first non-empty block,
//!    whose schema becomes fixed for the rest of the session.
//!
//! 3. **Explicit lifecycle**: `start` → `write_block`* → `finish` → `close`.
//!    Dropping a writer closes it, finalizing any unfinished output.
//!
//! Two destinations are provided: [`LocalBlockWriter`] for files on disk and
//! [`RemoteBlockWriter`] for objects streamed into a bucket.

mod config;
mod error;
mod local;
mod metadata;
mod remote;
mod session;
mod sink;
mod stats;


pub use config::{CompressionType, WriterConfig};
pub use error::WriterError;
pub use local::LocalBlockWriter;
pub use metadata::FileSummary;
pub use remote::RemoteBlockWriter;
pub use session::SessionState;
pub use sink::ObjectSink;
pub use stats::WriteStatistics;

use arrow::record_batch::RecordBatch;

/// A destination that accepts a stream of same-schema blocks
pub trait BlockWriter {
    /// Open a new output at `target`.
    ///
    /// Fails with [`WriterError::AlreadyStarted`] unless the writer is
    /// uninitialized, and with [`WriterError::TargetUnavailable`] when the
    /// destination cannot be prepared.
    fn start(&mut self, target: &str, compression: CompressionType) -> Result<(), WriterError>;

    /// Append one block as a row group. Empty blocks are skipped.
    fn write_block(&mut self, batch: &RecordBatch) -> Result<(), WriterError>;

    /// Write the footer and finalize the output
    fn finish(&mut self) -> Result<WriteStatistics, WriterError>;

    /// Release all session resources and return to `Uninitialized`.
    ///
    /// Never fails. An output that was started but not finished is
    /// finalized on a best-effort basis.
    fn close(&mut self);

    /// Current lifecycle state
    fn state(&self) -> SessionState;

    /// Rows accepted in the current session
    fn rows_written(&self) -> usize;

    /// Non-empty blocks accepted in the current session
    fn blocks_written(&self) -> usize;
}

impl<T: BlockWriter + ?Sized> BlockWriter for Box<T> {
    fn start(&mut self, target: &str, compression: CompressionType) -> Result<(), WriterError> {
        (**self).start(target, compression)
    }

    fn write_block(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        (**self).write_block(batch)
    }

    fn finish(&mut self) -> Result<WriteStatistics, WriterError> {
        (**self).finish()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn state(&self) -> SessionState {
        (**self).state()
    }

    fn rows_written(&self) -> usize {
        (**self).rows_written()
    }

    fn blocks_written(&self) -> usize {
        (**self).blocks_written()
    }
}
