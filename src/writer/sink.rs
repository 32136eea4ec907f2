//! Synchronous `std::io::Write` adaptor over an object store upload.
//!
//! The Parquet encoder is synchronous while `object_store` is async. The sink
//! bridges the two by blocking on a tokio runtime owned by the remote writer.
//! Buffering and the switch to a multipart upload are handled by
//! [`object_store::buffered::BufWriter`].

use std::io;
use std::sync::Arc;

use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::ObjectStore;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Runtime;

/// Streaming upload of a single object
pub struct ObjectSink {
    runtime: Arc<Runtime>,
    path: Path,
    writer: BufWriter,
    bytes_written: u64,
    completed: bool,
}

impl ObjectSink {
    /// Open an upload to `path`, buffering up to `part_size` bytes in memory
    pub fn new(
        runtime: Arc<Runtime>,
        store: Arc<dyn ObjectStore>,
        path: Path,
        part_size: usize,
        max_concurrency: usize,
    ) -> Self {
        let writer = BufWriter::with_capacity(store, path.clone(), part_size)
            .with_max_concurrency(max_concurrency.max(1));
        Self {
            runtime,
            path,
            writer,
            bytes_written: 0,
            completed: false,
        }
    }

    /// Object location within the bucket
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes handed to the upload so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush buffered bytes and complete the upload, making the object visible
    pub fn complete(&mut self) -> io::Result<()> {
        if self.completed {
            return Ok(());
        }
        let writer = &mut self.writer;
        let result = self.runtime.block_on(async { writer.shutdown().await });
        self.completed = result.is_ok();
        result
    }

    /// Abandon the upload, discarding any uploaded parts
    pub fn abort(&mut self) -> io::Result<()> {
        if self.completed {
            return Ok(());
        }
        self.completed = true;
        let writer = &mut self.writer;
        self.runtime
            .block_on(async { writer.abort().await })
            .map_err(io::Error::other)
    }
}

impl io::Write for ObjectSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = &mut self.writer;
        let written = self.runtime.block_on(async { writer.write(buf).await })?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Parts are only uploaded once full; an early flush would upload a
        // short part that S3 rejects in the middle of a multipart upload.
        Ok(())
    }
}
