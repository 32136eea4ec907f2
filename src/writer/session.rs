use std::io::Write;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use parquet::arrow::ArrowWriter;

use crate::batch::{batch_memory_size, bytes_to_mb, describe_schema, schemas_compatible};

use super::config::{CompressionType, WriterConfig};
use super::error::WriterError;
use super::stats::WriteStatistics;

/// Lifecycle of a block writing session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No output started, or the previous one was closed
    Uninitialized,
    /// Output started, accepting blocks
    Writing,
    /// Footer written; only `close` is accepted
    Finished,
}

/// State machine shared by the block writers.
///
/// Owns the session counters, the fixed schema and the lazily opened
/// encoder. The concrete writers supply the sink the encoder writes into and
/// measure the finished output.
pub(super) struct BlockSession<W: Write + Send> {
    config: WriterConfig,
    state: SessionState,
    target: Option<String>,
    compression: CompressionType,
    schema: Option<SchemaRef>,
    encoder: Option<ArrowWriter<W>>,
    num_rows: usize,
    num_blocks: usize,
}

impl<W: Write + Send> BlockSession<W> {
    pub(super) fn new(config: WriterConfig) -> Self {
        Self {
            config,
            state: SessionState::Uninitialized,
            target: None,
            compression: CompressionType::default(),
            schema: None,
            encoder: None,
            num_rows: 0,
            num_blocks: 0,
        }
    }

    pub(super) fn state(&self) -> SessionState {
        self.state
    }

    pub(super) fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub(super) fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub(super) fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    pub(super) fn ensure_can_start(&self) -> Result<(), WriterError> {
        match self.state {
            SessionState::Uninitialized => Ok(()),
            SessionState::Writing | SessionState::Finished => Err(WriterError::AlreadyStarted),
        }
    }

    /// Move to `Writing` once the destination has been prepared
    pub(super) fn begin(&mut self, target: String, compression: CompressionType) {
        info!("Starting Parquet file writing to {}", target);
        info!("Compression: {}", compression);

        self.target = Some(target);
        self.compression = compression;
        self.schema = None;
        self.encoder = None;
        self.num_rows = 0;
        self.num_blocks = 0;
        self.state = SessionState::Writing;
    }

    fn ensure_writing(&self) -> Result<(), WriterError> {
        match self.state {
            SessionState::Uninitialized => Err(WriterError::NotStarted),
            SessionState::Finished => Err(WriterError::AlreadyFinished),
            SessionState::Writing => Ok(()),
        }
    }

    /// Append one block, opening the encoder on the first non-empty block.
    ///
    /// `open_sink` is only called when the encoder is created.
    pub(super) fn write_block<F>(
        &mut self,
        batch: &RecordBatch,
        open_sink: F,
    ) -> Result<(), WriterError>
    where
        F: FnOnce() -> Result<W, WriterError>,
    {
        self.ensure_writing()?;

        if batch.num_rows() == 0 {
            warn!("Received empty block, skipping...");
            return Ok(());
        }

        match &self.schema {
            Some(expected) => {
                if !schemas_compatible(expected, &batch.schema()) {
                    return Err(WriterError::SchemaMismatch {
                        expected: describe_schema(expected),
                        found: describe_schema(&batch.schema()),
                    });
                }
            }
            None => {
                let schema = batch.schema();
                let props = self.config.to_writer_properties(self.compression)?;
                let sink = open_sink()?;
                let encoder = ArrowWriter::try_new(sink, schema.clone(), Some(props))?;
                info!("Initialized Parquet encoder with schema: {}", describe_schema(&schema));
                self.schema = Some(schema);
                self.encoder = Some(encoder);
            }
        }

        let encoder = self.encoder.as_mut().ok_or(WriterError::NotStarted)?;
        encoder.write(batch)?;
        // One block per row group keeps at most one block buffered in the encoder
        encoder.flush()?;

        self.num_blocks += 1;
        self.num_rows += batch.num_rows();

        info!(
            "Wrote block {}: {} rows (~{:.2} MB in memory)",
            self.num_blocks,
            batch.num_rows(),
            bytes_to_mb(batch_memory_size(batch) as u64)
        );
        debug!("Total rows written so far: {}", self.num_rows);

        Ok(())
    }

    /// Write the footer and hand the encoder back for sink finalization.
    ///
    /// Returns the encoder and the number of row groups in the footer. The
    /// session is `Finished` afterwards, even if the caller's finalization of
    /// the sink fails.
    pub(super) fn finish_encoder(&mut self) -> Result<(ArrowWriter<W>, usize), WriterError> {
        self.ensure_writing()?;
        let mut encoder = self.encoder.take().ok_or(WriterError::NoBlocksWritten)?;
        self.state = SessionState::Finished;

        let file_metadata = encoder.finish()?;
        Ok((encoder, file_metadata.row_groups.len()))
    }

    /// Build the statistics snapshot for a finished session
    pub(super) fn statistics(&self, num_row_groups: usize, file_size_bytes: u64) -> WriteStatistics {
        let stats = WriteStatistics {
            target: self.target.clone().unwrap_or_default(),
            num_rows: self.num_rows,
            num_blocks: self.num_blocks,
            num_columns: self.schema.as_ref().map(|s| s.fields().len()).unwrap_or(0),
            num_row_groups,
            file_size_bytes,
            compression: self.compression.name().to_string(),
            avg_row_size_bytes: WriteStatistics::average_row_size(file_size_bytes, self.num_rows),
        };

        info!("Finished writing Parquet file: {:.2} MB", stats.file_size_mb());
        info!("Total rows: {}", stats.num_rows);
        info!("Number of blocks written: {}", stats.num_blocks);

        stats
    }

    /// Reset to `Uninitialized`, returning an encoder that was never finished
    pub(super) fn close(&mut self) -> Option<ArrowWriter<W>> {
        let encoder = self.encoder.take();
        self.state = SessionState::Uninitialized;
        self.target = None;
        self.compression = CompressionType::default();
        self.schema = None;
        self.num_rows = 0;
        self.num_blocks = 0;
        encoder
    }
}
