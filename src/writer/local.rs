use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use log::{error, info, warn};

use super::config::{CompressionType, WriterConfig};
use super::error::WriterError;
use super::metadata::{read_file_summary, FileSummary};
use super::session::{BlockSession, SessionState};
use super::stats::WriteStatistics;
use super::BlockWriter;

/// Block writer targeting a Parquet file on the local filesystem.
///
/// The encoder is opened over the target file on the first non-empty block
/// and each block is appended as one row group.
pub struct LocalBlockWriter {
    session: BlockSession<File>,
    path: Option<PathBuf>,
}

impl LocalBlockWriter {
    /// Create a writer with the given Parquet tuning
    pub fn new(config: WriterConfig) -> Self {
        info!(
            "Initialized LocalBlockWriter (row group limit {} rows)",
            config.row_group_size
        );
        Self {
            session: BlockSession::new(config),
            path: None,
        }
    }

    /// Path of the output currently being written
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Schema fixed by the first non-empty block of the current session
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.session.schema()
    }

    /// Read footer metadata from a Parquet file on disk
    pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<FileSummary, WriterError> {
        let file = File::open(path.as_ref())
            .map_err(|e| WriterError::target_unavailable(path.as_ref().display().to_string(), e))?;
        read_file_summary(file)
    }
}

impl Default for LocalBlockWriter {
    fn default() -> Self {
        Self::new(WriterConfig::default())
    }
}

impl BlockWriter for LocalBlockWriter {
    fn start(&mut self, target: &str, compression: CompressionType) -> Result<(), WriterError> {
        self.session.ensure_can_start()?;

        let path = PathBuf::from(target);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| WriterError::target_unavailable(target, e))?;
        }

        self.session.begin(path.display().to_string(), compression);
        self.path = Some(path);
        Ok(())
    }

    fn write_block(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        let path = self.path.as_deref();
        self.session.write_block(batch, || {
            let path = path.ok_or(WriterError::NotStarted)?;
            File::create(path)
                .map_err(|e| WriterError::target_unavailable(path.display().to_string(), e))
        })
    }

    fn finish(&mut self) -> Result<WriteStatistics, WriterError> {
        let (encoder, num_row_groups) = self.session.finish_encoder()?;
        // Closing the file handle before measuring the file
        drop(encoder);

        let path = self.path.as_deref().ok_or(WriterError::NotStarted)?;
        let file_size = fs::metadata(path)?.len();
        Ok(self.session.statistics(num_row_groups, file_size))
    }

    fn close(&mut self) {
        if let Some(mut encoder) = self.session.close() {
            warn!("Writer was not properly finished. Closing now...");
            if let Err(e) = encoder.finish() {
                error!("Failed to finalize unfinished Parquet file: {}", e);
            }
        }
        self.path = None;
    }

    fn state(&self) -> SessionState {
        self.session.state()
    }

    fn rows_written(&self) -> usize {
        self.session.num_rows()
    }

    fn blocks_written(&self) -> usize {
        self.session.num_blocks()
    }
}

impl Drop for LocalBlockWriter {
    fn drop(&mut self) {
        self.close();
    }
}
