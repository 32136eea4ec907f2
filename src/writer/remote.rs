use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use log::{error, info, warn};
use object_store::ObjectStore;
use tokio::runtime::Runtime;

use crate::storage::{RemoteTarget, StorageBackend};

use super::config::{CompressionType, WriterConfig};
use super::error::WriterError;
use super::metadata::{read_file_summary, FileSummary};
use super::session::{BlockSession, SessionState};
use super::sink::ObjectSink;
use super::stats::WriteStatistics;
use super::BlockWriter;

/// Block writer streaming a Parquet file straight into object storage.
///
/// Blocks are encoded into an [`ObjectSink`], which buffers up to one part
/// and lets the object store switch to a multipart upload for large files.
/// Nothing is retried here; failures surface to the caller as-is.
pub struct RemoteBlockWriter {
    backend: StorageBackend,
    runtime: Arc<Runtime>,
    part_size: usize,
    max_upload_concurrency: usize,
    session: BlockSession<ObjectSink>,
    target: Option<RemoteTarget>,
    store: Option<Arc<dyn ObjectStore>>,
}

impl RemoteBlockWriter {
    /// Create a writer for the given backend
    pub fn new(backend: StorageBackend, config: WriterConfig) -> Result<Self, WriterError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        info!(
            "Initialized RemoteBlockWriter (part size {} bytes)",
            config.part_size
        );
        info!("Storage: {}", backend.describe());
        info!("Bucket: {}", backend.default_bucket());

        Ok(Self {
            backend,
            runtime: Arc::new(runtime),
            part_size: config.part_size.max(1),
            max_upload_concurrency: config.max_upload_concurrency,
            session: BlockSession::new(config),
            target: None,
            store: None,
        })
    }

    /// Object currently being written
    pub fn target(&self) -> Option<&RemoteTarget> {
        self.target.as_ref()
    }

    /// Schema fixed by the first non-empty block of the current session
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.session.schema()
    }

    /// Fetch a whole object (`s3://bucket/key` or a bare key)
    pub fn download(&self, target: &str) -> Result<Bytes, WriterError> {
        let target = RemoteTarget::parse(target, self.backend.default_bucket())?;
        let store = self.backend.store_for_bucket(&target.bucket)?;
        let bytes = self
            .runtime
            .block_on(async { store.get(&target.key).await?.bytes().await })?;
        Ok(bytes)
    }

    /// Read footer metadata of an object (`s3://bucket/key` or a bare key)
    pub fn read_metadata(&self, target: &str) -> Result<FileSummary, WriterError> {
        read_file_summary(self.download(target)?)
    }

    fn ensure_bucket(&self, bucket: &str) {
        match self.runtime.block_on(self.backend.ensure_bucket(bucket)) {
            Ok(status) => info!("Bucket {} ready ({:?})", bucket, status),
            // The write may still succeed with object-level permissions
            Err(e) => warn!("Could not verify/create bucket: {}", e),
        }
    }
}

impl BlockWriter for RemoteBlockWriter {
    fn start(&mut self, target: &str, compression: CompressionType) -> Result<(), WriterError> {
        self.session.ensure_can_start()?;

        let target = RemoteTarget::parse(target, self.backend.default_bucket())?;
        self.ensure_bucket(&target.bucket);

        let store = self
            .backend
            .store_for_bucket(&target.bucket)
            .map_err(|e| WriterError::target_unavailable(target.to_string(), e))?;

        self.session.begin(target.to_string(), compression);
        self.store = Some(store);
        self.target = Some(target);
        Ok(())
    }

    fn write_block(&mut self, batch: &RecordBatch) -> Result<(), WriterError> {
        let runtime = &self.runtime;
        let store = self.store.as_ref();
        let target = self.target.as_ref();
        let (part_size, concurrency) = (self.part_size, self.max_upload_concurrency);

        self.session.write_block(batch, || {
            let (store, target) = store.zip(target).ok_or(WriterError::NotStarted)?;
            info!("Opening upload to {}", target);
            Ok(ObjectSink::new(
                runtime.clone(),
                store.clone(),
                target.key.clone(),
                part_size,
                concurrency,
            ))
        })
    }

    fn finish(&mut self) -> Result<WriteStatistics, WriterError> {
        let (mut encoder, num_row_groups) = self.session.finish_encoder()?;

        let (store, target) = self
            .store
            .as_ref()
            .zip(self.target.as_ref())
            .ok_or(WriterError::NotStarted)?;

        info!("Finalizing upload to {}", target);
        if let Err(e) = encoder.inner_mut().complete() {
            error!("Failed to complete upload to {}: {}", target, e);
            if let Err(abort_error) = encoder.inner_mut().abort() {
                error!("Failed to abort upload: {}", abort_error);
            }
            return Err(WriterError::target_unavailable(target.to_string(), e));
        }
        drop(encoder);

        let meta = self.runtime.block_on(store.head(&target.key))?;
        Ok(self.session.statistics(num_row_groups, meta.size as u64))
    }

    fn close(&mut self) {
        if let Some(mut encoder) = self.session.close() {
            warn!("Writer was not properly finished. Closing now...");
            match encoder.finish() {
                Ok(_) => {
                    if let Err(e) = encoder.inner_mut().complete() {
                        error!("Failed to complete upload of unfinished file: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to finalize unfinished Parquet file: {}", e);
                    if let Err(e) = encoder.inner_mut().abort() {
                        error!("Failed to abort upload: {}", e);
                    }
                }
            }
        }
        self.target = None;
        self.store = None;
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

impl Drop for RemoteBlockWriter {
    fn drop(&mut self) {
        self.close();
    }
}
