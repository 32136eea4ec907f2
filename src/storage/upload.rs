use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use log::{debug, error, info, warn};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload, WriteMultipart};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::runtime::Runtime;

use crate::batch::bytes_to_mb;

use super::error::StorageError;
use super::target::RemoteTarget;
use super::StorageBackend;

/// Default multipart chunk size (the S3 minimum part size)
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

const MAX_CONCURRENT_PARTS: usize = 4;

/// How a file was transferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMethod {
    /// Single PUT request
    Simple,
    /// Multipart upload
    Multipart,
}

impl fmt::Display for UploadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Multipart => f.write_str("multipart"),
        }
    }
}

/// Statistics from a completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    /// Single request or multipart
    pub method: UploadMethod,
    /// Uploaded local file
    pub file_path: PathBuf,
    /// Destination bucket
    pub bucket: String,
    /// Destination key
    pub key: String,
    /// Size of the uploaded file
    pub file_size_bytes: u64,
    /// Number of requests that carried data
    pub num_parts: usize,
}

/// Copies finished local files into a bucket
pub struct Uploader {
    backend: StorageBackend,
    runtime: Runtime,
    chunk_size: usize,
}

impl Uploader {
    /// Create an uploader. Files larger than `chunk_size` are sent as a
    /// multipart upload in parts of `chunk_size` bytes.
    pub fn new(backend: StorageBackend, chunk_size: usize) -> Result<Self, StorageError> {
        if chunk_size == 0 {
            return Err(StorageError::InvalidConfig(
                "upload chunk size must be positive".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        info!("Initialized uploader for {}", backend.describe());
        info!("Chunk size: {:.2} MB", bytes_to_mb(chunk_size as u64));

        Ok(Self {
            backend,
            runtime,
            chunk_size,
        })
    }

    /// Upload `file` to `key`, which may be `s3://bucket/key` or a bare key in
    /// the default bucket. Defaults to the file name.
    pub fn upload_file(&self, file: &Path, key: Option<&str>) -> Result<UploadStats, StorageError> {
        if !file.is_file() {
            return Err(StorageError::FileNotFound(file.to_path_buf()));
        }

        let key = match key {
            Some(key) => key.to_string(),
            None => file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| StorageError::InvalidTarget(file.display().to_string()))?,
        };
        let target = RemoteTarget::parse(&key, self.backend.default_bucket())?;
        let file_size = std::fs::metadata(file)?.len();

        info!("Uploading {} to {}", file.display(), target);
        info!("File size: {:.2} MB", bytes_to_mb(file_size));

        self.runtime.block_on(async {
            if let Err(e) = self.backend.ensure_bucket(&target.bucket).await {
                warn!("Could not verify/create bucket: {}", e);
            }

            let store = self.backend.store_for_bucket(&target.bucket)?;
            let (method, num_parts) = if file_size as usize > self.chunk_size {
                let parts = self.multipart_upload(store, file, &target.key).await?;
                (UploadMethod::Multipart, parts)
            } else {
                let bytes = tokio::fs::read(file).await?;
                store
                    .put(&target.key, PutPayload::from(Bytes::from(bytes)))
                    .await?;
                info!("Successfully uploaded file using simple upload");
                (UploadMethod::Simple, 1)
            };

            Ok(UploadStats {
                method,
                file_path: file.to_path_buf(),
                bucket: target.bucket.clone(),
                key: target.key.to_string(),
                file_size_bytes: file_size,
                num_parts,
            })
        })
    }

    async fn multipart_upload(
        &self,
        store: Arc<dyn ObjectStore>,
        file: &Path,
        key: &ObjectPath,
    ) -> Result<usize, StorageError> {
        let upload = store.put_multipart(key).await?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, self.chunk_size);

        let result = async {
            let mut source = tokio::fs::File::open(file).await?;
            let mut buf = vec![0u8; self.chunk_size];
            let mut parts = 0usize;
            loop {
                let n = read_full(&mut source, &mut buf).await?;
                if n == 0 {
                    break;
                }
                writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await?;
                writer.write(&buf[..n]);
                parts += 1;
                debug!("Queued part {} ({:.2} MB)", parts, bytes_to_mb(n as u64));
            }
            Ok::<usize, StorageError>(parts)
        }
        .await;

        match result {
            Ok(parts) => {
                writer.finish().await?;
                info!("Successfully completed multipart upload with {} parts", parts);
                Ok(parts)
            }
            Err(e) => {
                error!("Error in multipart upload: {}", e);
                if let Err(abort_error) = writer.abort().await {
                    error!("Error aborting multipart upload: {}", abort_error);
                } else {
                    info!("Aborted multipart upload");
                }
                Err(e)
            }
        }
    }

    /// List object keys in the default bucket under `prefix`
    pub fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let store = self.backend.store_for_bucket(self.backend.default_bucket())?;
        let prefix = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));

        self.runtime.block_on(async {
            let objects: Vec<_> = store.list(prefix.as_ref()).try_collect().await?;
            let mut keys: Vec<String> = objects.into_iter().map(|m| m.location.to_string()).collect();
            keys.sort();
            Ok(keys)
        })
    }
}

/// Fill `buf` from `source`, returning fewer bytes only at end of file
async fn read_full(source: &mut tokio::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
