use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;

use parquet_blocks::config::AppConfig;
use parquet_blocks::storage::Uploader;

/// Upload a finished local file
pub fn run(
    file: PathBuf,
    key: Option<String>,
    chunk_size_mb: usize,
    config: Option<PathBuf>,
    storage_root: Option<PathBuf>,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let mut config = AppConfig::load(config.as_deref()).context("Failed to load configuration")?;
    if storage_root.is_some() {
        config.storage_root = storage_root;
    }

    let chunk_size = chunk_size_bytes(chunk_size_mb)?;
    let uploader =
        Uploader::new(config.storage_backend(), chunk_size).context("Failed to create uploader")?;

    let started = Instant::now();
    let stats = uploader
        .upload_file(&file, key.as_deref())
        .with_context(|| format!("Failed to upload {}", file.display()))?;
    let elapsed = started.elapsed();

    println!("Upload complete");
    println!("  Time taken: {:.2} seconds", elapsed.as_secs_f64());
    println!("  Upload method: {}", stats.method);
    println!("  Number of parts: {}", stats.num_parts);
    println!("  File size: {} bytes", stats.file_size_bytes);
    println!("  URI: s3://{}/{}", stats.bucket, stats.key);
    Ok(())
}

fn chunk_size_bytes(chunk_size_mb: usize) -> Result<usize> {
    match chunk_size_mb.checked_mul(1024 * 1024) {
        Some(bytes) => Ok(bytes),
        None => anyhow::bail!("Chunk size of {} MB is too large", chunk_size_mb),
    }
}
