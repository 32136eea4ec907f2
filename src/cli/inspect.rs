use anyhow::{Context, Result};
use std::path::PathBuf;

use parquet_blocks::config::AppConfig;
use parquet_blocks::writer::{FileSummary, LocalBlockWriter, RemoteBlockWriter};

const ARROW_SCHEMA_KEY: &str = "ARROW:schema";

/// Display the footer of a local file or an `s3://` object
pub fn run(
    file: &str,
    config: Option<PathBuf>,
    storage_root: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let summary = if file.starts_with("s3://") {
        let mut config =
            AppConfig::load(config.as_deref()).context("Failed to load configuration")?;
        if storage_root.is_some() {
            config.storage_root = storage_root;
        }
        let writer = RemoteBlockWriter::new(config.storage_backend(), config.writer_config())?;
        writer
            .read_metadata(file)
            .with_context(|| format!("Failed to read {}", file))?
    } else {
        LocalBlockWriter::read_metadata(file).with_context(|| format!("Failed to read {}", file))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(file, &summary);
    }
    Ok(())
}

fn print_summary(file: &str, summary: &FileSummary) {
    println!("Parquet File Information");
    println!("========================");
    println!("File: {}", file);
    println!();
    println!("{}", summary);

    let mut keys: Vec<_> = summary
        .key_value_metadata
        .iter()
        .filter(|(k, _)| k.as_str() != ARROW_SCHEMA_KEY)
        .collect();
    if !keys.is_empty() {
        keys.sort();
        println!();
        println!("Metadata Keys:");
        for (key, value) in keys {
            let preview = if value.len() > 100 {
                let head: String = value.chars().take(100).collect();
                format!("{}... ({} bytes)", head, value.len())
            } else {
                value.clone()
            };
            println!("  {}: {}", key, preview);
        }
    }
}
