use anyhow::{Context, Result};

use parquet_blocks::config::AppConfig;
use parquet_blocks::pipeline;

use super::RunArgs;

/// Generate data and write it through the configured block writer
pub fn run(args: RunArgs) -> Result<()> {
    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    let outcome = pipeline::run(&config)
        .with_context(|| format!("Failed to write {}", config.target()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome);
    }

    if let Some(verification) = &outcome.verification {
        if !verification.comparison.matches() {
            anyhow::bail!(
                "CSV verification failed: {} (see {} and {})",
                verification.comparison,
                verification.written_csv.display(),
                verification.decoded_csv.display()
            );
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(writer) = args.writer {
        config.writer = writer;
    }
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(records) = args.records {
        config.num_records = records;
    }
    if let Some(block_size_mb) = args.block_size_mb {
        config.block_size_mb = block_size_mb;
    }
    if let Some(compression) = args.compression {
        config.compression = compression;
    }
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if args.upload {
        config.upload_after_write = true;
    }
    if let Some(root) = &args.storage_root {
        config.storage_root = Some(root.clone());
    }
    if let Some(bucket) = &args.bucket {
        config.s3.bucket_name = bucket.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.verify_csv {
        config.verify_csv = true;
    }
    if let Some(dir) = &args.verify_dir {
        config.verify_dir = dir.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet_blocks::config::WriterKind;
    use parquet_blocks::writer::CompressionType;

    #[test]
    fn test_flags_override_config() {
        let mut config = AppConfig::default();
        let args = RunArgs {
            writer: Some(WriterKind::Local),
            records: Some(42),
            compression: Some(CompressionType::Zstd(7)),
            upload: true,
            bucket: Some("cli-bucket".to_string()),
            verify_csv: true,
            verify_dir: Some("checks".into()),
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.writer, WriterKind::Local);
        assert_eq!(config.num_records, 42);
        assert_eq!(config.compression, CompressionType::Zstd(7));
        assert!(config.upload_after_write);
        assert_eq!(config.s3.bucket_name, "cli-bucket");
        assert_eq!(config.block_size_mb, 1);
        assert!(config.verify_csv);
        assert_eq!(config.verify_dir, std::path::PathBuf::from("checks"));
    }
}
