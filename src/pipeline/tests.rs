use super::*;
use crate::config::TransactionSettings;
use crate::source::{MemorySource, SourceError};
use crate::writer::{SessionState, WriterError};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tempfile::tempdir;

fn two_column_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("label", DataType::Utf8, false),
    ]))
}

fn block(start: i64, rows: usize) -> RecordBatch {
    let ids: Vec<i64> = (start..start + rows as i64).collect();
    let labels: Vec<String> = ids.iter().map(|i| format!("row {}", i)).collect();
    RecordBatch::try_new(
        two_column_schema(),
        vec![
            Arc::new(Int64Array::from(ids)) as ArrayRef,
            Arc::new(StringArray::from(labels)) as ArrayRef,
        ],
    )
    .unwrap()
}

/// Yields `good` blocks and then fails
struct FailingSource {
    good: usize,
}

impl BatchSource for FailingSource {
    fn schema(&self) -> SchemaRef {
        two_column_schema()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        if self.good == 0 {
            return Err(SourceError::Fetch {
                page: 2,
                reason: "connection reset".to_string(),
            });
        }
        self.good -= 1;
        Ok(Some(block(0, 2)))
    }
}

#[test]
fn test_drive_three_blocks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out/three.parquet");

    let mut source = MemorySource::new(vec![block(0, 2), block(2, 2), block(4, 2)]).unwrap();
    let mut writer = LocalBlockWriter::default();
    let report = drive(
        &mut source,
        &mut writer,
        path.to_str().unwrap(),
        CompressionType::Snappy,
    )
    .unwrap();

    assert_eq!(report.stats.num_rows, 6);
    assert_eq!(report.stats.num_blocks, 3);
    assert!(report.total_time >= report.write_time);
    assert!(report.throughput_mb_s() >= 0.0);
    assert_eq!(writer.state(), SessionState::Uninitialized);
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_drive_skips_empty_block() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gap.parquet");

    let mut source = MemorySource::new(vec![block(0, 2), block(2, 0), block(2, 2)]).unwrap();
    let mut writer = LocalBlockWriter::default();
    let report = drive(
        &mut source,
        &mut writer,
        path.to_str().unwrap(),
        CompressionType::default(),
    )
    .unwrap();

    assert_eq!(report.stats.num_rows, 4);
    assert_eq!(report.stats.num_blocks, 2);
}

#[test]
fn test_source_error_aborts_and_closes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.parquet");

    let mut source = FailingSource { good: 1 };
    let mut writer = LocalBlockWriter::default();
    let err = drive(
        &mut source,
        &mut writer,
        path.to_str().unwrap(),
        CompressionType::default(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Source(SourceError::Fetch { page: 2, .. })
    ));
    assert_eq!(writer.state(), SessionState::Uninitialized);

    // The forced close leaves the already written block behind
    let summary = LocalBlockWriter::read_metadata(&path).unwrap();
    assert_eq!(summary.num_rows, 2);
}

#[test]
fn test_writer_error_aborts_and_closes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mismatch.parquet");

    let other = RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, false)])),
        vec![Arc::new(Int64Array::from(vec![1])) as ArrayRef],
    )
    .unwrap();
    let mut source = MemorySource::new(vec![block(0, 2), other, block(2, 2)]).unwrap();
    let mut writer = LocalBlockWriter::default();
    let err = drive(
        &mut source,
        &mut writer,
        path.to_str().unwrap(),
        CompressionType::default(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Writer(WriterError::SchemaMismatch { .. })
    ));
    assert_eq!(writer.state(), SessionState::Uninitialized);
    assert_eq!(source.remaining(), 1);
}

#[test]
fn test_empty_source_reports_no_blocks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nothing.parquet");

    let mut source = MemorySource::empty(two_column_schema());
    let mut writer = LocalBlockWriter::default();
    let err = drive(
        &mut source,
        &mut writer,
        path.to_str().unwrap(),
        CompressionType::default(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Writer(WriterError::NoBlocksWritten)
    ));
}

#[test]
fn test_rejected_start_keeps_open_session() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("a.parquet");
    let second = dir.path().join("b.parquet");

    let mut writer = LocalBlockWriter::default();
    writer
        .start(first.to_str().unwrap(), CompressionType::Snappy)
        .unwrap();
    writer.write_block(&block(0, 2)).unwrap();

    let mut source = MemorySource::new(vec![block(2, 2)]).unwrap();
    let err = drive(
        &mut source,
        &mut writer,
        second.to_str().unwrap(),
        CompressionType::Snappy,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Writer(WriterError::AlreadyStarted)
    ));
    assert_eq!(writer.state(), SessionState::Writing);
    assert_eq!(writer.rows_written(), 2);
    assert_eq!(source.remaining(), 1);
    assert!(!second.exists());

    writer.write_block(&block(2, 2)).unwrap();
    let stats = writer.finish().unwrap();
    assert_eq!(stats.num_rows, 4);
}

#[test]
fn test_drive_through_boxed_trait_objects() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("boxed.parquet");

    let mut source: Box<dyn BatchSource> =
        Box::new(MemorySource::new(vec![block(0, 3)]).unwrap());
    let mut writer: Box<dyn BlockWriter> = Box::new(LocalBlockWriter::default());
    let report = drive(
        &mut source,
        &mut writer,
        path.to_str().unwrap(),
        CompressionType::Gzip(6),
    )
    .unwrap();
    assert_eq!(report.stats.num_rows, 3);
    assert_eq!(report.stats.compression, "gzip");
}

#[test]
fn test_run_local_with_upload() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("output/data.parquet");
    let config = AppConfig {
        num_records: 450,
        block_size_mb: 0,
        writer: WriterKind::Local,
        output: Some(output.to_str().unwrap().to_string()),
        upload_after_write: true,
        storage_root: Some(dir.path().join("store")),
        ..AppConfig::default()
    };

    let outcome = run(&config).unwrap();
    assert_eq!(outcome.report.stats.num_rows, 450);
    assert_eq!(outcome.report.stats.num_blocks, 5);
    assert_eq!(outcome.report.stats.num_columns, 18);

    let upload = outcome.upload.as_ref().unwrap();
    assert_eq!(upload.stats.key, "data.parquet");
    assert_eq!(upload.stats.file_size_bytes, outcome.report.stats.file_size_bytes);
    assert!(dir
        .path()
        .join("store/parquet-data-bucket/data.parquet")
        .is_file());

    let summary = outcome.to_string();
    assert!(summary.contains("EXECUTION SUMMARY"));
    assert!(summary.contains("Number of rows: 450"));
}

#[test]
fn test_run_streaming_transactions() {
    let dir = tempdir().unwrap();
    let config = AppConfig {
        writer: WriterKind::S3Streaming,
        source: SourceKind::Transactions,
        output: Some("s3://tx-bucket/runs/transactions.parquet".to_string()),
        storage_root: Some(dir.path().to_path_buf()),
        transactions: TransactionSettings {
            page_size: 10,
            total_pages: 5,
            batch_size: 20,
            latency_ms: 0,
        },
        ..AppConfig::default()
    };

    let outcome = run(&config).unwrap();
    assert!(outcome.upload.is_none());
    assert_eq!(outcome.report.stats.num_rows, 50);
    assert_eq!(outcome.report.stats.num_blocks, 3);
    assert_eq!(
        outcome.report.stats.target,
        "s3://tx-bucket/runs/transactions.parquet"
    );
    assert!(dir
        .path()
        .join("tx-bucket/runs/transactions.parquet")
        .is_file());
}

#[test]
fn test_run_local_with_csv_verification() {
    let dir = tempdir().unwrap();
    let config = AppConfig {
        num_records: 300,
        block_size_mb: 0,
        writer: WriterKind::Local,
        output: Some(dir.path().join("people.parquet").to_str().unwrap().to_string()),
        verify_csv: true,
        verify_dir: dir.path().join("verification"),
        ..AppConfig::default()
    };

    let outcome = run(&config).unwrap();
    let verification = outcome.verification.as_ref().unwrap();
    assert!(verification.comparison.matches(), "{}", verification.comparison);
    assert_eq!(verification.comparison.left_rows, 300);
    assert_eq!(verification.comparison.columns, 18);
    assert!(verification.written_csv.starts_with(dir.path().join("verification")));
    assert!(verification.written_csv.is_file());
    assert!(verification.decoded_csv.is_file());
    assert!(outcome.to_string().contains("CSV Verification: PASSED"));
}

#[test]
fn test_run_streaming_with_csv_verification() {
    let dir = tempdir().unwrap();
    let config = AppConfig {
        writer: WriterKind::S3Streaming,
        source: SourceKind::Transactions,
        output: Some("s3://tx-bucket/verified.parquet".to_string()),
        storage_root: Some(dir.path().join("store")),
        transactions: TransactionSettings {
            page_size: 10,
            total_pages: 4,
            batch_size: 15,
            latency_ms: 0,
        },
        verify_csv: true,
        verify_dir: dir.path().join("verification"),
        ..AppConfig::default()
    };

    let outcome = run(&config).unwrap();
    let comparison = &outcome.verification.as_ref().unwrap().comparison;
    assert!(comparison.matches(), "{}", comparison);
    assert_eq!(comparison.left_rows, 40);
    assert_eq!(comparison.right_rows, 40);
}

#[test]
fn test_run_without_verification_writes_no_csv() {
    let dir = tempdir().unwrap();
    let config = AppConfig {
        num_records: 50,
        writer: WriterKind::Local,
        output: Some(dir.path().join("plain.parquet").to_str().unwrap().to_string()),
        verify_dir: dir.path().join("verification"),
        ..AppConfig::default()
    };

    let outcome = run(&config).unwrap();
    assert!(outcome.verification.is_none());
    assert!(!dir.path().join("verification").exists());
}
