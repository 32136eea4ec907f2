//! # CSV Round-Trip Verification
//!
//! Checks that a written Parquet file decodes back to exactly the blocks that
//! went in:
//!
//! 1. [`CsvMirror`] wraps a [`BatchSource`] and appends every block it hands
//!    out to a CSV side file.
//! 2. [`export_parquet_csv`] decodes the finished Parquet output into a
//!    second CSV file.
//! 3. [`compare_csv`] walks both files record by record.
//!
//! All three steps stream; memory stays bounded by one block and one CSV
//! record per file. Cells are rendered with Arrow's display formatter, so a
//! value renders identically on both sides unless it changed in between.
//!
//! ```rust,no_run
//! use parquet_blocks::source::PersonSource;
//! use parquet_blocks::verify::{compare_csv, export_parquet_csv, CsvMirror};
//! use parquet_blocks::writer::{CompressionType, LocalBlockWriter};
//! use std::fs::File;
//! use std::path::Path;
//!
//! let source = PersonSource::new(10_000, 1_000, 42)?;
//! let mut mirror = CsvMirror::create(source, "verify/written.csv")?;
//! let mut writer = LocalBlockWriter::default();
//! let target = "out.parquet";
//! parquet_blocks::pipeline::drive(&mut mirror, &mut writer, target, CompressionType::Snappy)?;
//! mirror.flush()?;
//!
//! export_parquet_csv(File::open("out.parquet")?, Path::new("verify/decoded.csv"))?;
//! let comparison = compare_csv(Path::new("verify/written.csv"), Path::new("verify/decoded.csv"))?;
//! assert!(comparison.matches());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use arrow::datatypes::{Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use log::{error, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use serde::Serialize;

use crate::source::{BatchSource, SourceError};

/// Errors that can occur while verifying output
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Reading or writing a CSV file failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column could not be rendered
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// The Parquet output could not be decoded
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn create_csv(path: &Path) -> Result<csv::Writer<File>, VerifyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(csv::Writer::from_path(path)?)
}

fn write_header<W: Write>(
    writer: &mut csv::Writer<W>,
    schema: &Schema,
) -> Result<(), VerifyError> {
    writer.write_record(schema.fields().iter().map(|field| field.name()))?;
    Ok(())
}

fn write_rows<W: Write>(
    writer: &mut csv::Writer<W>,
    batch: &RecordBatch,
) -> Result<(), VerifyError> {
    let options = FormatOptions::default();
    let formatters = batch
        .columns()
        .iter()
        .map(|column| ArrayFormatter::try_new(column.as_ref(), &options))
        .collect::<Result<Vec<_>, _>>()?;

    let mut record: Vec<String> = Vec::with_capacity(formatters.len());
    for row in 0..batch.num_rows() {
        record.clear();
        record.extend(formatters.iter().map(|f| f.value(row).to_string()));
        writer.write_record(&record)?;
    }
    Ok(())
}

/// Source adaptor that copies every block into a CSV file on its way through
pub struct CsvMirror<S> {
    inner: S,
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl<S: BatchSource> CsvMirror<S> {
    /// Wrap `inner`, creating the CSV file (and its parent directories) with
    /// a header row taken from the source schema
    pub fn create(inner: S, path: impl Into<PathBuf>) -> Result<Self, VerifyError> {
        let path = path.into();
        let mut writer = create_csv(&path)?;
        write_header(&mut writer, &inner.schema())?;
        info!("Writing CSV copy of every block to {}", path.display());

        Ok(Self {
            inner,
            writer,
            path,
            rows: 0,
        })
    }

    /// Location of the CSV copy
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows copied so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush buffered CSV output to disk
    pub fn flush(&mut self) -> Result<(), VerifyError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<S: BatchSource> BatchSource for CsvMirror<S> {
    fn schema(&self) -> SchemaRef {
        self.inner.schema()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        let batch = self.inner.next_batch()?;
        if let Some(batch) = &batch {
            write_rows(&mut self.writer, batch)?;
            self.rows += batch.num_rows();
        }
        Ok(batch)
    }
}

/// Decode a Parquet file into CSV at `path`, returning the number of rows
pub fn export_parquet_csv<R: ChunkReader + 'static>(
    reader: R,
    path: &Path,
) -> Result<usize, VerifyError> {
    let batches = ParquetRecordBatchReaderBuilder::try_new(reader)?.build()?;
    let mut writer = create_csv(path)?;
    write_header(&mut writer, &batches.schema())?;

    let mut rows = 0;
    for batch in batches {
        let batch = batch?;
        write_rows(&mut writer, &batch)?;
        rows += batch.num_rows();
    }
    writer.flush()?;

    info!("Decoded {} rows from Parquet to CSV: {}", rows, path.display());
    Ok(rows)
}

/// Result of comparing two CSV files record by record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvComparison {
    /// Columns in the header of the first file
    pub columns: usize,
    /// Data rows in the first file
    pub left_rows: usize,
    /// Data rows in the second file
    pub right_rows: usize,
    /// Whether both headers are identical
    pub header_matches: bool,
    /// Row positions whose records differ, including rows present in only
    /// one file
    pub differing_rows: usize,
    /// 1-based position of the first differing row
    pub first_difference: Option<usize>,
}

impl CsvComparison {
    /// Both files hold the same table
    pub fn matches(&self) -> bool {
        self.header_matches && self.left_rows == self.right_rows && self.differing_rows == 0
    }
}

impl fmt::Display for CsvComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matches() {
            return write!(
                f,
                "files match ({} rows x {} columns)",
                self.left_rows, self.columns
            );
        }
        write!(f, "files differ: ")?;
        if !self.header_matches {
            write!(f, "headers differ, ")?;
        }
        write!(
            f,
            "{} vs {} rows, {} differing rows",
            self.left_rows, self.right_rows, self.differing_rows
        )?;
        if let Some(row) = self.first_difference {
            write!(f, " (first at row {})", row)?;
        }
        Ok(())
    }
}

/// Compare two CSV files with header rows.
///
/// Records are compared in file order. Only the two current records are
/// held in memory.
pub fn compare_csv(left: &Path, right: &Path) -> Result<CsvComparison, VerifyError> {
    info!("Comparing CSV files: {} vs {}", left.display(), right.display());

    let mut left_reader = csv::Reader::from_path(left)?;
    let mut right_reader = csv::Reader::from_path(right)?;
    let left_header = left_reader.headers()?.clone();
    let right_header = right_reader.headers()?.clone();

    let mut comparison = CsvComparison {
        columns: left_header.len(),
        left_rows: 0,
        right_rows: 0,
        header_matches: left_header == right_header,
        differing_rows: 0,
        first_difference: None,
    };

    let mut left_record = csv::StringRecord::new();
    let mut right_record = csv::StringRecord::new();
    loop {
        let has_left = left_reader.read_record(&mut left_record)?;
        let has_right = right_reader.read_record(&mut right_record)?;
        comparison.left_rows += usize::from(has_left);
        comparison.right_rows += usize::from(has_right);

        match (has_left, has_right) {
            (false, false) => break,
            (true, true) if left_record == right_record => {}
            _ => {
                comparison.differing_rows += 1;
                let position = comparison.left_rows.max(comparison.right_rows);
                comparison.first_difference.get_or_insert(position);
            }
        }
    }

    if comparison.matches() {
        info!("CSV verification passed: {}", comparison);
    } else {
        error!("CSV verification failed: {}", comparison);
    }
    Ok(comparison)
}

/// Outcome of a verified run
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// CSV copy of the blocks as they were written
    pub written_csv: PathBuf,
    /// CSV decoded from the Parquet output
    pub decoded_csv: PathBuf,
    /// Record-by-record comparison of the two
    pub comparison: CsvComparison,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use arrow::array::{ArrayRef, Float32Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field};
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn batch(ids: Vec<i64>, names: Vec<Option<&str>>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("score", DataType::Float32, false),
        ]));
        let scores: Vec<f32> = ids.iter().map(|i| *i as f32 * 0.1).collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)) as ArrayRef,
                Arc::new(StringArray::from(names)) as ArrayRef,
                Arc::new(Float32Array::from(scores)) as ArrayRef,
            ],
        )
        .unwrap()
    }

    fn write_parquet(path: &Path, batches: &[RecordBatch]) {
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batches[0].schema(), None).unwrap();
        for batch in batches {
            writer.write(batch).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn test_mirror_passes_blocks_through() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("nested/written.csv");
        let blocks = vec![
            batch(vec![1, 2], vec![Some("a"), None]),
            batch(vec![3], vec![Some("with, comma")]),
        ];
        let source = MemorySource::new(blocks).unwrap();

        let mut mirror = CsvMirror::create(source, &csv_path).unwrap();
        let mut seen = 0;
        while let Some(block) = mirror.next_batch().unwrap() {
            seen += block.num_rows();
        }
        mirror.flush().unwrap();

        assert_eq!(seen, 3);
        assert_eq!(mirror.rows(), 3);
        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,name,score");
        assert_eq!(lines[2], "2,,0.2");
        assert!(lines[3].starts_with("3,\"with, comma\","));
    }

    #[test]
    fn test_parquet_round_trip_matches() {
        let dir = tempdir().unwrap();
        let parquet_path = dir.path().join("data.parquet");
        let written = dir.path().join("written.csv");
        let decoded = dir.path().join("decoded.csv");
        let blocks = vec![
            batch(vec![1, 2, 3], vec![Some("x"), None, Some("z")]),
            batch(vec![4, 5], vec![Some("v"), Some("w")]),
        ];

        let mut mirror = CsvMirror::create(MemorySource::new(blocks.clone()).unwrap(), &written)
            .unwrap();
        while mirror.next_batch().unwrap().is_some() {}
        mirror.flush().unwrap();
        write_parquet(&parquet_path, &blocks);

        let rows = export_parquet_csv(File::open(&parquet_path).unwrap(), &decoded).unwrap();
        assert_eq!(rows, 5);

        let comparison = compare_csv(&written, &decoded).unwrap();
        assert!(comparison.matches(), "{comparison}");
        assert_eq!(comparison.columns, 3);
        assert_eq!(comparison.left_rows, 5);
    }

    #[test]
    fn test_compare_reports_differences() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.csv");
        let right = dir.path().join("right.csv");
        std::fs::write(&left, "id,name\n1,a\n2,b\n3,c\n").unwrap();
        std::fs::write(&right, "id,name\n1,a\n2,B\n").unwrap();

        let comparison = compare_csv(&left, &right).unwrap();
        assert!(!comparison.matches());
        assert!(comparison.header_matches);
        assert_eq!(comparison.left_rows, 3);
        assert_eq!(comparison.right_rows, 2);
        assert_eq!(comparison.differing_rows, 2);
        assert_eq!(comparison.first_difference, Some(2));
    }

    #[test]
    fn test_compare_detects_header_change() {
        let dir = tempdir().unwrap();
        let left = dir.path().join("left.csv");
        let right = dir.path().join("right.csv");
        std::fs::write(&left, "id,name\n1,a\n").unwrap();
        std::fs::write(&right, "id,label\n1,a\n").unwrap();

        let comparison = compare_csv(&left, &right).unwrap();
        assert!(!comparison.header_matches);
        assert!(!comparison.matches());
        assert_eq!(comparison.differing_rows, 0);
    }
}
