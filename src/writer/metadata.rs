use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow::datatypes::Schema;
use parquet::file::reader::{ChunkReader, FileReader, SerializedFileReader};
use serde::Serialize;

use crate::batch::describe_schema;

use super::error::WriterError;

/// Footer metadata of a written Parquet file
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    /// Total number of rows across all row groups
    pub num_rows: i64,
    /// Number of row groups (one per written block)
    pub num_row_groups: usize,
    /// Number of leaf columns
    pub num_columns: usize,
    /// Writer identification string
    pub created_by: Option<String>,
    /// Parquet format version
    pub format_version: i32,
    /// Uncompressed size of all row groups in bytes
    pub total_byte_size: i64,
    /// Key-value metadata from the footer
    pub key_value_metadata: HashMap<String, String>,
    /// Arrow schema stored in the file
    #[serde(skip)]
    pub schema: Arc<Schema>,
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows:           {}", self.num_rows)?;
        writeln!(f, "Row groups:     {}", self.num_row_groups)?;
        writeln!(f, "Columns:        {}", self.num_columns)?;
        writeln!(
            f,
            "Created by:     {}",
            self.created_by.as_deref().unwrap_or("unknown")
        )?;
        writeln!(f, "Format version: {}", self.format_version)?;
        writeln!(f, "Data size:      {} bytes", self.total_byte_size)?;
        write!(f, "Schema:         {}", describe_schema(&self.schema))
    }
}

/// Read the footer of a Parquet file from any chunk reader
pub(crate) fn read_file_summary<R: ChunkReader + 'static>(
    reader: R,
) -> Result<FileSummary, WriterError> {
    let reader = SerializedFileReader::new(reader)?;
    let parquet_metadata = reader.metadata();
    let file_meta = parquet_metadata.file_metadata();

    let schema = parquet::arrow::parquet_to_arrow_schema(
        file_meta.schema_descr(),
        file_meta.key_value_metadata(),
    )?;

    let mut key_value_metadata = HashMap::new();
    if let Some(kv_list) = file_meta.key_value_metadata() {
        for kv in kv_list {
            if let Some(value) = &kv.value {
                key_value_metadata.insert(kv.key.clone(), value.clone());
            }
        }
    }

    let total_byte_size = parquet_metadata
        .row_groups()
        .iter()
        .map(|rg| rg.total_byte_size())
        .sum();

    Ok(FileSummary {
        num_rows: file_meta.num_rows(),
        num_row_groups: parquet_metadata.num_row_groups(),
        num_columns: file_meta.schema_descr().num_columns(),
        created_by: file_meta.created_by().map(str::to_string),
        format_version: file_meta.version(),
        total_byte_size,
        key_value_metadata,
        schema: Arc::new(schema),
    })
}
