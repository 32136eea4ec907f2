use std::fmt;

use serde::Serialize;

use crate::batch::bytes_to_mb;

/// Statistics from a completed write session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteStatistics {
    /// Location of the written file (`path` or `s3://bucket/key`)
    pub target: String,
    /// Total number of rows written
    pub num_rows: usize,
    /// Number of non-empty blocks accepted
    pub num_blocks: usize,
    /// Number of columns in the fixed schema
    pub num_columns: usize,
    /// Number of Parquet row groups in the footer
    pub num_row_groups: usize,
    /// Size of the finished file in bytes
    pub file_size_bytes: u64,
    /// Compression codec name
    pub compression: String,
    /// Average encoded bytes per row
    pub avg_row_size_bytes: f64,
}

impl WriteStatistics {
    pub(super) fn average_row_size(file_size_bytes: u64, num_rows: usize) -> f64 {
        if num_rows == 0 {
            0.0
        } else {
            file_size_bytes as f64 / num_rows as f64
        }
    }

    /// File size in mebibytes
    pub fn file_size_mb(&self) -> f64 {
        bytes_to_mb(self.file_size_bytes)
    }
}

impl fmt::Display for WriteStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} rows in {} blocks to {} ({:.2} MB, {})",
            self.num_rows,
            self.num_blocks,
            self.target,
            self.file_size_mb(),
            self.compression
        )
    }
}
