//! Helpers for working with Arrow record batches as write blocks.
//!
//! A block is a [`RecordBatch`]. Blocks written to the same output must share
//! the same layout: field names, field order, data types and nullability.
//! Key/value metadata attached to fields or to the schema is not part of the
//! layout and is ignored.

use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;

/// Returns true when two schemas describe the same column layout.
pub fn schemas_compatible(expected: &Schema, found: &Schema) -> bool {
    let expected = expected.fields();
    let found = found.fields();

    expected.len() == found.len()
        && expected
            .iter()
            .zip(found.iter())
            .all(|(a, b)| fields_compatible(a, b))
}

fn fields_compatible(a: &Field, b: &Field) -> bool {
    a.name() == b.name() && a.data_type() == b.data_type() && a.is_nullable() == b.is_nullable()
}

/// Render a schema as `name: type` pairs for log and error messages.
pub fn describe_schema(schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| {
            let nullable = if f.is_nullable() { "" } else { " not null" };
            format!("{}: {}{}", f.name(), f.data_type(), nullable)
        })
        .collect();
    format!("[{}]", columns.join(", "))
}

/// In-memory size of a batch in bytes.
pub fn batch_memory_size(batch: &RecordBatch) -> usize {
    batch.get_array_memory_size()
}

/// Convert a byte count to mebibytes.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
