use std::collections::VecDeque;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use super::{BatchSource, SourceError};

/// Source replaying batches that are already in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: SchemaRef,
    batches: VecDeque<RecordBatch>,
}

impl MemorySource {
    /// Replay `batches` in order. The schema is taken from the first batch,
    /// so an empty list needs [`MemorySource::empty`] instead.
    pub fn new(batches: Vec<RecordBatch>) -> Result<Self, SourceError> {
        let schema = batches
            .first()
            .map(|b| b.schema())
            .ok_or_else(|| SourceError::InvalidConfig("no batches given".to_string()))?;
        Ok(Self {
            schema,
            batches: batches.into(),
        })
    }

    /// A source with a schema but no batches
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: VecDeque::new(),
        }
    }

    /// Batches not yet handed out
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl BatchSource for MemorySource {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        Ok(self.batches.pop_front())
    }
}
