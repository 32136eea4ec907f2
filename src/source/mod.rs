//! # Block Sources
//!
//! Pull-based producers of record batches. A source hands out one block per
//! call and signals exhaustion with `Ok(None)`; nothing is produced ahead of
//! the consumer.
//!
//! - [`PersonSource`]: synthetic person records in fixed-size blocks
//! - [`TransactionFrames`]: the end of a staged transaction pipeline
//!   (`TransactionApi` → `TransactionExtractor` → `Batcher` → frames)
//! - [`MemorySource`]: pre-built batches, mostly for tests and benchmarks

mod error;
mod memory;
mod person;
mod transactions;

#[cfg(test)]
mod tests;

pub use error::SourceError;
pub use memory::MemorySource;
pub use person::{person_schema, PersonSource, DEFAULT_SEED};
pub use transactions::{
    transaction_schema, Batcher, Category, Currency, PageResponse, PaymentMethod, Transaction,
    TransactionApi, TransactionExtractor, TransactionFrames, TransactionStatus, TransactionStream,
};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

/// A lazy, finite, single-pass producer of same-schema blocks
pub trait BatchSource {
    /// Schema shared by every block this source produces
    fn schema(&self) -> SchemaRef;

    /// Produce the next block, or `None` once the source is exhausted
    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError>;

    /// Consume the source as an iterator of blocks
    fn batches(self) -> Batches<Self>
    where
        Self: Sized,
    {
        Batches { source: self }
    }
}

impl<T: BatchSource + ?Sized> BatchSource for &mut T {
    fn schema(&self) -> SchemaRef {
        (**self).schema()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        (**self).next_batch()
    }
}

impl<T: BatchSource + ?Sized> BatchSource for Box<T> {
    fn schema(&self) -> SchemaRef {
        (**self).schema()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        (**self).next_batch()
    }
}

/// Iterator over the blocks of a [`BatchSource`]
pub struct Batches<S> {
    source: S,
}

impl<S: BatchSource> Iterator for Batches<S> {
    type Item = Result<RecordBatch, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
