//! # parquet-blocks - Bounded-Memory Parquet Writing
//!
//! `parquet_blocks` streams tabular data into a single Parquet file one block
//! at a time, either on the local filesystem or directly into an object
//! storage bucket, while holding at most one block in memory.
//!
//! ## Key Features
//!
//! - **Block writers**: [`writer::LocalBlockWriter`] and
//!   [`writer::RemoteBlockWriter`] share the [`writer::BlockWriter`]
//!   lifecycle (`start` → `write_block`* → `finish` → `close`). Every block
//!   becomes one Parquet row group.
//!
//! - **Streaming uploads**: the remote writer feeds the encoder output into
//!   an `object_store` buffered upload, which switches to a multipart upload
//!   once the data exceeds one part.
//!
//! - **Pull-based sources**: synthetic person records and a staged
//!   transaction pipeline, both producing blocks on demand.
//!
//! - **Scoped cleanup**: dropping a writer closes it, so an unfinished file is
//!   still finalized when a run is aborted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parquet_blocks::source::{BatchSource, PersonSource};
//! use parquet_blocks::writer::{BlockWriter, CompressionType, LocalBlockWriter};
//!
//! let mut source = PersonSource::new(10_000, 1_000, 42)?;
//! let mut writer = LocalBlockWriter::default();
//!
//! writer.start("output/people.parquet", CompressionType::Snappy)?;
//! while let Some(block) = source.next_batch()? {
//!     writer.write_block(&block)?;
//! }
//! let stats = writer.finish()?;
//! println!("{}", stats);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The same loop, with timing and guaranteed cleanup, is available as
//! [`pipeline::drive`].
//!
//! ## Architecture
//!
//! - [`batch`]: schema comparison and size helpers
//! - [`source`]: block producers
//! - [`writer`]: the block writers and their configuration
//! - [`storage`]: object storage backends, target parsing and the uploader
//! - [`pipeline`]: the driver loop and the end-to-end run
//! - [`verify`]: optional CSV round-trip verification of the output
//! - [`config`]: environment and TOML configuration

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod batch;
pub mod config;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod verify;
pub mod writer;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{AppConfig, SourceKind, WriterKind};
    pub use crate::pipeline::{drive, run, PipelineError, RunOutcome, RunReport};
    pub use crate::source::{BatchSource, MemorySource, PersonSource, SourceError};
    pub use crate::storage::{LocalConfig, S3Config, StorageBackend, Uploader};
    pub use crate::writer::{
        BlockWriter, CompressionType, LocalBlockWriter, RemoteBlockWriter, SessionState,
        WriteStatistics, WriterConfig, WriterError,
    };
}
