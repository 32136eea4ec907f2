//! # Driver Loop
//!
//! Pulls blocks from a [`BatchSource`] and pushes them into a
//! [`BlockWriter`], one block at a time. The writer is closed on every exit
//! path; an error from either side aborts the run without finishing the
//! output, so a partial file may remain at the target.

mod error;
mod report;

#[cfg(test)]
mod tests;

pub use error::PipelineError;
pub use report::{RunOutcome, RunReport, UploadReport};

use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{debug, info};

use crate::config::{AppConfig, SourceKind, WriterKind};
use crate::source::{BatchSource, PersonSource, TransactionApi, TransactionFrames};
use crate::storage::Uploader;
use crate::verify::{compare_csv, export_parquet_csv, CsvMirror, VerificationReport, VerifyError};
use crate::writer::{
    BlockWriter, CompressionType, LocalBlockWriter, RemoteBlockWriter, WriteStatistics,
};

/// Phase of the driver loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing started yet
    Idle,
    /// Waiting on the source for the next block
    Fetching,
    /// Handing a block to the writer
    Writing,
    /// Source exhausted, writing the footer
    Finalizing,
    /// Writer closed
    Done,
}

#[derive(Default)]
struct Timings {
    generation: Duration,
    write: Duration,
}

fn transition(state: &mut DriverState, next: DriverState) {
    debug!("Driver: {:?} -> {:?}", state, next);
    *state = next;
}

/// Write every block of `source` to `target` through `writer`.
///
/// The writer is started, fed until the source is exhausted, finished and
/// then closed. On error it is closed without being finished and the error
/// is returned. If `start` itself fails the writer is not touched, so a
/// session the caller already opened stays intact.
pub fn drive<S, W>(
    source: &mut S,
    writer: &mut W,
    target: &str,
    compression: CompressionType,
) -> Result<RunReport, PipelineError>
where
    S: BatchSource + ?Sized,
    W: BlockWriter + ?Sized,
{
    let started = Instant::now();
    let mut state = DriverState::Idle;
    let mut timings = Timings::default();

    // A rejected start leaves the writer's current session alone
    writer.start(target, compression)?;

    let result = pump(source, writer, &mut state, &mut timings);
    writer.close();
    transition(&mut state, DriverState::Done);

    let stats = result?;
    let report = RunReport {
        stats,
        generation_time: timings.generation,
        write_time: timings.write,
        total_time: started.elapsed(),
    };

    info!(
        "Data generation and writing completed in {:.2} seconds",
        report.total_time.as_secs_f64()
    );
    info!("  Generation time: {:.2} seconds", report.generation_time.as_secs_f64());
    info!("  Writing time: {:.2} seconds", report.write_time.as_secs_f64());
    Ok(report)
}

fn pump<S, W>(
    source: &mut S,
    writer: &mut W,
    state: &mut DriverState,
    timings: &mut Timings,
) -> Result<WriteStatistics, PipelineError>
where
    S: BatchSource + ?Sized,
    W: BlockWriter + ?Sized,
{
    loop {
        transition(state, DriverState::Fetching);
        let fetch_started = Instant::now();
        let next = source.next_batch();
        timings.generation += fetch_started.elapsed();

        let Some(batch) = next? else {
            break;
        };

        transition(state, DriverState::Writing);
        let write_started = Instant::now();
        writer.write_block(&batch)?;
        timings.write += write_started.elapsed();
    }

    transition(state, DriverState::Finalizing);
    let finish_started = Instant::now();
    let stats = writer.finish()?;
    timings.write += finish_started.elapsed();
    Ok(stats)
}

fn build_source(config: &AppConfig) -> Result<Box<dyn BatchSource>, PipelineError> {
    Ok(match config.source {
        SourceKind::People => Box::new(PersonSource::new(
            config.num_records,
            config.rows_per_block(),
            config.seed,
        )?),
        SourceKind::Transactions => {
            let tx = &config.transactions;
            let api = TransactionApi::new(tx.page_size, tx.total_pages, config.seed)?
                .with_latency(Duration::from_millis(tx.latency_ms));
            Box::new(TransactionFrames::from_api(api, tx.batch_size)?)
        }
    })
}

fn write_output<S>(
    config: &AppConfig,
    source: &mut S,
    target: &str,
) -> Result<RunReport, PipelineError>
where
    S: BatchSource + ?Sized,
{
    match config.writer {
        WriterKind::Local => {
            info!("Using local filesystem writer");
            let mut writer = LocalBlockWriter::new(config.writer_config());
            drive(source, &mut writer, target, config.compression)
        }
        WriterKind::S3Streaming => {
            info!("Using streaming object storage writer");
            let mut writer =
                RemoteBlockWriter::new(config.storage_backend(), config.writer_config())?;
            drive(source, &mut writer, target, config.compression)
        }
    }
}

fn read_back(config: &AppConfig, target: &str) -> Result<Bytes, PipelineError> {
    match config.writer {
        WriterKind::Local => Ok(Bytes::from(std::fs::read(target).map_err(VerifyError::from)?)),
        WriterKind::S3Streaming => {
            let reader = RemoteBlockWriter::new(config.storage_backend(), config.writer_config())?;
            Ok(reader.download(target)?)
        }
    }
}

/// Drive `source` through a [`CsvMirror`], then decode the finished output
/// and compare both CSV files. The files are kept whatever the result.
fn write_verified(
    config: &AppConfig,
    source: Box<dyn BatchSource>,
    target: &str,
) -> Result<(RunReport, VerificationReport), PipelineError> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let written_csv = config.verify_dir.join(format!("written_{stamp}.csv"));
    let decoded_csv = config.verify_dir.join(format!("decoded_{stamp}.csv"));

    let mut mirror = CsvMirror::create(source, &written_csv)?;
    let report = write_output(config, &mut mirror, target)?;
    mirror.flush()?;

    info!("Reading {} back for verification", target);
    export_parquet_csv(read_back(config, target)?, &decoded_csv)?;
    let comparison = compare_csv(&written_csv, &decoded_csv)?;
    info!(
        "Verification files kept: {} and {}",
        written_csv.display(),
        decoded_csv.display()
    );

    Ok((
        report,
        VerificationReport {
            written_csv,
            decoded_csv,
            comparison,
        },
    ))
}

/// Build the source and writer selected by `config`, drive them, and upload
/// the result when the local writer was asked to.
///
/// With [`AppConfig::verify_csv`] set, every block is also copied to CSV and
/// the finished output is decoded and compared against that copy before any
/// upload. A mismatch is reported in the outcome, not returned as an error.
pub fn run(config: &AppConfig) -> Result<RunOutcome, PipelineError> {
    config.log_summary();

    let mut source = build_source(config)?;
    let target = config.target();
    let (report, verification) = if config.verify_csv {
        let (report, verification) = write_verified(config, source, &target)?;
        (report, Some(verification))
    } else {
        (write_output(config, &mut source, &target)?, None)
    };

    let upload = match config.writer {
        WriterKind::Local if config.upload_after_write => {
            info!("Uploading {} to object storage", target);
            let started = Instant::now();
            let uploader =
                Uploader::new(config.storage_backend(), config.writer_config().part_size)?;
            let stats =
                uploader.upload_file(Path::new(&target), Some(config.upload_key.as_str()))?;
            let elapsed = started.elapsed();
            info!("Upload completed in {:.2} seconds", elapsed.as_secs_f64());
            Some(UploadReport { stats, elapsed })
        }
        WriterKind::Local => {
            info!("Upload skipped (not requested)");
            None
        }
        WriterKind::S3Streaming => {
            info!("Upload skipped (data already in object storage)");
            None
        }
    };

    Ok(RunOutcome {
        report,
        upload,
        verification,
    })
}
