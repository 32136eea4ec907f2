use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::storage::UploadStats;
use crate::verify::VerificationReport;
use crate::writer::WriteStatistics;

/// Outcome of one driver loop
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Statistics returned by the writer's `finish`
    pub stats: WriteStatistics,
    /// Time spent waiting on the source
    pub generation_time: Duration,
    /// Time spent in `write_block` and `finish`
    pub write_time: Duration,
    /// Wall time from `start` to `close`
    pub total_time: Duration,
}

impl RunReport {
    /// Encoded megabytes per second of wall time
    pub fn throughput_mb_s(&self) -> f64 {
        throughput(self.stats.file_size_mb(), self.total_time)
    }
}

/// A finished upload of a locally written file
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    /// Statistics returned by the uploader
    pub stats: UploadStats,
    /// Wall time of the upload
    pub elapsed: Duration,
}

/// Everything [`run`](super::run) did
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// The write itself
    pub report: RunReport,
    /// Present when the local file was uploaded afterwards
    pub upload: Option<UploadReport>,
    /// Present when CSV verification was requested
    pub verification: Option<VerificationReport>,
}

impl RunOutcome {
    /// Wall time of writing plus uploading
    pub fn total_time(&self) -> Duration {
        self.report.total_time + self.upload.as_ref().map(|u| u.elapsed).unwrap_or_default()
    }
}

fn throughput(megabytes: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        megabytes / secs
    } else {
        0.0
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.report;
        let stats = &report.stats;
        let rule = "=".repeat(80);

        writeln!(f, "{rule}")?;
        writeln!(f, "EXECUTION SUMMARY")?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\nData Generation:")?;
        writeln!(f, "  Time taken: {:.2} seconds", report.generation_time.as_secs_f64())?;
        writeln!(f, "  Number of rows: {}", stats.num_rows)?;
        writeln!(f, "  Number of columns: {}", stats.num_columns)?;

        writeln!(f, "\nParquet File Writing:")?;
        writeln!(f, "  Time taken: {:.2} seconds", report.write_time.as_secs_f64())?;
        writeln!(f, "  File size: {:.2} MB", stats.file_size_mb())?;
        writeln!(f, "  Number of blocks (row groups): {}", stats.num_blocks)?;
        writeln!(f, "  Compression: {}", stats.compression)?;
        writeln!(f, "  Average row size: {:.2} bytes", stats.avg_row_size_bytes)?;
        writeln!(f, "  Target: {}", stats.target)?;

        match &self.upload {
            Some(upload) => {
                writeln!(f, "\nUpload:")?;
                writeln!(f, "  Time taken: {:.2} seconds", upload.elapsed.as_secs_f64())?;
                writeln!(f, "  Upload method: {}", upload.stats.method)?;
                writeln!(f, "  Number of parts: {}", upload.stats.num_parts)?;
                writeln!(f, "  Bucket: {}", upload.stats.bucket)?;
                writeln!(f, "  Key: {}", upload.stats.key)?;
                writeln!(f, "  URI: s3://{}/{}", upload.stats.bucket, upload.stats.key)?;
            }
            None => writeln!(f, "\nUpload: skipped")?,
        }

        if let Some(verification) = &self.verification {
            let comparison = &verification.comparison;
            let verdict = if comparison.matches() { "PASSED" } else { "FAILED" };
            writeln!(f, "\nCSV Verification: {}", verdict)?;
            writeln!(f, "  {}", comparison)?;
            writeln!(f, "  Written CSV: {}", verification.written_csv.display())?;
            writeln!(f, "  Decoded CSV: {}", verification.decoded_csv.display())?;
        }

        let total = self.total_time();
        writeln!(f, "\nTotal Execution:")?;
        writeln!(f, "  Total time: {:.2} seconds", total.as_secs_f64())?;
        writeln!(
            f,
            "  Average throughput: {:.2} MB/s",
            throughput(stats.file_size_mb(), total)
        )?;
        write!(f, "{rule}")
    }
}
