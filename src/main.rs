//! # parquet-blocks
//!
//! Command-line front end for the block writers.
//!
//! ## Usage
//!
//! ```bash
//! # Stream 100k generated people straight into S3
//! parquet-blocks run --writer s3-streaming -n 100000
//!
//! # Write locally, then upload
//! parquet-blocks run --writer local --output output/data.parquet --upload
//!
//! # Inspect the result
//! parquet-blocks inspect s3://parquet-data-bucket/data.parquet
//! ```

use clap::Parser;

mod cli;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
