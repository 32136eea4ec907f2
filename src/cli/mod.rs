use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use parquet_blocks::config::{SourceKind, WriterKind};
use parquet_blocks::writer::CompressionType;

mod inspect;
mod run;
mod upload;

/// parquet-blocks - stream generated data into Parquet, one block at a time
#[derive(Parser)]
#[command(name = "parquet-blocks")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Flags of the `run` subcommand. Each one overrides the environment and
/// the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Writer to use (local, s3-streaming)
    #[arg(short, long)]
    pub writer: Option<WriterKind>,

    /// Data to generate (people, transactions)
    #[arg(short, long)]
    pub source: Option<SourceKind>,

    /// Number of records to generate (people source)
    #[arg(short = 'n', long)]
    pub records: Option<usize>,

    /// Approximate in-memory size of one block in MB
    #[arg(short, long)]
    pub block_size_mb: Option<u64>,

    /// Compression codec, e.g. snappy, zstd(5), none
    #[arg(short, long)]
    pub compression: Option<CompressionType>,

    /// Output path (local) or object key / s3:// URI (s3-streaming)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Upload the local file after writing
    #[arg(long)]
    pub upload: bool,

    /// Use a local directory as object storage instead of S3
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Bucket for bare object keys
    #[arg(long)]
    pub bucket: Option<String>,

    /// Random seed for the generators
    #[arg(long)]
    pub seed: Option<u64>,

    /// Copy every block to CSV and compare it with the decoded output
    #[arg(long)]
    pub verify_csv: bool,

    /// Directory for the verification CSV files
    #[arg(long, value_name = "DIR")]
    pub verify_dir: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate data and write it as a Parquet file
    Run(RunArgs),

    /// Upload a local file to object storage
    Upload {
        /// File to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Object key or s3:// URI (defaults to the file name)
        #[arg(short, long)]
        key: Option<String>,

        /// Multipart chunk size in MB
        #[arg(long, default_value = "5")]
        chunk_size_mb: usize,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Use a local directory as object storage instead of S3
        #[arg(long, value_name = "DIR")]
        storage_root: Option<PathBuf>,
    },

    /// Display the footer metadata of a Parquet file or object
    Inspect {
        /// Local path or s3:// URI
        #[arg(value_name = "FILE")]
        file: String,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Use a local directory as object storage instead of S3
        #[arg(long, value_name = "DIR")]
        storage_root: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::run(args),
        Commands::Upload {
            file,
            key,
            chunk_size_mb,
            config,
            storage_root,
        } => upload::run(file, key, chunk_size_mb, config, storage_root),
        Commands::Inspect {
            file,
            config,
            storage_root,
            json,
        } => inspect::run(&file, config, storage_root, json),
    }
}
