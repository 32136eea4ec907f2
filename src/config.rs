//! Application configuration.
//!
//! Values are read from environment variables first. A TOML file may then
//! override any of them, and command-line flags are applied last by the
//! binary.
//!
//! ```toml
//! # parquet-blocks.toml
//! num_records = 500000
//! block_size_mb = 4
//! writer = "local"
//! compression = "zstd(5)"
//! output = "output/people.parquet"
//!
//! [s3]
//! bucket_name = "analytics"
//!
//! [transactions]
//! page_size = 250
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use serde::Deserialize;

use crate::storage::{LocalConfig, S3Config, StorageBackend};
use crate::writer::{CompressionType, WriterConfig};

const MIB: u64 = 1024 * 1024;

/// Rough encoded size of one generated record, used to size blocks
pub const ESTIMATED_BYTES_PER_RECORD: u64 = 1000;

/// Lower bound on rows per block
pub const MIN_ROWS_PER_BLOCK: usize = 100;

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable or file value could not be parsed
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable or field name
        key: String,
        /// Rejected raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Config file could not be read
    #[error("Failed to read config file {}: {source}", .path.display())]
    ReadFile {
        /// Path of the config file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config file is not valid TOML
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which block writer a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterKind {
    /// Write to a local file
    Local,
    /// Stream straight into object storage
    #[default]
    #[serde(alias = "s3-streaming")]
    S3Streaming,
}

impl fmt::Display for WriterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::S3Streaming => f.write_str("s3_streaming"),
        }
    }
}

impl FromStr for WriterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "s3_streaming" | "s3-streaming" => Ok(Self::S3Streaming),
            _ => Err(ConfigError::InvalidValue {
                key: "writer".to_string(),
                value: s.to_string(),
                reason: "valid options: local, s3_streaming".to_string(),
            }),
        }
    }
}

/// Which generator feeds the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Synthetic person records
    #[default]
    People,
    /// Staged transaction API pipeline
    Transactions,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::People => f.write_str("people"),
            Self::Transactions => f.write_str("transactions"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "people" | "person" => Ok(Self::People),
            "transactions" => Ok(Self::Transactions),
            _ => Err(ConfigError::InvalidValue {
                key: "source".to_string(),
                value: s.to_string(),
                reason: "valid options: people, transactions".to_string(),
            }),
        }
    }
}

/// Settings of the simulated transaction API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSettings {
    /// Records per API page
    pub page_size: usize,
    /// Number of pages the API serves
    pub total_pages: u32,
    /// Records per written block
    pub batch_size: usize,
    /// Simulated latency per page request
    pub latency_ms: u64,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            total_pages: 300,
            batch_size: 1000,
            latency_ms: 0,
        }
    }
}

/// Everything a run needs
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Informational size goal, logged at startup
    pub target_data_size_mb: u64,
    /// Approximate in-memory size of one block
    pub block_size_mb: u64,
    /// Records to generate (people source)
    pub num_records: usize,
    /// Which block writer to use
    pub writer: WriterKind,
    /// Which data to generate
    pub source: SourceKind,
    /// Output codec
    pub compression: CompressionType,
    /// Output path or object key; defaults depend on the writer kind
    pub output: Option<String>,
    /// Upload the local file after writing (local writer only)
    pub upload_after_write: bool,
    /// Object key for the upload
    pub upload_key: String,
    /// Upload part size in MiB
    pub part_size_mb: u64,
    /// Random seed for the generators
    pub seed: u64,
    /// S3 connection settings
    pub s3: S3Config,
    /// Use a directory-backed store under this root instead of S3
    pub storage_root: Option<PathBuf>,
    /// Transaction source settings
    pub transactions: TransactionSettings,
    /// Mirror every block to CSV and compare it with the decoded output
    pub verify_csv: bool,
    /// Directory receiving the verification CSV files
    pub verify_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_data_size_mb: 10,
            block_size_mb: 1,
            num_records: 100_000,
            writer: WriterKind::default(),
            source: SourceKind::default(),
            compression: CompressionType::default(),
            output: None,
            upload_after_write: false,
            upload_key: "data.parquet".to_string(),
            part_size_mb: 5,
            seed: crate::source::DEFAULT_SEED,
            s3: S3Config::default(),
            storage_root: None,
            transactions: TransactionSettings::default(),
            verify_csv: false,
            verify_dir: PathBuf::from("verification"),
        }
    }
}

impl AppConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            target_data_size_mb: parse_var(&var, "TARGET_DATA_SIZE_MB")?
                .unwrap_or(defaults.target_data_size_mb),
            block_size_mb: parse_var(&var, "BLOCK_SIZE_MB")?.unwrap_or(defaults.block_size_mb),
            num_records: parse_var(&var, "NUM_RECORDS")?.unwrap_or(defaults.num_records),
            writer: parse_var(&var, "WRITER_TYPE")?.unwrap_or(defaults.writer),
            s3: S3Config::from_lookup(&lookup),
            ..defaults
        })
    }

    /// Environment values overlaid with an optional TOML file
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_env()?;
        if let Some(path) = path {
            config.apply_file(FileConfig::from_file(path)?)?;
        }
        Ok(config)
    }

    /// Override fields present in `file`
    pub fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        overlay(&mut self.target_data_size_mb, file.target_data_size_mb);
        overlay(&mut self.block_size_mb, file.block_size_mb);
        overlay(&mut self.num_records, file.num_records);
        overlay(&mut self.writer, file.writer);
        overlay(&mut self.source, file.source);
        overlay(&mut self.upload_after_write, file.upload_after_write);
        overlay(&mut self.upload_key, file.upload_key);
        overlay(&mut self.part_size_mb, file.part_size_mb);
        overlay(&mut self.seed, file.seed);
        overlay(&mut self.verify_csv, file.verify_csv);
        overlay(&mut self.verify_dir, file.verify_dir);
        if file.output.is_some() {
            self.output = file.output;
        }
        if file.storage_root.is_some() {
            self.storage_root = file.storage_root;
        }
        if let Some(codec) = file.compression {
            self.compression = codec.parse().map_err(|e| ConfigError::InvalidValue {
                key: "compression".to_string(),
                value: codec.clone(),
                reason: format!("{e}"),
            })?;
        }

        let s3 = file.s3;
        if s3.endpoint_url.is_some() {
            self.s3.endpoint_url = s3.endpoint_url;
        }
        overlay(&mut self.s3.region, s3.region);
        overlay(&mut self.s3.access_key_id, s3.access_key_id);
        overlay(&mut self.s3.secret_access_key, s3.secret_access_key);
        overlay(&mut self.s3.bucket_name, s3.bucket_name);

        let tx = file.transactions;
        overlay(&mut self.transactions.page_size, tx.page_size);
        overlay(&mut self.transactions.total_pages, tx.total_pages);
        overlay(&mut self.transactions.batch_size, tx.batch_size);
        overlay(&mut self.transactions.latency_ms, tx.latency_ms);
        Ok(())
    }

    /// Rows per block derived from the block-size hint
    pub fn rows_per_block(&self) -> usize {
        let rows = self.block_size_mb.saturating_mul(MIB) / ESTIMATED_BYTES_PER_RECORD;
        (rows as usize).max(MIN_ROWS_PER_BLOCK)
    }

    /// Where the writer puts its output
    pub fn target(&self) -> String {
        match (&self.output, self.writer) {
            (Some(output), _) => output.clone(),
            (None, WriterKind::Local) => "output/data.parquet".to_string(),
            (None, WriterKind::S3Streaming) => "data.parquet".to_string(),
        }
    }

    /// Object storage selected by this configuration
    pub fn storage_backend(&self) -> StorageBackend {
        match &self.storage_root {
            Some(root) => StorageBackend::Local(LocalConfig::new(root, &self.s3.bucket_name)),
            None => StorageBackend::S3(self.s3.clone()),
        }
    }

    /// Parquet tuning for the writers
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            part_size: self.part_size_mb.saturating_mul(MIB) as usize,
            ..WriterConfig::default()
        }
    }

    /// Log the effective settings
    pub fn log_summary(&self) {
        info!("Target data size: {} MB", self.target_data_size_mb);
        info!("Block size: {} MB", self.block_size_mb);
        info!("Number of records: {}", self.num_records);
        info!("Writer type: {}", self.writer);
        info!("Source: {}", self.source);
        info!("Compression: {}", self.compression);
        info!("S3 Bucket: {}", self.s3.bucket_name);
        if let Some(endpoint) = &self.s3.endpoint_url {
            info!("S3 Endpoint: {}", endpoint);
        }
        info!("Records per block: {}", self.rows_per_block());
        if self.verify_csv {
            info!("CSV verification: enabled ({})", self.verify_dir.display());
        }
    }
}

fn overlay<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Contents of a TOML config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// See [`AppConfig::target_data_size_mb`]
    pub target_data_size_mb: Option<u64>,
    /// See [`AppConfig::block_size_mb`]
    pub block_size_mb: Option<u64>,
    /// See [`AppConfig::num_records`]
    pub num_records: Option<usize>,
    /// See [`AppConfig::writer`]
    pub writer: Option<WriterKind>,
    /// See [`AppConfig::source`]
    pub source: Option<SourceKind>,
    /// Codec name, e.g. `zstd(5)`
    pub compression: Option<String>,
    /// See [`AppConfig::output`]
    pub output: Option<String>,
    /// See [`AppConfig::upload_after_write`]
    pub upload_after_write: Option<bool>,
    /// See [`AppConfig::upload_key`]
    pub upload_key: Option<String>,
    /// See [`AppConfig::part_size_mb`]
    pub part_size_mb: Option<u64>,
    /// See [`AppConfig::seed`]
    pub seed: Option<u64>,
    /// See [`AppConfig::storage_root`]
    pub storage_root: Option<PathBuf>,
    /// See [`AppConfig::verify_csv`]
    pub verify_csv: Option<bool>,
    /// See [`AppConfig::verify_dir`]
    pub verify_dir: Option<PathBuf>,

    /// `[s3]` section
    #[serde(default)]
    pub s3: S3FileConfig,

    /// `[transactions]` section
    #[serde(default)]
    pub transactions: TransactionFileConfig,
}

/// `[s3]` section of the config file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3FileConfig {
    /// Custom endpoint URL
    pub endpoint_url: Option<String>,
    /// AWS region
    pub region: Option<String>,
    /// Static access key id
    pub access_key_id: Option<String>,
    /// Static secret access key
    pub secret_access_key: Option<String>,
    /// Default bucket
    pub bucket_name: Option<String>,
}

/// `[transactions]` section of the config file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionFileConfig {
    /// See [`TransactionSettings::page_size`]
    pub page_size: Option<usize>,
    /// See [`TransactionSettings::total_pages`]
    pub total_pages: Option<u32>,
    /// See [`TransactionSettings::batch_size`]
    pub batch_size: Option<usize>,
    /// See [`TransactionSettings::latency_ms`]
    pub latency_ms: Option<u64>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
