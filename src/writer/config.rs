use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties, WriterVersion};
use parquet::format::KeyValue;

use super::error::WriterError;

/// Compression codec applied to every column chunk of the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// Snappy compression (fast, the default)
    #[default]
    Snappy,
    /// GZIP compression at the given level (0-9)
    Gzip(u32),
    /// ZSTD compression at the given level (1-22)
    Zstd(i32),
    /// LZ4 raw block compression
    Lz4,
    /// Brotli compression at the given level (0-11)
    Brotli(u32),
    /// No compression
    Uncompressed,
}

impl CompressionType {
    /// Codec name without level, as reported in write statistics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Gzip(_) => "gzip",
            Self::Zstd(_) => "zstd",
            Self::Lz4 => "lz4",
            Self::Brotli(_) => "brotli",
            Self::Uncompressed => "none",
        }
    }

    pub(super) fn to_parquet(self) -> Result<Compression, WriterError> {
        let invalid = |e: parquet::errors::ParquetError| WriterError::InvalidConfig(e.to_string());
        Ok(match self {
            Self::Snappy => Compression::SNAPPY,
            Self::Gzip(level) => Compression::GZIP(GzipLevel::try_new(level).map_err(invalid)?),
            Self::Zstd(level) => Compression::ZSTD(ZstdLevel::try_new(level).map_err(invalid)?),
            Self::Lz4 => Compression::LZ4_RAW,
            Self::Brotli(level) => {
                Compression::BROTLI(BrotliLevel::try_new(level).map_err(invalid)?)
            }
            Self::Uncompressed => Compression::UNCOMPRESSED,
        })
    }
}

impl CompressionType {
    /// Reject levels outside the codec's supported range
    fn validated(self) -> Result<Self, WriterError> {
        self.to_parquet().map(|_| self)
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gzip(level) | Self::Brotli(level) => write!(f, "{}({})", self.name(), level),
            Self::Zstd(level) => write!(f, "{}({})", self.name(), level),
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for CompressionType {
    type Err = WriterError;

    /// Parse a codec name such as `snappy`, `zstd` or `zstd(9)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let (name, level) = match normalized.split_once('(') {
            Some((name, rest)) => {
                let level = rest.strip_suffix(')').ok_or_else(|| {
                    WriterError::InvalidConfig(format!("malformed compression codec: {s}"))
                })?;
                (name.trim(), Some(level.trim()))
            }
            None => (normalized.as_str(), None),
        };

        let parse_level = |default: i64| -> Result<i64, WriterError> {
            match level {
                Some(l) => l.parse::<i64>().map_err(|_| {
                    WriterError::InvalidConfig(format!("invalid compression level: {l}"))
                }),
                None => Ok(default),
            }
        };
        let no_level = |codec: Self| -> Result<Self, WriterError> {
            match level {
                Some(_) => Err(WriterError::InvalidConfig(format!(
                    "compression codec {} does not take a level",
                    codec.name()
                ))),
                None => Ok(codec),
            }
        };

        match name {
            "snappy" => no_level(Self::Snappy),
            "lz4" | "lz4_raw" => no_level(Self::Lz4),
            "none" | "uncompressed" => no_level(Self::Uncompressed),
            "gzip" => Self::Gzip(narrow_level(parse_level(6)?)?).validated(),
            "zstd" => Self::Zstd(narrow_level(parse_level(3)?)?).validated(),
            "brotli" => Self::Brotli(narrow_level(parse_level(1)?)?).validated(),
            other => Err(WriterError::InvalidConfig(format!(
                "unknown compression codec: {other}"
            ))),
        }
    }
}

fn narrow_level<T: TryFrom<i64>>(level: i64) -> Result<T, WriterError> {
    T::try_from(level)
        .map_err(|_| WriterError::InvalidConfig(format!("invalid compression level: {level}")))
}

/// Parquet tuning shared by the local and remote writers
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Upper bound on rows per row group. Every block is flushed as its own
    /// row group, so this only splits blocks larger than the bound.
    pub row_group_size: usize,

    /// Data page size in bytes
    pub data_page_size: usize,

    /// Whether to dictionary-encode columns
    pub dictionary_enabled: bool,

    /// Whether to write column chunk statistics
    pub write_statistics: bool,

    /// Upload buffer capacity in bytes for the remote writer. Once exceeded
    /// the object store switches to a multipart upload with parts of this size.
    pub part_size: usize,

    /// Maximum number of parts uploaded concurrently by the remote writer
    pub max_upload_concurrency: usize,

    /// Key-value metadata embedded in the Parquet footer
    pub key_value_metadata: HashMap<String, String>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            row_group_size: 1024 * 1024,
            // 1MB data pages
            data_page_size: 1024 * 1024,
            dictionary_enabled: true,
            write_statistics: true,
            // S3 rejects parts smaller than 5MB (except the last one)
            part_size: 5 * 1024 * 1024,
            max_upload_concurrency: 8,
            key_value_metadata: HashMap::new(),
        }
    }
}

impl WriterConfig {
    /// Create writer properties for a session using the given codec
    pub(super) fn to_writer_properties(
        &self,
        compression: CompressionType,
    ) -> Result<WriterProperties, WriterError> {
        let statistics = if self.write_statistics {
            EnabledStatistics::Chunk
        } else {
            EnabledStatistics::None
        };

        let mut builder = WriterProperties::builder()
            .set_writer_version(WriterVersion::PARQUET_2_0)
            .set_compression(compression.to_parquet()?)
            .set_dictionary_enabled(self.dictionary_enabled)
            .set_data_page_size_limit(self.data_page_size)
            .set_statistics_enabled(statistics)
            .set_max_row_group_size(self.row_group_size.max(1))
            .set_created_by(format!("parquet-blocks version {}", env!("CARGO_PKG_VERSION")));

        if !self.key_value_metadata.is_empty() {
            let kv_metadata: Vec<KeyValue> = self
                .key_value_metadata
                .iter()
                .map(|(k, v)| KeyValue {
                    key: k.clone(),
                    value: Some(v.clone()),
                })
                .collect();
            builder = builder.set_key_value_metadata(Some(kv_metadata));
        }

        Ok(builder.build())
    }
}
