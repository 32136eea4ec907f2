use std::fmt;

use object_store::path::Path;

use super::error::StorageError;

const S3_SCHEME: &str = "s3://";

/// Object location within a named bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Bucket name
    pub bucket: String,
    /// Object key inside the bucket
    pub key: Path,
}

impl RemoteTarget {
    /// Parse `s3://bucket/key`, or a bare key placed in `default_bucket`.
    pub fn parse(target: &str, default_bucket: &str) -> Result<Self, StorageError> {
        let (bucket, key) = match target.strip_prefix(S3_SCHEME) {
            Some(rest) => match rest.split_once('/') {
                Some((bucket, key)) => (bucket, key),
                None => (rest, ""),
            },
            None => (default_bucket, target),
        };

        if bucket.is_empty() {
            return Err(StorageError::InvalidTarget(format!(
                "no bucket in target: {target}"
            )));
        }

        let key = Path::parse(key.trim_matches('/'))
            .map_err(|e| StorageError::InvalidTarget(format!("{target}: {e}")))?;
        if key.as_ref().is_empty() {
            return Err(StorageError::InvalidTarget(format!(
                "no object key in target: {target}"
            )));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key,
        })
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", S3_SCHEME, self.bucket, self.key)
    }
}
