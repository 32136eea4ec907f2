//! S3 storage backend implementation.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;

use super::error::StorageError;

/// Endpoint used when LocalStack is enabled without an explicit URL
pub const DEFAULT_LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";
/// Bucket used when none is configured
pub const DEFAULT_BUCKET: &str = "parquet-data-bucket";
const DEFAULT_CREDENTIAL: &str = "test";

/// S3 connection settings.
///
/// Covers both AWS S3 and S3-compatible endpoints such as LocalStack.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Custom endpoint; `None` targets AWS S3
    pub endpoint_url: Option<String>,
    /// AWS region
    pub region: String,
    /// Static access key id
    pub access_key_id: String,
    /// Static secret access key
    pub secret_access_key: String,
    /// Bucket used for bare object keys
    pub bucket_name: String,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .finish()
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint_url: Some(DEFAULT_LOCALSTACK_ENDPOINT.to_string()),
            region: DEFAULT_REGION.to_string(),
            access_key_id: DEFAULT_CREDENTIAL.to_string(),
            secret_access_key: DEFAULT_CREDENTIAL.to_string(),
            bucket_name: DEFAULT_BUCKET.to_string(),
        }
    }
}

impl S3Config {
    /// Load from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// With `USE_LOCALSTACK=true` (the default) the endpoint comes from
    /// `LOCALSTACK_ENDPOINT_URL`, then `S3_ENDPOINT_URL`, then the LocalStack
    /// default. Otherwise `S3_ENDPOINT_URL` is used when set and AWS S3 when not.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let use_localstack = non_empty("USE_LOCALSTACK")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let endpoint_url = if use_localstack {
            Some(
                non_empty("LOCALSTACK_ENDPOINT_URL")
                    .or_else(|| non_empty("S3_ENDPOINT_URL"))
                    .unwrap_or_else(|| DEFAULT_LOCALSTACK_ENDPOINT.to_string()),
            )
        } else {
            non_empty("S3_ENDPOINT_URL")
        };

        let region = non_empty("AWS_DEFAULT_REGION")
            .or_else(|| non_empty("AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Self {
            endpoint_url,
            region,
            access_key_id: non_empty("AWS_ACCESS_KEY_ID")
                .unwrap_or_else(|| DEFAULT_CREDENTIAL.to_string()),
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY")
                .unwrap_or_else(|| DEFAULT_CREDENTIAL.to_string()),
            bucket_name: non_empty("S3_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        }
    }

    /// Human readable endpoint for logs
    pub fn endpoint_label(&self) -> &str {
        self.endpoint_url.as_deref().unwrap_or("AWS")
    }

    /// Build a client bound to `bucket`
    pub fn build_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.region)
            .with_access_key_id(&self.access_key_id)
            .with_secret_access_key(&self.secret_access_key);

        if let Some(endpoint) = &self.endpoint_url {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false)
                .with_allow_http(true);
        }

        Ok(Arc::new(builder.build()?))
    }
}
