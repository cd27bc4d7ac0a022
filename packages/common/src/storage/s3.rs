use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use serde::Deserialize;

use super::error::StorageError;
use super::key::validate_key;
use super::traits::{ObjectStore, StoredObject, cache_control_value};

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct S3Config {
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use path-style addressing (`{endpoint}/{bucket}/{key}`).
    #[serde(default)]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".into()
}

/// Object store backed by an S3-compatible bucket with public-read objects.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl S3ObjectStore {
    pub fn new(config: &S3Config, public_base_url: &str) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Unavailable(format!("invalid S3 region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Unavailable(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn unavailable(action: &str, key: &str, detail: impl std::fmt::Display) -> StorageError {
    StorageError::Unavailable(format!("{action} {key}: {detail}"))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        cache_max_age: u64,
    ) -> Result<StoredObject, StorageError> {
        validate_key(key)?;

        let response = self
            .bucket
            .put_object_builder(format!("/{key}"), bytes)
            .with_content_type(content_type)
            .with_cache_control(cache_control_value(cache_max_age))
            .map_err(|e| unavailable("put", key, e))?
            .execute()
            .await
            .map_err(|e| unavailable("put", key, e))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(unavailable("put", key, format!("HTTP {status}")));
        }

        Ok(StoredObject {
            url: self.url_for(key),
            pathname: key.to_string(),
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, url_or_path: &str) -> Result<(), StorageError> {
        let key = self.pathname_for(url_or_path)?;
        let response = self
            .bucket
            .delete_object(format!("/{key}"))
            .await
            .map_err(|e| unavailable("delete", &key, e))?;

        match response.status_code() {
            200..=299 | 404 => Ok(()),
            status => Err(unavailable("delete", &key, format!("HTTP {status}"))),
        }
    }
}
