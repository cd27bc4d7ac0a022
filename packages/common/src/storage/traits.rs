use async_trait::async_trait;
use serde::Serialize;

use super::error::StorageError;
use super::key::validate_key;

/// Reference to an object that was written to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Public, absolute URL of the object.
    pub url: String,
    /// Store-internal key of the object.
    pub pathname: String,
    pub content_type: String,
}

/// Object content read back from a store.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub cache_max_age: u64,
}

/// Public-URL object storage.
///
/// Implementations are explicitly constructed and injected; callers never
/// reach for a process-wide client.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Base URL under which objects are publicly reachable, without a
    /// trailing slash.
    fn public_base_url(&self) -> &str;

    /// Store `bytes` under `key` and return its public reference.
    ///
    /// Called once per upload with the final bytes, so a failure leaves
    /// nothing behind.
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        cache_max_age: u64,
    ) -> Result<StoredObject, StorageError>;

    /// Delete an object by public URL or pathname.
    ///
    /// Deleting an object that does not exist is not an error.
    async fn delete(&self, url_or_path: &str) -> Result<(), StorageError>;

    /// Read an object back. Stores whose URLs are served by a third party
    /// don't support this.
    async fn get(&self, pathname: &str) -> Result<StoredBlob, StorageError> {
        Err(StorageError::NotFound(pathname.to_string()))
    }

    /// Resolve a public URL or a bare pathname to a validated object key.
    fn pathname_for(&self, url_or_path: &str) -> Result<String, StorageError> {
        let trimmed = url_or_path.trim();
        let key = match strip_public_base(trimmed, self.public_base_url()) {
            Some(rest) => rest,
            None if trimmed.contains("://") => {
                return Err(StorageError::InvalidKey(format!(
                    "URL is not served by this store: {trimmed}"
                )));
            }
            None => trimmed,
        };
        validate_key(key)?;
        Ok(key.to_string())
    }

    /// Public URL for a key.
    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url(), key)
    }
}

/// Strip `base` (and the following slash) from `url`, ignoring any query or
/// fragment.
pub fn strip_public_base<'a>(url: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// `Cache-Control` header value for a public object.
pub fn cache_control_value(max_age: u64) -> String {
    format!("public, max-age={max_age}")
}
