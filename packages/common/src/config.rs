use serde::Deserialize;

#[cfg(feature = "object-storage")]
pub use crate::storage::s3::S3Config;
pub use crate::transcode::TranscodeOptions;

/// Which object store backend to construct.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    S3,
}

/// Object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend kind. Default: filesystem.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/blobs".
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Public URL prefix objects are reachable under.
    /// Default: "http://127.0.0.1:3000/blobs".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[cfg(feature = "object-storage")]
    #[serde(default)]
    pub s3: Option<S3Config>,
}

fn default_storage_root() -> String {
    "./data/blobs".into()
}
fn default_public_base_url() -> String {
    "http://127.0.0.1:3000/blobs".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
            #[cfg(feature = "object-storage")]
            s3: None,
        }
    }
}

/// Upload limits.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes. Default: 10 MiB.
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Declared content types accepted for the `image` part.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// `Cache-Control` max-age for stored images, in seconds. Default: one year.
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u64,
}

fn default_max_size() -> u64 {
    10 * 1024 * 1024
}
fn default_allowed_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/webp", "image/svg+xml"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_cache_max_age() -> u64 {
    365 * 24 * 60 * 60
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            allowed_types: default_allowed_types(),
            cache_max_age: default_cache_max_age(),
        }
    }
}

impl UploadConfig {
    /// Check a declared content type against the allow-list.
    ///
    /// Parameters such as `; charset=utf-8` are ignored and `image/jpg` is
    /// treated as `image/jpeg`. Returns the normalized type when allowed.
    pub fn accept(&self, declared: &str) -> Option<String> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let essence = if essence == "image/jpg" {
            "image/jpeg".to_string()
        } else {
            essence
        };

        self.allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
            .then_some(essence)
    }
}
