use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::error::StorageError;
use super::key::validate_key;
use super::traits::{ObjectStore, StoredBlob, StoredObject};

/// Sidecar metadata persisted next to each object.
#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    cache_max_age: u64,
}

/// Filesystem-backed object store whose objects are served by this process.
///
/// Layout under `base_path`:
/// `objects/{key}` holds content, `meta/{key}.json` holds the sidecar and
/// `.tmp/` holds in-flight writes that are renamed into place.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(
        base_path: PathBuf,
        public_base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(base_path.join("objects")).await?;
        fs::create_dir_all(base_path.join("meta")).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join("objects").join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_path.join("meta").join(format!("{key}.json"))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_atomic(&self, dest: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, dest).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> Result<bool, StorageError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
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

        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            cache_max_age,
        };
        let meta_json = serde_json::to_vec(&meta)
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;

        // Sidecar first, so a visible object always has metadata.
        self.write_atomic(&self.meta_path(key), &meta_json).await?;
        if let Err(e) = self.write_atomic(&self.object_path(key), bytes).await {
            let _ = fs::remove_file(self.meta_path(key)).await;
            return Err(e);
        }

        Ok(StoredObject {
            url: self.url_for(key),
            pathname: key.to_string(),
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, url_or_path: &str) -> Result<(), StorageError> {
        let key = self.pathname_for(url_or_path)?;
        remove_if_exists(&self.object_path(&key)).await?;
        remove_if_exists(&self.meta_path(&key)).await?;
        Ok(())
    }

    async fn get(&self, pathname: &str) -> Result<StoredBlob, StorageError> {
        validate_key(pathname)?;

        let bytes = match fs::read(self.object_path(pathname)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(pathname.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let meta = match fs::read(self.meta_path(pathname)).await {
            Ok(raw) => serde_json::from_slice::<ObjectMeta>(&raw).ok(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let meta = meta.unwrap_or_else(|| ObjectMeta {
            content_type: "application/octet-stream".into(),
            cache_max_age: 0,
        });

        Ok(StoredBlob {
            bytes,
            content_type: meta.content_type,
            cache_max_age: meta.cache_max_age,
        })
    }
}
