/// Errors that can occur during object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),
    /// The key, path or URL does not name a valid object in this store.
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    /// Transport or authorization failure talking to the backing service.
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    /// A local I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
