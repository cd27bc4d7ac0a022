mod error;
mod key;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use key::{BlobKey, validate_key};
pub use traits::{ObjectStore, StoredBlob, StoredObject, cache_control_value, strip_public_base};
