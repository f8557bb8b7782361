//! Object storage interface and implementations.
//!
//! Objects are addressed by `/`-separated string keys and listed in
//! lexicographic order. Provides an in-memory implementation for testing
//! and a filesystem-backed implementation for local runs.

pub mod fs;
pub mod memory;

use std::fmt;
use std::io::Read;

use thiserror::Error;

/// Errors that can occur in object store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("objstore: not found: {0}")]
    NotFound(String),

    #[error("objstore: invalid key: {0:?}")]
    InvalidKey(String),

    #[error("objstore: io error: {0}")]
    Io(String),
}

impl StoreError {
    /// Reports whether the error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata returned by [`ObjectStore::head`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
}

/// Object store trait.
///
/// Implementations are blocking. Callers own any consistency guarantees
/// across calls: nothing here is conditional or versioned.
pub trait ObjectStore: Send + Sync {
    /// Lists object keys under a prefix, sorted lexicographically.
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Returns object metadata, or [`StoreError::NotFound`].
    fn head(&self, key: &str) -> StoreResult<ObjectMeta>;

    /// Opens an object for streaming reads.
    fn open(&self, key: &str) -> StoreResult<Box<dyn Read + Send>>;

    /// Creates or replaces an object.
    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()>;

    /// Deletes an object. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Reads a whole object into memory.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let mut reader = self.open(key)?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| StoreError::Io(format!("read {key}: {e}")))?;
        Ok(buf)
    }
}

impl fmt::Debug for dyn ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectStore {{ ... }}")
    }
}

pub use fs::FsStore;
pub use memory::MemoryStore;
