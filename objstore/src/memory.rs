//! In-memory object store implementation for testing.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{ObjectMeta, ObjectStore, StoreError, StoreResult};

/// An in-memory object store backed by a BTreeMap.
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.data.lock().map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl ObjectStore for MemoryStore {
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let data = self.lock()?;
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn head(&self, key: &str) -> StoreResult<ObjectMeta> {
        let data = self.lock()?;
        match data.get(key) {
            Some(v) => Ok(ObjectMeta {
                key: key.to_string(),
                size: v.len() as u64,
            }),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn open(&self, key: &str) -> StoreResult<Box<dyn Read + Send>> {
        let data = self.lock()?;
        match data.get(key) {
            Some(v) => Ok(Box::new(Cursor::new(v.clone()))),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut data = self.lock()?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut data = self.lock()?;
        data.remove(key);
        Ok(())
    }
}
