//! Filesystem-backed object store implementation.
//!
//! Each object is a regular file below the root directory; the object key
//! is its `/`-separated path relative to the root.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::{ObjectMeta, ObjectStore, StoreError, StoreResult};

/// An object store rooted at a local directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        Ok(Self { root })
    }

    fn path_of(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.clone();
        for seg in key.split('/') {
            if seg.is_empty() || seg == "." || seg == ".." {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
            path.push(seg);
        }
        Ok(path)
    }

    fn not_found_or(key: &str, path: &Path, e: io::Error) -> StoreError {
        if e.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(key.to_string())
        } else {
            io_err(path, e)
        }
    }
}

fn io_err(path: &Path, e: io::Error) -> StoreError {
    StoreError::Io(format!("{}: {e}", path.display()))
}

/// Collects every file below `dir` as a `/`-joined key relative to the root.
fn walk(dir: &Path, rel: &str, keys: &mut Vec<String>) -> StoreResult<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_err(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if rel.is_empty() {
            name
        } else {
            format!("{rel}/{name}")
        };
        let ty = entry.file_type().map_err(|e| io_err(&entry.path(), e))?;
        if ty.is_dir() {
            walk(&entry.path(), &key, keys)?;
        } else if ty.is_file() {
            keys.push(key);
        }
    }
    Ok(())
}

impl ObjectStore for FsStore {
    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        // Only walk the deepest directory fully named by the prefix.
        let (dir_rel, _) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let start = if dir_rel.is_empty() {
            self.root.clone()
        } else {
            match self.path_of(dir_rel) {
                Ok(p) => p,
                Err(_) => return Ok(Vec::new()),
            }
        };

        let mut keys = Vec::new();
        walk(&start, dir_rel, &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn head(&self, key: &str) -> StoreResult<ObjectMeta> {
        let path = self.path_of(key)?;
        let meta = fs::metadata(&path).map_err(|e| Self::not_found_or(key, &path, e))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(ObjectMeta {
            key: key.to_string(),
            size: meta.len(),
        })
    }

    fn open(&self, key: &str) -> StoreResult<Box<dyn Read + Send>> {
        let path = self.path_of(key)?;
        let file = fs::File::open(&path).map_err(|e| Self::not_found_or(key, &path, e))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn put(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        let path = self.path_of(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        fs::write(&path, data).map_err(|e| io_err(&path, e))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.path_of(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}
