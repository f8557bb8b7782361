use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// An opaque record key: an integer or a raw string, depending on
/// `convert-key-to-int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// Parses a raw field. In integer mode the field is trimmed and must be
    /// a decimal integer; otherwise it is kept verbatim.
    pub fn parse(raw: &str, as_int: bool) -> Result<Self, String> {
        if as_int {
            raw.trim()
                .parse::<i64>()
                .map(Key::Int)
                .map_err(|e| format!("key {raw:?} is not an integer: {e}"))
        } else {
            Ok(Key::Str(raw.to_string()))
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{v}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

/// Assigns dense indices `0, 1, 2, ...` to keys in first-seen order.
///
/// The mapping only grows. Not thread-safe; one indexer belongs to one run.
#[derive(Debug, Clone)]
pub struct KeyIndexer<K = Key> {
    index: HashMap<K, usize>,
    keys: Vec<K>,
}

impl<K> Default for KeyIndexer<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            keys: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyIndexer<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `key`, assigning the next one on first sight.
    pub fn index_of(&mut self, key: K) -> usize {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.keys.len();
        self.index.insert(key.clone(), idx);
        self.keys.push(key);
        idx
    }

    /// Returns the index of a known key without assigning one.
    pub fn get(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Returns the key at `idx`.
    pub fn key(&self, idx: usize) -> Option<&K> {
        self.keys.get(idx)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Consumes the indexer, returning keys ordered by index.
    pub fn into_keys(self) -> Vec<K> {
        self.keys
    }
}
