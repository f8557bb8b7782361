//! Serializes cluster assignments and replaces the day's output object.

use std::borrow::Cow;
use std::io::Write;

use dayclust_objstore::ObjectStore;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;

use crate::aggregate::ClusterAssignment;
use crate::config::Config;
use crate::error::{PipelineError, Result};

/// Header row of every output object.
pub const HEADER: &str = "cluster,key";

/// Writes `{output-folder}/day={day}/clusters.csv.gz`.
///
/// The existence check, delete and write are separate store calls with no
/// lock or conditional write between them.
pub struct OutputWriter<'a> {
    store: &'a dyn ObjectStore,
    cfg: &'a Config,
}

impl<'a> OutputWriter<'a> {
    pub fn new(store: &'a dyn ObjectStore, cfg: &'a Config) -> Self {
        Self { store, cfg }
    }

    /// Output object key for `day`.
    pub fn output_key(&self, day: &str) -> String {
        self.cfg.output_key(day)
    }

    /// Deletes any previous output for `day`. Returns whether one existed.
    ///
    /// "Not found" means there is nothing to clear; other storage errors
    /// propagate.
    pub fn clear(&self, day: &str) -> Result<bool> {
        let key = self.output_key(day);
        match self.store.head(&key) {
            Ok(_) => {
                info!(key = %key, "object exists, deleting old data");
                self.store.delete(&key)?;
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the assignment, returning the object key.
    pub fn write(&self, day: &str, assignment: &ClusterAssignment) -> Result<String> {
        info!("writing results");
        let key = self.output_key(day);
        let data = encode(assignment)?;
        self.store.put(&key, &data)?;
        info!(key = %key, bytes = data.len(), "results written");
        Ok(key)
    }

    /// Clears previous output, then writes the new one.
    pub fn replace(&self, day: &str, assignment: &ClusterAssignment) -> Result<String> {
        self.clear(day)?;
        self.write(day, assignment)
    }
}

/// Renders the assignment as CSV text: header, then one row per key,
/// grouped by cluster.
pub fn to_csv(assignment: &ClusterAssignment) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + assignment.clustered_keys() * 8);
    out.push_str(HEADER);
    out.push('\n');
    for (cluster, key) in assignment.rows() {
        let key = key.to_string();
        out.push_str(&cluster.to_string());
        out.push(',');
        out.push_str(&escape_field(&key));
        out.push('\n');
    }
    out
}

/// Gzip-compressed [`to_csv`].
pub fn encode(assignment: &ClusterAssignment) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(to_csv(assignment).as_bytes())
        .map_err(|e| PipelineError::Io(format!("gzip compress: {e}")))?;
    encoder
        .finish()
        .map_err(|e| PipelineError::Io(format!("gzip finish: {e}")))
}

/// Quotes a field containing a delimiter, quote or line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
