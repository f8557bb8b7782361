//! Streams distance triples into a symmetric sparse matrix.

use std::io::{BufRead, BufReader, Read};

use dayclust_cluster::DistanceMatrix;
use dayclust_objstore::ObjectStore;
use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::config::{CapScope, Config};
use crate::error::{PipelineError, Result};
use crate::key::{Key, KeyIndexer};

/// Stored in place of a recorded distance of exactly 0, so the cell stays
/// distinguishable from an absent one.
pub const ZERO_DISTANCE_EPSILON: f64 = 0.001;

/// Replaces a zero distance with [`ZERO_DISTANCE_EPSILON`].
pub fn normalize_distance(distance: f64) -> f64 {
    if distance == 0.0 {
        ZERO_DISTANCE_EPSILON
    } else {
        distance
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRecord {
    pub key_a: Key,
    pub key_b: Key,
    pub distance: f64,
}

impl DistanceRecord {
    /// Parses `key_a,key_b,distance`. A trailing line terminator is ignored.
    pub fn parse(line: &str, convert_key_to_int: bool) -> std::result::Result<Self, String> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut fields = line.split(',');
        let (Some(a), Some(b), Some(d), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(format!(
                "expected 3 comma-separated fields, got {}",
                line.split(',').count()
            ));
        };
        let distance: f64 = d
            .trim()
            .parse()
            .map_err(|e| format!("distance {d:?} is not a number: {e}"))?;
        if !distance.is_finite() || distance < 0.0 {
            return Err(format!("distance {d:?} must be finite and non-negative"));
        }
        Ok(Self {
            key_a: Key::parse(a, convert_key_to_int)?,
            key_b: Key::parse(b, convert_key_to_int)?,
            distance,
        })
    }
}

/// A finished matrix and the index→key map it was built over.
#[derive(Debug, Clone)]
pub struct BuiltMatrix {
    /// `keys[i]` is the key of row/column `i`.
    pub keys: Vec<Key>,
    pub matrix: DistanceMatrix,
    /// Records loaded.
    pub records: usize,
    /// Partitions opened.
    pub partitions: usize,
    /// Whether ingestion stopped at the record cap.
    pub limit_reached: bool,
}

/// Accumulates records from partition sources in order.
///
/// Owns the [`KeyIndexer`] for one run. Feed sources with
/// [`ingest`](Self::ingest) until it returns false, then call
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct DistanceMatrixBuilder {
    indexer: KeyIndexer<Key>,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
    convert_key_to_int: bool,
    max_records: usize,
    cap_scope: CapScope,
    partitions: usize,
    limit_reached: bool,
}

impl DistanceMatrixBuilder {
    pub fn new(cfg: &Config) -> Self {
        Self {
            indexer: KeyIndexer::new(),
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
            convert_key_to_int: cfg.convert_key_to_int,
            max_records: cfg.max_records,
            cap_scope: cfg.record_cap_scope,
            partitions: 0,
            limit_reached: false,
        }
    }

    /// Reads one partition line by line.
    ///
    /// Returns false once the record cap has been reached, meaning no
    /// further sources should be read.
    pub fn ingest<R: BufRead>(&mut self, source: &str, reader: R) -> Result<bool> {
        if self.limit_reached {
            return Ok(false);
        }
        self.partitions += 1;

        let mut in_source = 0usize;
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| PipelineError::Io(format!("read {source}: {e}")))?;
            let record = DistanceRecord::parse(&line, self.convert_key_to_int).map_err(|reason| {
                PipelineError::MalformedRecord {
                    source_key: source.to_string(),
                    line: idx + 1,
                    reason,
                }
            })?;
            self.push(record);
            in_source += 1;

            let position = match self.cap_scope {
                CapScope::Partition => in_source,
                CapScope::Total => self.values.len(),
            };
            if position >= self.max_records {
                info!(source, max_records = self.max_records, "limit reached");
                self.limit_reached = true;
                return Ok(false);
            }
        }
        debug!(source, records = in_source, "partition loaded");
        Ok(true)
    }

    fn push(&mut self, record: DistanceRecord) {
        let row = self.indexer.index_of(record.key_a);
        let col = self.indexer.index_of(record.key_b);
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(normalize_distance(record.distance));
    }

    /// Builds the N×N matrix over all keys seen and symmetrizes it.
    pub fn finish(self) -> Result<BuiltMatrix> {
        let n = self.indexer.len();
        info!(distances = self.values.len(), keys = n, "records loaded");
        let mut matrix = DistanceMatrix::from_triplets(n, &self.rows, &self.cols, &self.values)?;
        matrix.symmetrize();
        info!(entries = matrix.nnz(), "matrix built");
        Ok(BuiltMatrix {
            records: self.values.len(),
            keys: self.indexer.into_keys(),
            matrix,
            partitions: self.partitions,
            limit_reached: self.limit_reached,
        })
    }
}

/// Opens a partition, gunzipping keys that end in `.gz`.
pub fn open_partition(store: &dyn ObjectStore, key: &str) -> Result<Box<dyn BufRead + Send>> {
    let raw = store.open(key)?;
    let reader: Box<dyn Read + Send> = if key.ends_with(".gz") {
        Box::new(GzDecoder::new(raw))
    } else {
        raw
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Builds the day's matrix from every partition under the day's input
/// prefix, in listing order.
pub fn build_for_day(store: &dyn ObjectStore, cfg: &Config, day: &str) -> Result<BuiltMatrix> {
    let prefix = cfg.input_prefix(day);
    info!(prefix = %prefix, "building distance matrix");
    let mut builder = DistanceMatrixBuilder::new(cfg);
    for key in store.list(&prefix)? {
        let reader = open_partition(store, &key)?;
        if !builder.ingest(&key, reader)? {
            break;
        }
    }
    builder.finish()
}
