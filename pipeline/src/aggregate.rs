use std::collections::BTreeMap;

use dayclust_cluster::NOISE;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::key::Key;

/// Original keys grouped by cluster id, noise excluded.
///
/// Clusters iterate in ascending id order; keys inside a cluster keep
/// ascending index order, which is first-seen ingestion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterAssignment {
    groups: BTreeMap<i32, Vec<Key>>,
}

impl ClusterAssignment {
    /// Groups `keys[i]` under `labels[i]`, dropping [`NOISE`] labels.
    ///
    /// Fails if the sequences differ in length or a label is below -1.
    pub fn from_labels(keys: &[Key], labels: &[i32]) -> Result<Self> {
        if keys.len() != labels.len() {
            return Err(PipelineError::InvalidLabels(format!(
                "{} labels for {} keys",
                labels.len(),
                keys.len()
            )));
        }
        let mut groups: BTreeMap<i32, Vec<Key>> = BTreeMap::new();
        for (idx, &label) in labels.iter().enumerate() {
            if label == NOISE {
                continue;
            }
            if label < NOISE {
                return Err(PipelineError::InvalidLabels(format!(
                    "label {label} at index {idx}"
                )));
            }
            groups.entry(label).or_default().push(keys[idx].clone());
        }
        let out = Self { groups };
        info!(clusters = out.clusters(), "clusters");
        info!(sizes = ?out.sizes(), "cluster sizes");
        Ok(out)
    }

    /// Number of distinct clusters.
    pub fn clusters(&self) -> usize {
        self.groups.len()
    }

    /// Number of keys assigned to any cluster.
    pub fn clustered_keys(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Cluster sizes in cluster id order.
    pub fn sizes(&self) -> Vec<usize> {
        self.groups.values().map(Vec::len).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Keys of one cluster.
    pub fn get(&self, cluster: i32) -> Option<&[Key]> {
        self.groups.get(&cluster).map(Vec::as_slice)
    }

    /// Iterates `(cluster, keys)` in cluster id order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[Key])> {
        self.groups.iter().map(|(&c, keys)| (c, keys.as_slice()))
    }

    /// Iterates one `(cluster, key)` pair per output row.
    pub fn rows(&self) -> impl Iterator<Item = (i32, &Key)> {
        self.groups
            .iter()
            .flat_map(|(&c, keys)| keys.iter().map(move |k| (c, k)))
    }
}
