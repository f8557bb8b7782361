use std::collections::VecDeque;

use crate::strategy::{ClusteringStrategy, NOISE};
use crate::{ClusterError, DistanceMatrix, HyperParams};

/// DBSCAN over a precomputed sparse distance matrix.
///
/// A point's neighbourhood is the point itself plus every stored cell in its
/// row whose distance is at most `eps`. Absent cells are never neighbours.
/// A stored self-distance is ignored, so even one above `eps` leaves the
/// point its own neighbour (scikit-learn would drop it in that case).
#[derive(Debug, Clone, PartialEq)]
pub struct Dbscan {
    /// Maximum distance between two neighbours. Default: 0.5.
    pub eps: f64,

    /// Minimum neighbourhood size (self included) for a core point.
    /// Default: 5.
    pub min_samples: usize,
}

impl Default for Dbscan {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 5,
        }
    }
}

impl Dbscan {
    pub(crate) const PARAMS: &'static [&'static str] = &["eps", "min_samples", "metric"];

    /// Builds a Dbscan from named hyper-parameters.
    pub fn from_params(params: &HyperParams) -> Result<Self, ClusterError> {
        params.reject_unknown(Self::PARAMS)?;
        params.require_precomputed()?;
        let d = Self::default();
        let eps = params.f64_or("eps", d.eps)?;
        if !(eps > 0.0) {
            return Err(ClusterError::param("eps", format!("must be positive, got {eps}")));
        }
        let min_samples = params.usize_or("min_samples", d.min_samples)?;
        if min_samples == 0 {
            return Err(ClusterError::param("min_samples", "must be at least 1"));
        }
        Ok(Self { eps, min_samples })
    }
}

impl ClusteringStrategy for Dbscan {
    fn name(&self) -> &str {
        "DBSCAN"
    }

    fn fit_predict(&self, matrix: &DistanceMatrix) -> Result<Vec<i32>, ClusterError> {
        Ok(dbscan(matrix, self.eps, self.min_samples))
    }
}

/// Runs DBSCAN and returns one label per row. Label -1 means noise;
/// clusters are numbered 0, 1, ... in discovery order.
pub(crate) fn dbscan(matrix: &DistanceMatrix, eps: f64, min_pts: usize) -> Vec<i32> {
    let n = matrix.dim();
    if n == 0 {
        return Vec::new();
    }

    const UNDEFINED: i32 = -2;

    let mut labels = vec![UNDEFINED; n];
    let mut cluster_id: i32 = -1;

    for i in 0..n {
        if labels[i] != UNDEFINED {
            continue;
        }

        let neighbors = range_query(matrix, i, eps);
        if neighbors.len() < min_pts {
            labels[i] = NOISE;
            continue;
        }

        // Start a new cluster.
        cluster_id += 1;
        labels[i] = cluster_id;

        // Seed set: neighbours minus point i.
        let mut seed: VecDeque<usize> = neighbors.into_iter().filter(|&j| j != i).collect();

        while let Some(q) = seed.pop_front() {
            if labels[q] == NOISE {
                // Border point.
                labels[q] = cluster_id;
            }
            if labels[q] != UNDEFINED {
                continue;
            }
            labels[q] = cluster_id;

            let q_neighbors = range_query(matrix, q, eps);
            if q_neighbors.len() >= min_pts {
                seed.extend(q_neighbors);
            }
        }
    }

    labels
}

/// Returns `idx` and the indices of all stored cells in its row within eps.
pub(crate) fn range_query(matrix: &DistanceMatrix, idx: usize, eps: f64) -> Vec<usize> {
    let mut out = vec![idx];
    out.extend(
        matrix
            .row(idx)
            .filter(|&(j, d)| j != idx && d <= eps)
            .map(|(j, _)| j),
    );
    out
}
