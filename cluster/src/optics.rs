use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::strategy::{ClusteringStrategy, NOISE};
use crate::{ClusterError, DistanceMatrix, HyperParams};

/// OPTICS over a precomputed sparse distance matrix, with DBSCAN-style
/// cluster extraction from the reachability plot.
#[derive(Debug, Clone, PartialEq)]
pub struct Optics {
    /// Neighbourhood size (self included) that defines the core distance.
    /// Default: 5.
    pub min_samples: usize,

    /// Neighbour search radius. Default: unbounded.
    pub max_eps: f64,

    /// Extraction threshold. Default: `max_eps`.
    pub eps: f64,
}

impl Default for Optics {
    fn default() -> Self {
        Self {
            min_samples: 5,
            max_eps: f64::INFINITY,
            eps: f64::INFINITY,
        }
    }
}

/// The reachability plot computed by [`Optics::ordering`].
#[derive(Debug, Clone)]
pub struct Reachability {
    /// Visit order of the points.
    pub ordering: Vec<usize>,
    /// Reachability distance per point (`INFINITY` if unreachable).
    pub reachability: Vec<f64>,
    /// Core distance per point (`INFINITY` if not a core point).
    pub core_distances: Vec<f64>,
}

impl Optics {
    pub(crate) const PARAMS: &'static [&'static str] =
        &["min_samples", "max_eps", "eps", "cluster_method", "metric"];

    /// Builds an Optics from named hyper-parameters.
    ///
    /// Only `cluster_method = "dbscan"` is available.
    pub fn from_params(params: &HyperParams) -> Result<Self, ClusterError> {
        params.reject_unknown(Self::PARAMS)?;
        params.require_precomputed()?;
        let method = params.str_or("cluster_method", "dbscan")?;
        if method != "dbscan" {
            return Err(ClusterError::param(
                "cluster_method",
                format!("only \"dbscan\" extraction is supported, got {method:?}"),
            ));
        }
        let d = Self::default();
        let min_samples = params.usize_or("min_samples", d.min_samples)?;
        if min_samples == 0 {
            return Err(ClusterError::param("min_samples", "must be at least 1"));
        }
        let max_eps = params.f64_or("max_eps", d.max_eps)?;
        if !(max_eps > 0.0) {
            return Err(ClusterError::param("max_eps", format!("must be positive, got {max_eps}")));
        }
        let eps = params.f64_or("eps", max_eps)?;
        if eps > max_eps {
            return Err(ClusterError::param(
                "eps",
                format!("must not exceed max_eps ({eps} > {max_eps})"),
            ));
        }
        Ok(Self {
            min_samples,
            max_eps,
            eps,
        })
    }

    /// Computes the OPTICS ordering and reachability plot.
    ///
    /// The next point is the unprocessed one with the smallest reachability,
    /// ties going to the lowest index. A `min_samples` of 0 behaves as 1.
    pub fn ordering(&self, matrix: &DistanceMatrix) -> Reachability {
        let n = matrix.dim();
        let neighbors: Vec<Vec<(usize, f64)>> = (0..n).map(|i| self.neighbors(matrix, i)).collect();
        let kth = self.min_samples.saturating_sub(1);
        let core_distances: Vec<f64> = neighbors
            .iter()
            .map(|nb| {
                let mut d: Vec<f64> = nb.iter().map(|&(_, d)| d).collect();
                d.sort_by(f64::total_cmp);
                d.get(kth).copied().unwrap_or(f64::INFINITY)
            })
            .collect();

        let mut reachability = vec![f64::INFINITY; n];
        let mut processed = vec![false; n];
        let mut ordering = Vec::with_capacity(n);
        // Seeds keyed by (reachability bits, index). Distances are
        // non-negative, so bit order is numeric order. Entries left behind
        // by a later decrease are skipped on pop.
        let mut seeds: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
        let mut next_unseen = 0;

        while ordering.len() < n {
            let point = loop {
                match seeds.pop() {
                    Some(Reverse((bits, j))) => {
                        if !processed[j] && bits == reachability[j].to_bits() {
                            break j;
                        }
                    }
                    None => {
                        while processed[next_unseen] {
                            next_unseen += 1;
                        }
                        break next_unseen;
                    }
                }
            };
            processed[point] = true;
            ordering.push(point);

            let core = core_distances[point];
            if core.is_infinite() {
                continue;
            }
            for &(j, d) in &neighbors[point] {
                if processed[j] {
                    continue;
                }
                let r = d.max(core);
                if r < reachability[j] {
                    reachability[j] = r;
                    seeds.push(Reverse((r.to_bits(), j)));
                }
            }
        }

        Reachability {
            ordering,
            reachability,
            core_distances,
        }
    }

    /// Self at distance 0 plus stored cells within `max_eps`.
    fn neighbors(&self, matrix: &DistanceMatrix, i: usize) -> Vec<(usize, f64)> {
        let mut out = vec![(i, 0.0)];
        out.extend(
            matrix
                .row(i)
                .filter(|&(j, d)| j != i && d <= self.max_eps),
        );
        out
    }
}

/// Extracts DBSCAN-equivalent labels from a reachability plot at `eps`.
pub(crate) fn extract_dbscan(plot: &Reachability, eps: f64) -> Vec<i32> {
    let n = plot.core_distances.len();
    let mut labels = vec![NOISE; n];
    let mut current: i32 = -1;
    for &p in &plot.ordering {
        let far_reach = plot.reachability[p] > eps;
        let near_core = plot.core_distances[p] <= eps;
        if far_reach && near_core {
            current += 1;
        }
        labels[p] = if far_reach && !near_core {
            NOISE
        } else {
            current
        };
    }
    labels
}

impl ClusteringStrategy for Optics {
    fn name(&self) -> &str {
        "OPTICS"
    }

    fn fit_predict(&self, matrix: &DistanceMatrix) -> Result<Vec<i32>, ClusterError> {
        let plot = self.ordering(matrix);
        Ok(extract_dbscan(&plot, self.eps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric(n: usize, cells: &[(usize, usize, f64)]) -> DistanceMatrix {
        let mut m = DistanceMatrix::new(n);
        for &(i, j, d) in cells {
            m.set(i, j, d).unwrap();
        }
        m.symmetrize();
        m
    }

    #[test]
    fn matches_dbscan_on_star() {
        let m = symmetric(5, &[(0, 1, 0.5), (0, 2, 0.5), (3, 4, 0.9)]);
        let optics = Optics {
            min_samples: 3,
            max_eps: f64::INFINITY,
            eps: 0.5,
        };
        assert_eq!(optics.fit_predict(&m).unwrap(), vec![0, 0, 0, -1, -1]);
    }

    #[test]
    fn two_groups_by_reachability() {
        let m = symmetric(
            6,
            &[
                (0, 1, 0.1),
                (1, 2, 0.1),
                (0, 2, 0.1),
                (3, 4, 0.1),
                (4, 5, 0.1),
                (3, 5, 0.1),
                (2, 3, 2.0),
            ],
        );
        let optics = Optics {
            min_samples: 2,
            max_eps: f64::INFINITY,
            eps: 0.5,
        };
        let labels = optics.fit_predict(&m).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
        assert!(labels.iter().all(|&l| l >= 0));
    }

    #[test]
    fn ordering_visits_every_point_once() {
        let m = symmetric(4, &[(0, 1, 0.3), (2, 3, 0.3)]);
        let plot = Optics::default().ordering(&m);
        let mut seen = plot.ordering.clone();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        // min_samples 5 > any neighbourhood: nobody is core.
        assert!(plot.core_distances.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn zero_min_samples_acts_as_one() {
        let m = symmetric(3, &[(0, 1, 0.2)]);
        let zero = Optics {
            min_samples: 0,
            max_eps: f64::INFINITY,
            eps: 0.5,
        };
        let one = Optics {
            min_samples: 1,
            ..zero.clone()
        };
        assert_eq!(zero.fit_predict(&m).unwrap(), vec![0, 0, 1]);
        assert_eq!(zero.fit_predict(&m).unwrap(), one.fit_predict(&m).unwrap());
        assert!(zero.ordering(&m).core_distances.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn ordering_follows_smallest_reachability() {
        // 0 reaches 2 at 0.1 before 1 at 0.3; 3 is only reachable from 1.
        let m = symmetric(5, &[(0, 1, 0.3), (0, 2, 0.1), (1, 3, 0.2), (2, 1, 0.25)]);
        let optics = Optics {
            min_samples: 1,
            max_eps: f64::INFINITY,
            eps: 0.5,
        };
        let plot = optics.ordering(&m);
        assert_eq!(plot.ordering, vec![0, 2, 1, 3, 4]);
        assert_eq!(plot.reachability[1], 0.25);
        assert!(plot.reachability[4].is_infinite());
    }

    #[test]
    fn ordering_ties_go_to_lowest_index() {
        let m = symmetric(4, &[(0, 3, 0.4), (0, 2, 0.4), (0, 1, 0.4)]);
        let optics = Optics {
            min_samples: 1,
            max_eps: f64::INFINITY,
            eps: 0.5,
        };
        assert_eq!(optics.ordering(&m).ordering, vec![0, 1, 2, 3]);
    }

    #[test]
    fn from_params_defaults_and_errors() {
        let o = Optics::from_params(&HyperParams::new()).unwrap();
        assert_eq!(o, Optics::default());

        let p = HyperParams::from_json(r#"{"max_eps": 1.0, "eps": 0.5, "min_samples": 2}"#).unwrap();
        let o = Optics::from_params(&p).unwrap();
        assert_eq!(o.eps, 0.5);
        assert_eq!(o.max_eps, 1.0);

        let xi = HyperParams::from_json(r#"{"cluster_method": "xi"}"#).unwrap();
        assert!(Optics::from_params(&xi).is_err());

        let too_wide = HyperParams::from_json(r#"{"max_eps": 1.0, "eps": 2.0}"#).unwrap();
        assert!(Optics::from_params(&too_wide).is_err());
    }
}
