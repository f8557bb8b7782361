//! Density-based clustering over precomputed sparse distance matrices.
//!
//! Callers build a [`DistanceMatrix`] of pairwise distances, pick a strategy
//! by name from a [`Registry`], and get back one integer label per row.
//! Label [`NOISE`] (-1) marks points that belong to no cluster.
//!
//! # Usage
//!
//! ```
//! use dayclust_cluster::{DistanceMatrix, HyperParams, Registry};
//!
//! let mut m = DistanceMatrix::from_triplets(3, &[0, 0], &[1, 2], &[0.5, 0.5]).unwrap();
//! m.symmetrize();
//!
//! let params = HyperParams::from_json(r#"{"eps": 0.5, "min_samples": 3}"#).unwrap();
//! let strategy = Registry::with_defaults().build("DBSCAN", &params).unwrap();
//! assert_eq!(strategy.fit_predict(&m).unwrap(), vec![0, 0, 0]);
//! ```

mod dbscan;
mod error;
mod matrix;
mod optics;
mod params;
mod strategy;

pub use dbscan::Dbscan;
pub use error::ClusterError;
pub use matrix::DistanceMatrix;
pub use optics::{Optics, Reachability};
pub use params::{HyperParams, PRECOMPUTED};
pub use strategy::{ClusteringStrategy, Factory, NOISE, Registry};
