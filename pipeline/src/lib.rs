//! Day-partitioned distance clustering.
//!
//! Reads a day's distance-triple partitions (`key_a,key_b,distance` per
//! line) from an [`ObjectStore`](dayclust_objstore::ObjectStore), builds one
//! symmetric sparse distance matrix over the distinct keys, clusters it with
//! a registered strategy, and writes `cluster,key` rows for every key that
//! landed in a cluster.
//!
//! # Usage
//!
//! ```
//! use dayclust_objstore::MemoryStore;
//! use dayclust_pipeline::{Config, Pipeline};
//!
//! let store = MemoryStore::new();
//! let pipeline = Pipeline::with_default_registry(Config::default(), Box::new(store)).unwrap();
//!
//! let outcome = pipeline.handle(&serde_json::json!({"day": "2024-01-01"})).unwrap();
//! assert!(outcome.success);
//! assert_eq!(outcome.clusters, Some(0));
//! ```

pub mod aggregate;
pub mod builder;
pub mod config;
pub mod error;
pub mod event;
pub mod key;
pub mod output;
pub mod pipeline;

pub use aggregate::ClusterAssignment;
pub use builder::{
    BuiltMatrix, DistanceMatrixBuilder, DistanceRecord, ZERO_DISTANCE_EPSILON, build_for_day,
};
pub use config::{CapScope, Config, ConfigOption};
pub use error::{ConfigError, PipelineError, Result};
pub use event::resolve_day;
pub use key::{Key, KeyIndexer};
pub use output::OutputWriter;
pub use pipeline::{Outcome, Pipeline};
