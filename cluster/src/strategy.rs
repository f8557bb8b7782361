use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::params::PRECOMPUTED;
use crate::{ClusterError, Dbscan, DistanceMatrix, HyperParams, Optics};

/// Label reserved for points not assigned to any cluster.
pub const NOISE: i32 = -1;

/// A clustering algorithm over a precomputed distance matrix.
pub trait ClusteringStrategy: Send + Sync {
    /// Registered name of the algorithm.
    fn name(&self) -> &str;

    /// Returns one label per matrix row: [`NOISE`] or a cluster id >= 0.
    ///
    /// Callers must not pass an empty matrix.
    fn fit_predict(&self, matrix: &DistanceMatrix) -> Result<Vec<i32>, ClusterError>;
}

impl fmt::Debug for dyn ClusteringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClusteringStrategy({})", self.name())
    }
}

/// Builds a strategy from hyper-parameters.
pub type Factory = fn(&HyperParams) -> Result<Box<dyn ClusteringStrategy>, ClusterError>;

/// Registry of named clustering strategies.
#[derive(Clone, Default)]
pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `DBSCAN` and `OPTICS`.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register("DBSCAN", |p| Ok(Box::new(Dbscan::from_params(p)?)));
        reg.register("OPTICS", |p| Ok(Box::new(Optics::from_params(p)?)));
        reg
    }

    /// Registers (or replaces) a factory under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: Factory) {
        self.factories.insert(name.into(), factory);
    }

    /// Returns all registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiates the strategy registered as `name`.
    ///
    /// `metric` is always forced to `"precomputed"`.
    pub fn build(
        &self,
        name: &str,
        params: &HyperParams,
    ) -> Result<Box<dyn ClusteringStrategy>, ClusterError> {
        let factory = self.factories.get(name).ok_or_else(|| {
            ClusterError::UnregisteredAlgorithm(name.to_string(), self.names().join(", "))
        })?;
        let mut params = params.clone();
        if let Some(prev) = params.insert("metric", PRECOMPUTED) {
            if prev != PRECOMPUTED {
                debug!(%prev, "overriding metric with {PRECOMPUTED}");
            }
        }
        factory(&params)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}
