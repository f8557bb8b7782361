use dayclust_cluster::Registry;
use dayclust_objstore::ObjectStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::aggregate::ClusterAssignment;
use crate::builder::build_for_day;
use crate::config::Config;
use crate::error::Result;
use crate::event::resolve_day;
use crate::output::OutputWriter;

/// Response of one invocation.
///
/// Serializes as `{"day", "success", "clusters", "clustered-keys"}`, or
/// `{"success": false}` when no day could be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters: Option<usize>,

    #[serde(
        rename = "clustered-keys",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub clustered_keys: Option<usize>,
}

impl Outcome {
    /// The response for a payload without a resolvable day.
    pub fn unresolved() -> Self {
        Self {
            day: None,
            success: false,
            clusters: None,
            clustered_keys: None,
        }
    }

    fn done(day: &str, assignment: &ClusterAssignment) -> Self {
        Self {
            day: Some(day.to_string()),
            success: true,
            clusters: Some(assignment.clusters()),
            clustered_keys: Some(assignment.clustered_keys()),
        }
    }
}

/// Sequences one day's run: clear old output, build the matrix, cluster,
/// aggregate, write.
///
/// Single-threaded and blocking. Every failure aborts the run; since old
/// output is cleared first, a failed run can leave no output for the day.
pub struct Pipeline {
    cfg: Config,
    registry: Registry,
    store: Box<dyn ObjectStore>,
}

impl Pipeline {
    /// Creates a pipeline. Fails if the configuration is invalid.
    pub fn new(cfg: Config, registry: Registry, store: Box<dyn ObjectStore>) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            registry,
            store,
        })
    }

    /// Creates a pipeline with the default strategy registry.
    pub fn with_default_registry(cfg: Config, store: Box<dyn ObjectStore>) -> Result<Self> {
        Self::new(cfg, Registry::with_defaults(), store)
    }

    /// Handles an invocation payload.
    ///
    /// Without a resolvable day this returns [`Outcome::unresolved`] and
    /// touches nothing.
    pub fn handle(&self, payload: &Value) -> Result<Outcome> {
        match resolve_day(payload) {
            Some(day) => self.run_day(&day),
            None => {
                info!("no day in payload");
                Ok(Outcome::unresolved())
            }
        }
    }

    /// Clusters one day's data.
    pub fn run_day(&self, day: &str) -> Result<Outcome> {
        info!(day, "going to cluster data");
        let writer = OutputWriter::new(self.store.as_ref(), &self.cfg);
        writer.clear(day)?;

        let built = build_for_day(self.store.as_ref(), &self.cfg, day)?;
        let labels = self.cluster(&built.matrix)?;
        let assignment = ClusterAssignment::from_labels(&built.keys, &labels)?;

        writer.write(day, &assignment)?;
        Ok(Outcome::done(day, &assignment))
    }

    /// Runs the configured strategy. An empty matrix yields no labels and
    /// the strategy is neither built nor invoked.
    fn cluster(&self, matrix: &dayclust_cluster::DistanceMatrix) -> Result<Vec<i32>> {
        info!("clustering");
        if matrix.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            algorithm = %self.cfg.algorithm,
            hyper_params = %self.cfg.hyper_params,
            "building strategy"
        );
        let strategy = self.registry.build(&self.cfg.algorithm, &self.cfg.hyper_params)?;
        Ok(strategy.fit_predict(matrix)?)
    }
}

#[cfg(test)]
mod tests {
    use dayclust_objstore::{MemoryStore, ObjectMeta, StoreError, StoreResult};
    use serde_json::json;

    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn outcome_json_shapes() {
        assert_eq!(
            serde_json::to_value(Outcome::unresolved()).unwrap(),
            json!({"success": false})
        );

        let keys = vec![crate::Key::Int(1)];
        let a = ClusterAssignment::from_labels(&keys, &[0]).unwrap();
        assert_eq!(
            serde_json::to_value(Outcome::done("2024-01-01", &a)).unwrap(),
            json!({"day": "2024-01-01", "success": true, "clusters": 1, "clustered-keys": 1})
        );
    }

    #[test]
    fn no_day_has_no_side_effects() {
        let store = MemoryStore::new();
        store.put("temp/clustering-lambda/distances/day=1/p.csv", b"1,2,0.1\n").unwrap();
        let p = Pipeline::with_default_registry(Config::default(), Box::new(store.clone())).unwrap();
        assert_eq!(p.handle(&json!({})).unwrap(), Outcome::unresolved());
        assert_eq!(store.len(), 1);
    }

    struct HeadFails(MemoryStore);

    impl ObjectStore for HeadFails {
        fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
            self.0.list(prefix)
        }

        fn head(&self, _key: &str) -> StoreResult<ObjectMeta> {
            Err(StoreError::Io("access denied".to_string()))
        }

        fn open(&self, key: &str) -> StoreResult<Box<dyn std::io::Read + Send>> {
            self.0.open(key)
        }

        fn put(&self, key: &str, data: &[u8]) -> StoreResult<()> {
            self.0.put(key, data)
        }

        fn delete(&self, key: &str) -> StoreResult<()> {
            self.0.delete(key)
        }
    }

    #[test]
    fn existence_check_failure_aborts_run() {
        let inner = MemoryStore::new();
        let cfg = Config::default();
        let input = format!("{}p.csv", cfg.input_prefix("2024-01-01"));
        inner.put(&input, b"1,2,0.1\n").unwrap();
        inner.put(&cfg.output_key("2024-01-01"), b"stale").unwrap();

        let p = Pipeline::with_default_registry(cfg.clone(), Box::new(HeadFails(inner.clone()))).unwrap();
        let err = p.handle(&json!({"day": "2024-01-01"})).unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)), "{err}");
        // Old output neither deleted nor replaced.
        assert_eq!(inner.get(&cfg.output_key("2024-01-01")).unwrap(), b"stale");
        assert_eq!(inner.len(), 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = Config {
            max_records: 0,
            ..Config::default()
        };
        assert!(Pipeline::with_default_registry(cfg, Box::new(MemoryStore::new())).is_err());
    }
}
