use thiserror::Error;

/// Errors raised while resolving configuration options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: unknown option: {0:?}")]
    UnknownOption(String),

    #[error("config: invalid value for {option}: {reason}")]
    InvalidValue { option: String, reason: String },
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline: config error: {0}")]
    Config(String),

    #[error("pipeline: storage error: {0}")]
    Storage(String),

    #[error("pipeline: cluster error: {0}")]
    Cluster(String),

    #[error("pipeline: malformed record at {source_key}:{line}: {reason}")]
    MalformedRecord {
        source_key: String,
        line: usize,
        reason: String,
    },

    #[error("pipeline: invalid labels: {0}")]
    InvalidLabels(String),

    #[error("pipeline: io error: {0}")]
    Io(String),
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl From<dayclust_objstore::StoreError> for PipelineError {
    fn from(e: dayclust_objstore::StoreError) -> Self {
        PipelineError::Storage(e.to_string())
    }
}

impl From<dayclust_cluster::ClusterError> for PipelineError {
    fn from(e: dayclust_cluster::ClusterError) -> Self {
        PipelineError::Cluster(e.to_string())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
