use thiserror::Error;

/// Errors returned by clustering operations.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster: unregistered algorithm: {0:?} (registered: {1})")]
    UnregisteredAlgorithm(String, String),

    #[error("cluster: invalid hyper-parameter {name:?}: {reason}")]
    InvalidHyperParam { name: String, reason: String },

    #[error("cluster: invalid matrix: {0}")]
    InvalidMatrix(String),
}

impl ClusterError {
    pub(crate) fn param(name: &str, reason: impl Into<String>) -> Self {
        ClusterError::InvalidHyperParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
