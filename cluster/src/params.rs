use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ClusterError;

/// The only distance interpretation supported: matrix values are distances.
pub const PRECOMPUTED: &str = "precomputed";

/// Hyper-parameters passed to a clustering strategy, by name.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperParams(BTreeMap<String, Value>);

impl HyperParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object such as `{"eps": 0.5, "min_samples": 3}`.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Sets a parameter, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Fails on the first parameter not in `allowed`.
    pub fn reject_unknown(&self, allowed: &[&str]) -> Result<(), ClusterError> {
        match self.0.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(k) => Err(ClusterError::param(k, "unexpected parameter")),
            None => Ok(()),
        }
    }

    /// Reads a float parameter. `null` and the strings `"inf"`/`"infinity"`
    /// mean unbounded.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, ClusterError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(Value::Null) => Ok(f64::INFINITY),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| ClusterError::param(name, "not representable as float")),
            Some(Value::String(s)) if matches!(s.to_ascii_lowercase().as_str(), "inf" | "infinity") => {
                Ok(f64::INFINITY)
            }
            Some(other) => Err(ClusterError::param(name, format!("expected number, got {other}"))),
        }
    }

    /// Reads a non-negative integer parameter.
    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, ClusterError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| ClusterError::param(name, format!("expected non-negative integer, got {n}"))),
            Some(other) => Err(ClusterError::param(name, format!("expected integer, got {other}"))),
        }
    }

    /// Reads a string parameter.
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str, ClusterError> {
        match self.0.get(name) {
            None => Ok(default),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(ClusterError::param(name, format!("expected string, got {other}"))),
        }
    }

    /// Checks that `metric`, if present, is `"precomputed"`.
    pub(crate) fn require_precomputed(&self) -> Result<(), ClusterError> {
        let metric = self.str_or("metric", PRECOMPUTED)?;
        if metric != PRECOMPUTED {
            return Err(ClusterError::param(
                "metric",
                format!("only {PRECOMPUTED:?} is supported, got {metric:?}"),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for HyperParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
