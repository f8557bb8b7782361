//! Typed pipeline configuration.
//!
//! Every option has a fixed type and a default, and can be overridden from
//! the environment through its upper-snake-case name (`max-records` is read
//! from `MAX_RECORDS`). The configuration is loaded once and passed into the
//! pipeline; nothing reads the environment mid-run.

use std::fmt;
use std::str::FromStr;

use dayclust_cluster::HyperParams;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the record cap is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapScope {
    /// Compare the cap with the record position inside the partition being
    /// read. The first partition to reach it ends ingestion.
    #[default]
    Partition,

    /// Compare the cap with the running total across partitions.
    Total,
}

impl FromStr for CapScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partition" => Ok(CapScope::Partition),
            "total" => Ok(CapScope::Total),
            other => Err(ConfigError::InvalidValue {
                option: ConfigOption::RecordCapScope.name().to_string(),
                reason: format!("expected \"partition\" or \"total\", got {other:?}"),
            }),
        }
    }
}

/// The enumerated configuration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOption {
    MaxRecords,
    Algorithm,
    HyperParams,
    ConvertKeyToInt,
    InputFolder,
    OutputFolder,
    Bucket,
    RecordCapScope,
}

impl ConfigOption {
    pub const ALL: [ConfigOption; 8] = [
        ConfigOption::MaxRecords,
        ConfigOption::Algorithm,
        ConfigOption::HyperParams,
        ConfigOption::ConvertKeyToInt,
        ConfigOption::InputFolder,
        ConfigOption::OutputFolder,
        ConfigOption::Bucket,
        ConfigOption::RecordCapScope,
    ];

    /// Option name, e.g. `max-records`.
    pub fn name(self) -> &'static str {
        match self {
            ConfigOption::MaxRecords => "max-records",
            ConfigOption::Algorithm => "algorithm",
            ConfigOption::HyperParams => "hyper-params",
            ConfigOption::ConvertKeyToInt => "convert-key-to-int",
            ConfigOption::InputFolder => "input-folder",
            ConfigOption::OutputFolder => "output-folder",
            ConfigOption::Bucket => "bucket",
            ConfigOption::RecordCapScope => "record-cap-scope",
        }
    }

    /// Environment variable name, e.g. `MAX_RECORDS`.
    pub fn env_var(self) -> String {
        self.name().to_ascii_uppercase().replace('-', "_")
    }
}

impl FromStr for ConfigOption {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.name() == s)
            .ok_or_else(|| ConfigError::UnknownOption(s.to_string()))
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Record cap before ingestion stops early. Default: 1,000,000.
    pub max_records: usize,

    /// Registered clustering strategy name. Default: `DBSCAN`.
    pub algorithm: String,

    /// Strategy hyper-parameters. `metric` is always forced to
    /// `precomputed`.
    pub hyper_params: HyperParams,

    /// Parse keys as integers instead of keeping raw strings. Default: true.
    pub convert_key_to_int: bool,

    /// Prefix under which `day=<day>/` input partitions live.
    pub input_folder: String,

    /// Prefix under which `day=<day>/clusters.csv.gz` is written.
    pub output_folder: String,

    /// Storage bucket. Empty means the store root.
    pub bucket: String,

    /// How `max_records` is counted. Default: per partition.
    pub record_cap_scope: CapScope,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_records: 1_000_000,
            algorithm: "DBSCAN".to_string(),
            hyper_params: HyperParams::new(),
            convert_key_to_int: true,
            input_folder: "temp/clustering-lambda/distances".to_string(),
            output_folder: "temp/clustering-lambda/clusters".to_string(),
            bucket: String::new(),
            record_cap_scope: CapScope::Partition,
        }
    }
}

impl Config {
    /// Loads defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads defaults overridden by `lookup(ENV_VAR_NAME)`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        for opt in ConfigOption::ALL {
            if let Some(raw) = lookup(&opt.env_var()) {
                cfg.apply(opt, &raw)?;
            }
        }
        Ok(cfg)
    }

    /// Applies a textual override by option name.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), ConfigError> {
        let opt: ConfigOption = name.parse()?;
        self.apply(opt, raw)
    }

    /// Applies a textual override.
    ///
    /// `convert-key-to-int` is true only for the exact string `"true"`.
    /// `hyper-params` is a JSON object.
    pub fn apply(&mut self, opt: ConfigOption, raw: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            option: opt.name().to_string(),
            reason,
        };
        match opt {
            ConfigOption::MaxRecords => {
                self.max_records = raw.trim().parse().map_err(|e| invalid(format!("{e}")))?;
            }
            ConfigOption::Algorithm => self.algorithm = raw.to_string(),
            ConfigOption::HyperParams => {
                self.hyper_params = HyperParams::from_json(raw).map_err(|e| invalid(format!("{e}")))?;
            }
            ConfigOption::ConvertKeyToInt => self.convert_key_to_int = raw == "true",
            ConfigOption::InputFolder => self.input_folder = raw.to_string(),
            ConfigOption::OutputFolder => self.output_folder = raw.to_string(),
            ConfigOption::Bucket => self.bucket = raw.to_string(),
            ConfigOption::RecordCapScope => self.record_cap_scope = raw.parse()?,
        }
        Ok(())
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_records == 0 {
            return Err(ConfigError::InvalidValue {
                option: ConfigOption::MaxRecords.name().to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.algorithm.is_empty() {
            return Err(ConfigError::InvalidValue {
                option: ConfigOption::Algorithm.name().to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Storage prefix listing the day's input partitions.
    pub fn input_prefix(&self, day: &str) -> String {
        format!("{}/day={day}/", self.input_folder)
    }

    /// Storage key of the day's output object.
    pub fn output_key(&self, day: &str) -> String {
        format!("{}/day={day}/clusters.csv.gz", self.output_folder)
    }
}
