//! Pipeline configuration.
//!
//! One [`PipelineConfig`] value carries everything a run needs: where the
//! source lives and how to read it, the schema contract, the transformation
//! spec and the output location. It is loaded once and passed by reference;
//! nothing mutates it during a run.
//!
//! JSON and TOML documents are accepted (chosen by file extension).
//! Unrecognized keys are ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::contract::{customer_requests_contract, SchemaContract};
use crate::error::{ConfigError, ConfigResult};
use crate::output::OutputConfig;
use crate::parser::ReadOptions;
use crate::transform::spec::{customer_requests_spec, TransformationSpec};

/// Environment variable naming the default config file.
pub const CONFIG_ENV: &str = "REQCLEAN_CONFIG";

/// Environment variable overriding `output.processed_dir`.
pub const PROCESSED_DIR_ENV: &str = "REQCLEAN_PROCESSED_DIR";

/// Where source files arrive and how to read them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Folder scanned by the locator
    #[serde(default = "default_source_path")]
    pub path: PathBuf,

    /// File-name glob
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    #[serde(flatten)]
    pub read: ReadOptions,
}

fn default_source_path() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_file_pattern() -> String {
    "*.csv".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            file_pattern: default_file_pattern(),
            read: ReadOptions::default(),
        }
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub validation: SchemaContract,

    #[serde(default)]
    pub transformations: TransformationSpec,

    #[serde(default)]
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load from a `.toml` or JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(toml: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(PROCESSED_DIR_ENV).filter(|d| !d.is_empty()) {
            self.output.processed_dir = PathBuf::from(dir);
        }
        self
    }

    /// Reject values serde accepts but the pipeline cannot use.
    pub fn validate(&self) -> ConfigResult<()> {
        check_delimiter("source.delimiter", self.source.read.delimiter)?;
        check_delimiter("output.delimiter", Some(self.output.delimiter))?;

        if let Some(ref name) = self.output.file_name {
            if name.is_empty() || Path::new(name).file_name().map(|n| n != name.as_str()).unwrap_or(true) {
                return Err(ConfigError::InvalidValue {
                    key: "output.file_name".into(),
                    message: format!("'{}' is not a plain file name", name),
                });
            }
        }

        if self.transformations.row_hash.enabled && self.transformations.row_hash.columns.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "transformations.row_hash.columns".into(),
                message: "row hash enabled without columns".into(),
            });
        }

        Ok(())
    }
}

fn check_delimiter(key: &str, delimiter: Option<char>) -> ConfigResult<()> {
    match delimiter {
        Some(d) if !d.is_ascii() || d == '"' || d == '\n' || d == '\r' => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{:?} cannot be used as a delimiter", d),
        }),
        _ => Ok(()),
    }
}

/// Configuration of the upstream customer-requests job.
pub fn customer_requests_config() -> PipelineConfig {
    PipelineConfig {
        source: SourceConfig::default(),
        validation: customer_requests_contract(),
        transformations: customer_requests_spec(),
        output: OutputConfig::default(),
    }
}
