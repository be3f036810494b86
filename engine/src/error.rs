//! Error types for the reqclean pipeline.
//!
//! - [`CsvError`] - reading and decoding the source file
//! - [`OutputError`] - serializing the processed batch
//! - [`ConfigError`] - loading the pipeline configuration
//! - [`LocateError`] - discovering the source file
//! - [`PipelineError`] - top-level run errors
//!
//! Lower-level errors convert into [`PipelineError`] via `From`, so `?`
//! works across module boundaries.
//!
//! Per-value coercion failures are not errors: they are counted in
//! [`crate::transform::FilterStats`] and resolved by nulling the value.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Source Reading Errors
// =============================================================================

/// Errors while reading a delimited source file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited text.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// File has no header row.
    #[error("CSV file is empty")]
    EmptyFile,

    /// The same column name appears twice in the header.
    #[error("Duplicate column in header: {0}")]
    DuplicateColumn(String),

    /// Encoding name not supported by the decoder.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Delimiter is not a single-byte character.
    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing the processed batch.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Destination directory could not be created or written.
    #[error("Cannot write to '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failure.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Delimiter is not a single-byte character.
    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),

    /// Temporary file could not be moved into place.
    #[error("Cannot persist output to '{}': {message}", path.display())]
    Persist { path: PathBuf, message: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading the pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file unreadable.
    #[error("Failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON syntax or shape error.
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML syntax or shape error.
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Semantically invalid option value.
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

// =============================================================================
// File Discovery Errors
// =============================================================================

/// Errors from the source file locator.
#[derive(Debug, Error)]
pub enum LocateError {
    /// Folder unreadable.
    #[error("Cannot read folder '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No file in the folder matches the pattern.
    #[error("No file matching '{pattern}' in '{}'", folder.display())]
    NoMatch { folder: PathBuf, pattern: String },

    /// Pattern could not be compiled.
    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level run errors returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required columns are absent from the source header. Fatal: no output
    /// is written.
    #[error("Schema violation: missing required columns {missing:?}")]
    SchemaViolation { missing: Vec<String> },

    /// Source reading error.
    #[error("Source error: {0}")]
    Csv(#[from] CsvError),

    /// Output writing error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// File discovery error.
    #[error("Locate error: {0}")]
    Locate(#[from] LocateError),

    /// Source path has no usable file name.
    #[error("Source path has no file name: {}", .0.display())]
    InvalidSourcePath(PathBuf),
}

impl PipelineError {
    /// Whether this error is the all-or-nothing schema check.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, PipelineError::SchemaViolation { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source reading.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for output writing.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for file discovery.
pub type LocateResult<T> = Result<T, LocateError>;

/// Result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;
