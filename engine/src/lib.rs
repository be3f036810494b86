//! # reqclean - customer request validation and normalization
//!
//! reqclean takes raw customer-request CSV extracts, enforces a schema
//! contract on them, normalizes the surviving rows, stamps provenance and a
//! content fingerprint, and writes a cleaned CSV for downstream loading.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Raw CSV    │────▶│   Parser    │────▶│  Transform  │────▶│ Cleaned CSV │
//! │ (any enc.)  │     │  (auto-enc) │     │ (contract)  │     │  (+audit)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reqclean::{customer_requests_config, locate_latest, run};
//!
//! let config = customer_requests_config();
//! let source = locate_latest(&config.source.path, &config.source.file_pattern)?;
//! let report = run(&source, &config)?;
//! println!("kept {} of {} rows", report.rows_written, report.rows_read);
//! # Ok::<(), reqclean::PipelineError>(())
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cell values and the in-memory batch
//! - [`parser`] - CSV loading with encoding and delimiter detection
//! - [`contract`] - Schema contract
//! - [`transform`] - Filter, normalize, audit, fingerprint and the pipeline
//! - [`output`] - Cleaned file writer
//! - [`locator`] - Newest-source discovery
//! - [`config`] - Run configuration
//! - [`logs`] - Subscriber setup

// Core modules
pub mod error;
pub mod models;

// Input
pub mod locator;
pub mod parser;

// Rules
pub mod contract;
pub mod transform;

// Output
pub mod output;

pub mod config;
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    CsvError,
    LocateError,
    OutputError,
    PipelineError,
    PipelineResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{RecordBatch, Value};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes,
    parse_str,
    read_batch_file,
    ParseResult,
    ReadOptions,
};

// =============================================================================
// Re-exports - Contract and transformations
// =============================================================================

pub use contract::{customer_requests_contract, SchemaContract};

pub use transform::{
    FilterStats,
    MissingColumnPolicy,
    RowHashSpec,
    TransformationSpec,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    dry_run_at,
    process,
    run,
    run_at,
    Processed,
    RunReport,
};

// =============================================================================
// Re-exports - Config, output, locator
// =============================================================================

pub use config::{customer_requests_config, PipelineConfig, SourceConfig};
pub use locator::locate_latest;
pub use output::{write_batch, OutputConfig};
