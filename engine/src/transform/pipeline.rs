//! Pipeline driver: load → filter → normalize → stamp → fingerprint → write.
//!
//! One call processes one source file start to finish. The only raised
//! condition besides I/O is the schema check, which aborts before any output
//! file is created.
//!
//! # Example
//!
//! ```rust,no_run
//! use reqclean::config::customer_requests_config;
//! use reqclean::transform::run;
//! use std::path::Path;
//!
//! let report = run(Path::new("data/raw/requests.csv"), &customer_requests_config())?;
//! println!("{} rows written to {:?}", report.rows_written, report.output_path);
//! # Ok::<(), reqclean::PipelineError>(())
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::contract::SchemaContract;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{format_instant, RecordBatch};
use crate::output::write_batch;
use crate::parser::read_batch_file;

use super::audit::{self, stamp};
use super::filter::{filter, FilterStats};
use super::fingerprint::fingerprint;
use super::normalize::normalize;
use super::spec::TransformationSpec;

/// Outcome of the in-memory stages.
#[derive(Debug, Clone)]
pub struct Processed {
    pub batch: RecordBatch,
    pub filter: FilterStats,
    /// Rows dropped by the fingerprint stage's reject policy
    pub dropped_hash: usize,
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source_path: PathBuf,
    pub source_identity: String,
    /// Absent for dry runs
    pub output_path: Option<PathBuf>,
    #[serde(serialize_with = "serialize_instant")]
    pub ingested_at: DateTime<Utc>,
    pub encoding: String,
    pub delimiter: char,
    pub rows_read: usize,
    pub filter: FilterStats,
    pub dropped_hash: usize,
    pub rows_written: usize,
    pub columns: Vec<String>,
}

fn serialize_instant<S: serde::Serializer>(t: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_instant(t))
}

/// Run the in-memory stages over an already-loaded batch.
pub fn process(
    batch: RecordBatch,
    source_identity: &str,
    captured_at: DateTime<Utc>,
    contract: &SchemaContract,
    spec: &TransformationSpec,
) -> PipelineResult<Processed> {
    let (batch, filter_stats) = filter(batch, contract)?;
    let batch = normalize(batch, spec);
    let batch = stamp(batch, source_identity, captured_at);
    let (batch, dropped_hash) = fingerprint(batch, spec.row_hash_columns(), spec.row_hash.on_missing);

    Ok(Processed {
        batch,
        filter: filter_stats,
        dropped_hash,
    })
}

/// Process `source_path` and write the cleaned file, stamping the current
/// instant.
pub fn run(source_path: &Path, config: &PipelineConfig) -> PipelineResult<RunReport> {
    run_at(source_path, config, Utc::now())
}

/// Same as [`run`] with a pinned capture instant.
pub fn run_at(source_path: &Path, config: &PipelineConfig, captured_at: DateTime<Utc>) -> PipelineResult<RunReport> {
    execute(source_path, config, captured_at, true)
}

/// Run every stage without writing the output file.
pub fn dry_run_at(source_path: &Path, config: &PipelineConfig, captured_at: DateTime<Utc>) -> PipelineResult<RunReport> {
    execute(source_path, config, captured_at, false)
}

fn execute(
    source_path: &Path,
    config: &PipelineConfig,
    captured_at: DateTime<Utc>,
    write: bool,
) -> PipelineResult<RunReport> {
    let run_id = Uuid::new_v4();
    let span = info_span!("pipeline_run", %run_id, source = %source_path.display());
    let _enter = span.enter();

    config.validate()?;

    let source_identity = audit::source_identity(source_path)
        .ok_or_else(|| PipelineError::InvalidSourcePath(source_path.to_path_buf()))?;

    let parsed = read_batch_file(source_path, &config.source.read)?;
    let rows_read = parsed.batch.len();
    info!(
        rows = rows_read,
        columns = parsed.batch.columns().len(),
        encoding = %parsed.encoding,
        delimiter = ?parsed.delimiter,
        "source loaded"
    );

    let processed = process(
        parsed.batch,
        &source_identity,
        captured_at,
        &config.validation,
        &config.transformations,
    )?;

    let output_path = if write {
        let path = config.output.output_path(&source_identity);
        write_batch(&processed.batch, &path, config.output.delimiter)?;
        info!(path = %path.display(), rows = processed.batch.len(), "cleaned file written");
        Some(path)
    } else {
        info!(rows = processed.batch.len(), "dry run, nothing written");
        None
    };

    let rows_written = processed.batch.len();
    let (columns, _) = processed.batch.into_parts();

    Ok(RunReport {
        run_id,
        source_path: source_path.to_path_buf(),
        source_identity,
        output_path,
        ingested_at: captured_at,
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        rows_read,
        filter: processed.filter,
        dropped_hash: processed.dropped_hash,
        rows_written,
        columns,
    })
}
