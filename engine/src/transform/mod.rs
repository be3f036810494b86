//! Transformation module.
//!
//! Stages run strictly forward, each taking the batch by value:
//!
//! ```text
//! filter ──▶ normalize ──▶ audit::stamp ──▶ fingerprint
//! ```
//!
//! - `spec`: transformation spec (trim, lowercase, defaults, row hash)
//! - `filter`: contract enforcement and temporal coercion
//! - `normalize`: per-column normalization
//! - `audit`: provenance columns
//! - `fingerprint`: per-row content hash
//! - `pipeline`: load, run the stages, write

pub mod audit;
pub mod filter;
pub mod fingerprint;
pub mod normalize;
pub mod pipeline;
pub mod spec;

pub use audit::{stamp, INGESTED_AT_COLUMN, SOURCE_IDENTITY_COLUMN};
pub use filter::{filter, parse_instant, FilterStats};
pub use fingerprint::{fingerprint, hash_parts, ROW_HASH_COLUMN};
pub use normalize::normalize;
pub use pipeline::{dry_run_at, process, run, run_at, Processed, RunReport};
pub use spec::{MissingColumnPolicy, RowHashSpec, TransformationSpec};
