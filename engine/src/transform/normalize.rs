//! Normalization stage: trim, then case-fold, then coalesce.
//!
//! Trimmed and folded columns come out textual: present values are
//! stringified first. Nulls stay null so coalescing still sees them.
//! Defaults are inserted verbatim, after folding, so a default for a
//! lowercased column must already be lowercase.

use tracing::debug;

use crate::models::{RecordBatch, Value};

use super::spec::TransformationSpec;

pub fn trim_value(value: Value) -> Value {
    match value.to_text() {
        Some(s) => Value::Text(s.trim().to_string()),
        None => Value::Null,
    }
}

pub fn lowercase_value(value: Value) -> Value {
    value.folded().map(Value::Text).unwrap_or(Value::Null)
}

/// Apply the per-column rules in `spec`. Columns absent from the batch are
/// ignored.
pub fn normalize(batch: RecordBatch, spec: &TransformationSpec) -> RecordBatch {
    let mut batch = batch;

    for column in &spec.trims {
        if !batch.has_column(column) {
            continue;
        }
        debug!(%column, "trimming");
        batch = batch.map_column(column, trim_value);
    }

    for column in &spec.lowercase {
        if !batch.has_column(column) {
            continue;
        }
        debug!(%column, "lowercasing");
        batch = batch.map_column(column, lowercase_value);
    }

    for (column, default) in &spec.coalesce_defaults {
        let mut filled = 0usize;
        batch = batch.map_column(column, |value| {
            if value.is_null() {
                filled += 1;
                default.clone()
            } else {
                value
            }
        });
        if filled > 0 {
            debug!(%column, filled, "nulls coalesced");
        }
    }

    batch
}
