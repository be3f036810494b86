//! Row filter stage.
//!
//! Order is significant, each step only sees the rows the previous one kept:
//!
//! 1. required-column presence (fail fast, whole run)
//! 2. non-null rejection
//! 3. temporal coercion, rejecting rows whose primary instant is null
//! 4. allowed-value membership on the folded value

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::contract::SchemaContract;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{RecordBatch, Value};

/// Formats carrying an explicit offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Naive formats, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Counts from one filter pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FilterStats {
    pub rows_in: usize,
    /// Rows dropped per non-nullable column
    pub dropped_null: BTreeMap<String, usize>,
    /// Values nulled per temporal column
    pub coercion_failures: BTreeMap<String, usize>,
    /// Rows dropped because the primary temporal value was null after coercion
    pub dropped_temporal: usize,
    /// Rows dropped per allowed-value column
    pub dropped_not_allowed: BTreeMap<String, usize>,
    pub rows_out: usize,
}

/// Parse a timezone-aware instant. Naive inputs are taken as UTC.
///
/// ```
/// use reqclean::transform::filter::parse_instant;
///
/// let t = parse_instant("2025-01-01T10:00:00Z").unwrap();
/// assert_eq!(t, parse_instant("2025-01-01 11:00:00+01:00").unwrap());
/// assert!(parse_instant("bad-date").is_none());
/// ```
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }

    // Zulu suffix with a space separator is not RFC 3339
    let zoned = match s.strip_suffix(&['Z', 'z'][..]) {
        Some(rest) => format!("{}+00:00", rest),
        None => s.to_string(),
    };
    for fmt in OFFSET_FORMATS {
        if let Ok(t) = DateTime::parse_from_str(&zoned, fmt) {
            return Some(t.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        }
    }

    None
}

/// Coerce one value to an instant. `Err` carries the rejected text.
fn coerce_instant(value: Value) -> Result<Value, String> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Timestamp(t) => Ok(Value::Timestamp(t)),
        other => {
            let text = other.to_string();
            parse_instant(&text).map(Value::Timestamp).ok_or(text)
        }
    }
}

/// Apply the contract's row-level rules.
///
/// Returns [`PipelineError::SchemaViolation`] when a required column is
/// absent; every other anomaly drops the row or nulls the value.
pub fn filter(batch: RecordBatch, contract: &SchemaContract) -> PipelineResult<(RecordBatch, FilterStats)> {
    let missing = contract.missing_columns(batch.columns());
    if !missing.is_empty() {
        error!(?missing, "required columns absent");
        return Err(PipelineError::SchemaViolation { missing });
    }

    let mut stats = FilterStats {
        rows_in: batch.len(),
        ..FilterStats::default()
    };
    let mut batch = batch;

    for column in &contract.non_nullable_columns {
        let Some(idx) = batch.column_index(column) else {
            debug!(%column, "non-nullable column absent, skipped");
            continue;
        };
        let before = batch.len();
        batch = batch.retain_rows(|row| !row[idx].is_null());
        count(&mut stats.dropped_null, column, before - batch.len());
    }

    for column in contract.temporal_columns() {
        let Some(idx) = batch.column_index(column) else {
            debug!(%column, "temporal column absent, skipped");
            continue;
        };

        let mut failures = 0;
        batch = batch.map_column(column, |value| {
            coerce_instant(value).unwrap_or_else(|raw| {
                debug!(%column, value = %raw, "unparsable timestamp nulled");
                failures += 1;
                Value::Null
            })
        });
        count(&mut stats.coercion_failures, column, failures);

        if contract.is_primary_temporal(column) {
            let before = batch.len();
            batch = batch.retain_rows(|row| !row[idx].is_null());
            stats.dropped_temporal += before - batch.len();
        }
    }

    for (column, allowed) in &contract.allowed_values {
        let Some(idx) = batch.column_index(column) else {
            debug!(%column, "allowed-value column absent, skipped");
            continue;
        };
        let before = batch.len();
        batch = batch.retain_rows(|row| row[idx].folded().is_some_and(|v| allowed.contains(&v)));
        count(&mut stats.dropped_not_allowed, column, before - batch.len());
    }

    stats.rows_out = batch.len();
    info!(
        rows_in = stats.rows_in,
        rows_out = stats.rows_out,
        dropped_temporal = stats.dropped_temporal,
        "row filter applied"
    );

    Ok((batch, stats))
}

fn count(counts: &mut BTreeMap<String, usize>, column: &str, n: usize) {
    if n > 0 {
        *counts.entry(column.to_string()).or_insert(0) += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::customer_requests_contract;
    use crate::parser::parse_str;
    use chrono::TimeZone;

    fn load(csv: &str) -> RecordBatch {
        parse_str(csv, ',', &[String::new()]).unwrap()
    }

    #[test]
    fn test_missing_required_columns_fail() {
        let batch = load("request_id,status\n1,done");
        let err = filter(batch, &customer_requests_contract()).unwrap_err();

        match err {
            PipelineError::SchemaViolation { missing } => {
                assert_eq!(missing, vec!["created_at", "customer_email"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_upstream_example() {
        let batch = load(
            "request_id,created_at,customer_email,status\n\
             1,2025-01-01T10:00:00Z,a@x.com,Done\n\
             ,bad-date,b@x.com,open",
        );
        let (batch, stats) = filter(batch, &customer_requests_contract()).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.get(0, "request_id"), Some(&Value::text("1")));
        assert_eq!(
            batch.get(0, "created_at"),
            Some(&Value::Timestamp(Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap()))
        );
        // the allowed-value check does not rewrite the stored value
        assert_eq!(batch.get(0, "status"), Some(&Value::text("Done")));
        assert_eq!(stats.dropped_null.get("request_id"), Some(&1));
        assert_eq!(stats.rows_out, 1);
    }

    #[test]
    fn test_absent_non_nullable_column_skipped() {
        let contract = SchemaContract::new().require(["a"]).non_nullable(["a", "ghost"]);
        let (batch, stats) = filter(load("a\n1\n2"), &contract).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(stats.dropped_null.is_empty());
    }

    #[test]
    fn test_secondary_temporal_tolerates_bad_values() {
        let contract = SchemaContract::new()
            .primary_temporal("created_at")
            .temporal("last_updated");
        let batch = load(
            "created_at,last_updated\n\
             2025-01-01,garbage\n\
             nope,2025-02-01 08:30:00\n\
             2025-01-03 09:00:00+02:00,",
        );
        let (batch, stats) = filter(batch, &contract).unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.get(0, "last_updated").unwrap().is_null());
        assert_eq!(
            batch.get(1, "created_at"),
            Some(&Value::Timestamp(Utc.with_ymd_and_hms(2025, 1, 3, 7, 0, 0).unwrap()))
        );
        assert_eq!(stats.coercion_failures.get("created_at"), Some(&1));
        assert_eq!(stats.coercion_failures.get("last_updated"), Some(&1));
        assert_eq!(stats.dropped_temporal, 1);
    }

    #[test]
    fn test_null_primary_temporal_dropped() {
        let contract = SchemaContract::new().primary_temporal("created_at");
        let (batch, stats) = filter(load("id,created_at\n1,\n2,2025-01-01"), &contract).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(stats.dropped_temporal, 1);
        assert!(stats.coercion_failures.is_empty());
    }

    #[test]
    fn test_allowed_values_case_insensitive() {
        let contract = SchemaContract::new().allow("status", ["DONE", "closed"]);
        let (batch, stats) = filter(
            load("status\ndone\nDone\nCLOSED\nopen\n"),
            &contract,
        )
        .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(stats.dropped_not_allowed.get("status"), Some(&1));
    }

    #[test]
    fn test_null_never_allowed() {
        let contract = SchemaContract::new().allow("status", [""]);
        let (batch, _) = filter(load("id,status\n1,\n"), &contract).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_non_null_runs_before_coercion() {
        // "bad" is present, so the non-null step keeps it; coercion then drops it
        let contract = SchemaContract::new()
            .non_nullable(["created_at"])
            .primary_temporal("created_at");
        let (_, stats) = filter(load("created_at\nbad"), &contract).unwrap();
        assert!(stats.dropped_null.is_empty());
        assert_eq!(stats.dropped_temporal, 1);
    }

    #[test]
    fn test_parse_instant_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        for input in [
            "2025-03-04T05:06:07Z",
            "2025-03-04T05:06:07+00:00",
            "2025-03-04 05:06:07Z",
            "2025-03-04 05:06:07",
            "2025-03-04T05:06:07",
            " 2025-03-04 06:06:07+01:00 ",
            "2025/03/04 05:06:07",
        ] {
            assert_eq!(parse_instant(input), Some(expected), "input {input:?}");
        }
        assert_eq!(
            parse_instant("2025-03-04"),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap())
        );
        assert!(parse_instant("2025-13-40").is_none());
        assert!(parse_instant("").is_none());
    }
}
