//! Audit stamper: provenance columns on every surviving row.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::models::{RecordBatch, Value};

/// Base name of the source file.
pub const SOURCE_IDENTITY_COLUMN: &str = "source_identity";

/// Single capture instant of the run.
pub const INGESTED_AT_COLUMN: &str = "ingested_at";

/// Base name of `path`, used as the run's source identity.
pub fn source_identity(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

/// Append `source_identity` and `ingested_at`. Same-named source columns
/// are replaced and moved after the source columns.
pub fn stamp(batch: RecordBatch, source_identity: &str, captured_at: DateTime<Utc>) -> RecordBatch {
    batch
        .append_constant(SOURCE_IDENTITY_COLUMN, Value::text(source_identity))
        .append_constant(INGESTED_AT_COLUMN, Value::Timestamp(captured_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamp_appends_in_order() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let batch = RecordBatch::from_rows(
            vec!["ingested_at".into(), "id".into()],
            vec![vec![Value::text("spoofed"), Value::text("1")], vec![Value::Null, Value::text("2")]],
        );
        let out = stamp(batch, "requests.csv", t);

        assert_eq!(out.columns(), ["id", "source_identity", "ingested_at"]);
        for row in 0..2 {
            assert_eq!(out.get(row, "source_identity"), Some(&Value::text("requests.csv")));
            assert_eq!(out.get(row, "ingested_at"), Some(&Value::Timestamp(t)));
        }
    }

    #[test]
    fn test_source_identity_is_base_name() {
        assert_eq!(
            source_identity(Path::new("/data/raw/requests_2025.csv")).as_deref(),
            Some("requests_2025.csv")
        );
        assert_eq!(source_identity(Path::new("/")), None);
    }
}
