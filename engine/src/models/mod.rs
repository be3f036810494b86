//! In-memory record model for one pipeline run.
//!
//! - [`Value`] - a single cell: text, instant, scalar or null
//! - [`RecordBatch`] - ordered columns plus ordered rows
//!
//! Stages take a [`RecordBatch`] by value and hand a new one to the next
//! stage. Row-dropping and column-rewriting methods therefore consume `self`.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Cell Value
// =============================================================================

/// A single cell of a [`RecordBatch`].
///
/// The source reader only produces [`Value::Text`] and [`Value::Null`];
/// the other variants come from temporal coercion, audit stamping and
/// configured defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Value {
    /// Absent value.
    Null,
    /// Raw or normalized text.
    Text(String),
    /// Timezone-aware instant, stored in UTC.
    Timestamp(DateTime<Utc>),
    /// Integer scalar.
    Integer(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Boolean scalar.
    Boolean(bool),
}

impl Value {
    /// Build a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text if this is a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form of a present value, `None` for null.
    ///
    /// This is the form written to the output file and fed to the row hash.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Case-folded string form of a present value.
    pub fn folded(&self) -> Option<String> {
        self.to_text().map(|s| s.to_lowercase())
    }
}

/// Null renders as the empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(t) => f.write_str(&format_instant(t)),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Text(n.to_string())),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Timestamp(t) => serializer.serialize_str(&format_instant(t)),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

/// RFC 3339 with an explicit `+00:00` offset; fractional seconds only when
/// non-zero.
pub fn format_instant(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

// =============================================================================
// Record Batch
// =============================================================================

/// Tabular dataset for one run.
///
/// Every row holds exactly one value per column, in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordBatch {
    /// Create an empty batch with the given header.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a batch from a header and rows.
    ///
    /// Short rows are padded with nulls and long rows truncated so every row
    /// matches the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Append one row, padded or truncated to the header width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Value at `(row, column)`, `None` if either is out of range.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All values of one column, in row order.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self
    }

    /// Rewrite every value of `column` through `f`. Missing columns leave the
    /// batch untouched.
    pub fn map_column<F>(mut self, column: &str, mut f: F) -> Self
    where
        F: FnMut(Value) -> Value,
    {
        if let Some(idx) = self.column_index(column) {
            for row in &mut self.rows {
                let old = std::mem::replace(&mut row[idx], Value::Null);
                row[idx] = f(old);
            }
        }
        self
    }

    /// Append `column` as the last column with one value per row.
    ///
    /// A pre-existing column of the same name is removed first, so the new
    /// column always ends up last. `values` is padded with nulls or truncated
    /// to the row count.
    pub fn append_column(mut self, column: &str, mut values: Vec<Value>) -> Self {
        values.resize(self.rows.len(), Value::Null);
        if let Some(idx) = self.column_index(column) {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        self.columns.push(column.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        self
    }

    /// Append `column` with the same value in every row.
    pub fn append_constant(self, column: &str, value: Value) -> Self {
        let values = vec![value; self.rows.len()];
        self.append_column(column, values)
    }

    /// Split into header and rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn batch() -> RecordBatch {
        RecordBatch::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Value::text("1"), Value::text("x")],
                vec![Value::text("2")],
            ],
        )
    }

    #[test]
    fn test_short_rows_padded() {
        let b = batch();
        assert_eq!(b.get(1, "b"), Some(&Value::Null));
        assert_eq!(b.rows()[1].len(), 2);
    }

    #[test]
    fn test_retain_rows() {
        let b = batch().retain_rows(|row| !row[1].is_null());
        assert_eq!(b.len(), 1);
        assert_eq!(b.get(0, "a"), Some(&Value::text("1")));
    }

    #[test]
    fn test_append_column_moves_existing_to_end() {
        let b = batch().append_constant("a", Value::text("z"));
        assert_eq!(b.columns(), ["b", "a"]);
        assert_eq!(b.get(0, "a"), Some(&Value::text("z")));
        assert_eq!(b.get(0, "b"), Some(&Value::text("x")));
    }

    #[test]
    fn test_append_column_keeps_rows_rectangular() {
        let short = batch().append_column("c", vec![Value::text("only")]);
        assert_eq!(short.rows()[1].len(), 3);
        assert_eq!(short.get(1, "c"), Some(&Value::Null));

        let long = batch().append_column("c", vec![Value::text("1"), Value::text("2"), Value::text("3")]);
        assert!(long.rows().iter().all(|row| row.len() == 3));
        assert_eq!(long.get(1, "c"), Some(&Value::text("2")));
    }

    #[test]
    fn test_map_missing_column_is_noop() {
        let b = batch();
        let mapped = b.clone().map_column("nope", |_| Value::Null);
        assert_eq!(b, mapped);
    }

    #[test]
    fn test_display_forms() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(Value::Timestamp(t).to_string(), "2025-01-01T10:00:00+00:00");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Null.to_text(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from(serde_json::json!("medium")), Value::text("medium"));
        assert_eq!(Value::from(serde_json::json!(3)), Value::Integer(3));
        assert_eq!(Value::from(serde_json::json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from(serde_json::json!(null)), Value::Null);
    }
}
