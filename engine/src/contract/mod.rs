//! Schema contract: which columns must exist, which must be non-null,
//! which take a restricted set of values, and which are coerced to instants.
//!
//! The contract is supplied by configuration and never derived from data.
//! Allowed values are case-folded when the contract is built so membership
//! checks compare folded against folded.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

/// Declarative validation rules for one dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SchemaContract {
    /// Columns that must appear in the source header, in report order
    #[serde(default)]
    pub required_columns: Vec<String>,

    /// Columns whose null values drop the row
    #[serde(default, alias = "non_nullable")]
    pub non_nullable_columns: BTreeSet<String>,

    /// Column -> folded values a row may carry
    #[serde(default, deserialize_with = "deserialize_folded_sets")]
    pub allowed_values: BTreeMap<String, BTreeSet<String>>,

    /// Columns coerced to timezone-aware instants
    #[serde(default)]
    pub typed_columns: BTreeSet<String>,

    /// Temporal column whose parse failure drops the row
    #[serde(default)]
    pub primary_temporal_column: Option<String>,
}

impl SchemaContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn non_nullable<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_nullable_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Restrict `column` to `values`. Values are case-folded.
    pub fn allow<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_values
            .entry(column.into())
            .or_default()
            .extend(values.into_iter().map(|v| v.as_ref().to_lowercase()));
        self
    }

    /// Declare a secondary temporal column: unparsable values become null.
    pub fn temporal(mut self, column: impl Into<String>) -> Self {
        self.typed_columns.insert(column.into());
        self
    }

    /// Declare the primary temporal column: unparsable values drop the row.
    pub fn primary_temporal(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.typed_columns.insert(column.clone());
        self.primary_temporal_column = Some(column);
        self
    }

    /// Required columns absent from `columns`, in contract order.
    pub fn missing_columns(&self, columns: &[String]) -> Vec<String> {
        self.required_columns
            .iter()
            .filter(|required| !columns.contains(required))
            .cloned()
            .collect()
    }

    /// All temporal columns, the primary one included.
    pub fn temporal_columns(&self) -> BTreeSet<&str> {
        self.typed_columns
            .iter()
            .map(String::as_str)
            .chain(self.primary_temporal_column.as_deref())
            .collect()
    }

    pub fn is_primary_temporal(&self, column: &str) -> bool {
        self.primary_temporal_column.as_deref() == Some(column)
    }
}

/// Upstream job contract: four required columns, two non-null keys, only
/// completed requests, `created_at` primary and `last_updated` secondary.
pub fn customer_requests_contract() -> SchemaContract {
    SchemaContract::new()
        .require(["request_id", "created_at", "customer_email", "status"])
        .non_nullable(["request_id", "customer_email"])
        .allow("status", ["done"])
        .primary_temporal("created_at")
        .temporal("last_updated")
}

fn deserialize_folded_sets<'de, D>(deserializer: D) -> Result<BTreeMap<String, BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(column, values)| {
            let folded = values.into_iter().map(|v| v.to_lowercase()).collect();
            (column, folded)
        })
        .collect())
}
