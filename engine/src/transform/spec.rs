//! Transformation spec: per-column trim, case-fold, default and row-hash
//! configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::Value;

/// What the fingerprint stage does when a configured hash column is absent
/// from the batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Hash the absent column as an empty string
    #[default]
    Placeholder,
    /// Drop every row
    Reject,
}

/// Row hash configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RowHashSpec {
    /// Hashing is opt-in
    #[serde(default)]
    pub enabled: bool,

    /// Columns hashed, in this order
    #[serde(default)]
    pub columns: Vec<String>,

    /// Behavior for configured columns missing from the batch
    #[serde(default)]
    pub on_missing: MissingColumnPolicy,
}

/// Declarative normalization rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TransformationSpec {
    /// Columns stripped of surrounding whitespace
    #[serde(default)]
    pub trims: BTreeSet<String>,

    /// Columns case-folded
    #[serde(default)]
    pub lowercase: BTreeSet<String>,

    /// Column -> value inserted in place of nulls, verbatim
    #[serde(default, alias = "coalesce_nulls")]
    pub coalesce_defaults: BTreeMap<String, Value>,

    /// Row fingerprint
    #[serde(default)]
    pub row_hash: RowHashSpec,
}

impl TransformationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trim<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trims.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn lowercase<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lowercase.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn coalesce(mut self, column: impl Into<String>, default: impl Into<Value>) -> Self {
        self.coalesce_defaults.insert(column.into(), default.into());
        self
    }

    /// Enable hashing over `columns`, in order.
    pub fn hash_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.row_hash.enabled = true;
        self.row_hash.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn on_missing_hash_column(mut self, policy: MissingColumnPolicy) -> Self {
        self.row_hash.on_missing = policy;
        self
    }

    /// Columns fed to the row hash. Empty when hashing is disabled.
    pub fn row_hash_columns(&self) -> &[String] {
        if self.row_hash.enabled {
            &self.row_hash.columns
        } else {
            &[]
        }
    }
}

/// Upstream job transformations: fold `status`, default `priority` to
/// `medium`, hash `status`.
pub fn customer_requests_spec() -> TransformationSpec {
    TransformationSpec::new()
        .lowercase(["status"])
        .coalesce("priority", "medium")
        .hash_columns(["status"])
}
