//! Fingerprint stage: MD5 over the `|`-joined string forms of the configured
//! columns, as 32 lowercase hex characters.
//!
//! The digest, the delimiter and the string forms are a stable contract:
//! downstream dedup compares hashes across runs.

use md5::{Digest, Md5};
use tracing::{debug, warn};

use crate::models::{RecordBatch, Value};

use super::spec::MissingColumnPolicy;

pub const ROW_HASH_COLUMN: &str = "row_hash";

pub const HASH_DELIMITER: &str = "|";

/// Hex MD5 of `parts` joined with [`HASH_DELIMITER`].
///
/// ```
/// use reqclean::transform::fingerprint::hash_parts;
///
/// assert_eq!(hash_parts(["done"]), "6b2ded51d81a4403d8a4bd25fa1e57ee");
/// ```
pub fn hash_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Md5::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            hasher.update(HASH_DELIMITER.as_bytes());
        }
        hasher.update(part.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Append a `row_hash` column computed over `columns`.
///
/// Empty `columns` returns the batch unchanged. Returns the batch and the
/// number of rows dropped by [`MissingColumnPolicy::Reject`].
pub fn fingerprint(
    batch: RecordBatch,
    columns: &[String],
    policy: MissingColumnPolicy,
) -> (RecordBatch, usize) {
    if columns.is_empty() {
        return (batch, 0);
    }

    let indices: Vec<Option<usize>> = columns.iter().map(|c| batch.column_index(c)).collect();
    let absent: Vec<&str> = columns
        .iter()
        .zip(&indices)
        .filter(|(_, idx)| idx.is_none())
        .map(|(c, _)| c.as_str())
        .collect();

    if !absent.is_empty() {
        match policy {
            MissingColumnPolicy::Placeholder => {
                warn!(?absent, "hash columns absent, hashed as empty");
            }
            MissingColumnPolicy::Reject => {
                let dropped = batch.len();
                warn!(?absent, dropped, "hash columns absent, rows rejected");
                let batch = batch.retain_rows(|_| false);
                return (batch.append_column(ROW_HASH_COLUMN, Vec::new()), dropped);
            }
        }
    }

    let hashes: Vec<Value> = batch
        .rows()
        .iter()
        .map(|row| {
            let parts = indices
                .iter()
                .map(|idx| idx.map(|i| row[i].to_string()).unwrap_or_default());
            Value::Text(hash_parts(parts))
        })
        .collect();

    debug!(rows = hashes.len(), ?columns, "row hashes computed");
    (batch.append_column(ROW_HASH_COLUMN, hashes), 0)
}
