//! Serialization of the processed batch.
//!
//! The artifact is a delimited text table with a header row and no index
//! column. It lands at `<processed_dir>/cleaned_<input basename>` unless a
//! fixed file name is configured; the table loader finds it there.
//!
//! Writes go to a temporary file in the destination directory which is then
//! persisted over the destination, so a failed run leaves no partial file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OutputError, OutputResult};
use crate::models::RecordBatch;

/// Prefix of the default output file name.
pub const OUTPUT_PREFIX: &str = "cleaned_";

/// Where and how to write the processed batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Directory receiving the cleaned file
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,

    /// Fixed output file name (default: `cleaned_<input basename>`)
    #[serde(default)]
    pub file_name: Option<String>,

    /// Field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_delimiter() -> char {
    ','
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
            file_name: None,
            delimiter: default_delimiter(),
        }
    }
}

impl OutputConfig {
    /// Output path for a source with the given base name.
    pub fn output_path(&self, source_identity: &str) -> PathBuf {
        match self.file_name {
            Some(ref name) => self.processed_dir.join(name),
            None => self
                .processed_dir
                .join(format!("{}{}", OUTPUT_PREFIX, source_identity)),
        }
    }
}

/// Write `batch` to `path`, replacing any existing file.
pub fn write_batch(batch: &RecordBatch, path: &Path, delimiter: char) -> OutputResult<()> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(OutputError::InvalidDelimiter(delimiter))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_err)?;
    let tmp = tempfile::Builder::new()
        .prefix(".reqclean-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(tmp.as_file());
        writer.write_record(batch.columns())?;
        for row in batch.rows() {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush().map_err(io_err)?;
    }

    tmp.persist(path).map_err(|e| OutputError::Persist {
        path: path.to_path_buf(),
        message: e.error.to_string(),
    })?;

    debug!(path = %path.display(), rows = batch.len(), "batch written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_default_output_path() {
        let config = OutputConfig {
            processed_dir: PathBuf::from("/data/processed"),
            ..OutputConfig::default()
        };
        assert_eq!(
            config.output_path("requests.csv"),
            PathBuf::from("/data/processed/cleaned_requests.csv")
        );
    }

    #[test]
    fn test_fixed_output_name() {
        let config = OutputConfig {
            processed_dir: PathBuf::from("out"),
            file_name: Some("cleaned_customer_requests.csv".into()),
            ..OutputConfig::default()
        };
        assert_eq!(
            config.output_path("anything.csv"),
            PathBuf::from("out/cleaned_customer_requests.csv")
        );
    }

    #[test]
    fn test_write_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cleaned_x.csv");
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let batch = RecordBatch::from_rows(
            vec!["id".into(), "note".into(), "at".into()],
            vec![
                vec![Value::text("1"), Value::text("a, b"), Value::Timestamp(t)],
                vec![Value::text("2"), Value::Null, Value::Null],
            ],
        );

        write_batch(&batch, &path, ',').unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "id,note,at\n1,\"a, b\",2025-01-01T10:00:00+00:00\n2,,\n"
        );
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_header_written_for_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let batch = RecordBatch::new(vec!["a".into(), "b".into()]);

        write_batch(&batch, &path, ';').unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a;b\n");
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale contents\n").unwrap();

        let batch = RecordBatch::new(vec!["a".into()]);
        write_batch(&batch, &path, ',').unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n");
    }
}
