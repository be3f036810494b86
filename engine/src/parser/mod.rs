//! Delimited-text reader with encoding and delimiter auto-detection.
//!
//! Fields are read verbatim: no trimming and no type inference. A field
//! equal to one of the configured null tokens becomes [`Value::Null`],
//! every other field becomes [`Value::Text`]. Typed coercions happen later,
//! in the filter stage.

use std::collections::HashSet;
use std::path::Path;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CsvError, CsvResult};
use crate::models::{RecordBatch, Value};

/// How to read a source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadOptions {
    /// Field delimiter (auto-detect if not specified)
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Source encoding label, e.g. `utf-8`, `iso-8859-1` (auto-detect if not
    /// specified)
    #[serde(default)]
    pub encoding: Option<String>,

    /// Field contents read as null
    #[serde(default = "default_null_tokens")]
    pub null_tokens: Vec<String>,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn default_null_tokens() -> Vec<String> {
    vec![String::new()]
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: None,
            null_tokens: default_null_tokens(),
        }
    }
}

/// Result of reading with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows
    pub batch: RecordBatch,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using an encoding label.
///
/// UTF-8 input with invalid sequences is decoded lossily.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let encoding = Encoding::for_label(encoding.trim().as_bytes())
        .ok_or_else(|| CsvError::UnsupportedEncoding(encoding.to_string()))?;

    if encoding == encoding_rs::UTF_8 {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "replacement characters inserted while decoding");
    }
    Ok(decoded.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Ties go to the earlier candidate, so `,` wins when nothing else is more
/// frequent.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Read a source file into a [`RecordBatch`].
pub fn read_batch_file<P: AsRef<Path>>(path: P, options: &ReadOptions) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bytes(&bytes, options)
}

/// Read raw bytes into a [`RecordBatch`].
pub fn parse_bytes(bytes: &[u8], options: &ReadOptions) -> CsvResult<ParseResult> {
    let (content, encoding) = match (options.encoding.as_deref(), bytes.strip_prefix(UTF8_BOM)) {
        (Some(label), _) => (decode_content(bytes, label)?, label.to_string()),
        (None, Some(rest)) => (decode_content(rest, "utf-8")?, "utf-8".to_string()),
        // chardet misreads short non-Latin UTF-8 as single-byte charsets
        (None, None) if std::str::from_utf8(bytes).is_ok() => {
            (decode_content(bytes, "utf-8")?, "utf-8".to_string())
        }
        (None, None) => {
            let detected = detect_encoding(bytes);
            // chardet can name charsets encoding_rs has no decoder for
            match decode_content(bytes, &detected) {
                Ok(content) => (content, detected),
                Err(_) => (decode_content(bytes, "utf-8")?, "utf-8".to_string()),
            }
        }
    };

    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(content));
    debug!(%encoding, ?delimiter, "decoded source");

    let batch = parse_str(content, delimiter, &options.null_tokens)?;

    Ok(ParseResult {
        batch,
        encoding,
        delimiter,
    })
}

/// Parse decoded text with an explicit delimiter.
///
/// # Example
/// ```
/// use reqclean::parser::parse_str;
///
/// let batch = parse_str("name,age\nAlice,30\nBob,", ',', &["".to_string()]).unwrap();
///
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch.get(0, "name").and_then(|v| v.as_str()), Some("Alice"));
/// assert!(batch.get(1, "age").unwrap().is_null());
/// ```
pub fn parse_str(content: &str, delimiter: char, null_tokens: &[String]) -> CsvResult<RecordBatch> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(CsvError::InvalidDelimiter(delimiter))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(to_parse_error)?.clone();
    if headers.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut seen = HashSet::new();
    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(CsvError::DuplicateColumn(column.clone()));
        }
    }

    let mut batch = RecordBatch::new(columns);
    for record in reader.records() {
        let record = record.map_err(to_parse_error)?;
        let row = record
            .iter()
            .map(|field| {
                if null_tokens.iter().any(|t| t == field) {
                    Value::Null
                } else {
                    Value::text(field)
                }
            })
            .collect();
        batch.push_row(row);
    }

    Ok(batch)
}

fn to_parse_error(err: csv::Error) -> CsvError {
    CsvError::Parse {
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nulls() -> Vec<String> {
        vec![String::new()]
    }

    #[test]
    fn test_simple_csv() {
        let batch = parse_str("name,age\nAlice,30\nBob,25", ',', &nulls()).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.columns(), ["name", "age"]);
        assert_eq!(batch.get(0, "name"), Some(&Value::text("Alice")));
        assert_eq!(batch.get(1, "age"), Some(&Value::text("25")));
    }

    #[test]
    fn test_quoted_values_keep_delimiters_and_whitespace() {
        let csv = "name,note\n\"Smith, J\",\"  spaced  \"";
        let batch = parse_str(csv, ',', &nulls()).unwrap();

        assert_eq!(batch.get(0, "name"), Some(&Value::text("Smith, J")));
        assert_eq!(batch.get(0, "note"), Some(&Value::text("  spaced  ")));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let batch = parse_str("a,b\n1,2\n\n3,4\n", ',', &nulls()).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_missing_values_are_null() {
        let batch = parse_str("a,b,c\n1,,3\n4", ',', &nulls()).unwrap();

        assert!(batch.get(0, "b").unwrap().is_null());
        assert!(batch.get(1, "c").unwrap().is_null());
    }

    #[test]
    fn test_extra_columns_ignored() {
        let batch = parse_str("a,b\n1,2,3,4", ',', &nulls()).unwrap();
        assert_eq!(batch.rows()[0].len(), 2);
    }

    #[test]
    fn test_custom_null_tokens() {
        let tokens = vec![String::new(), "NULL".to_string(), "N/A".to_string()];
        let batch = parse_str("a,b\nNULL,N/A\nnull,x", ',', &tokens).unwrap();

        assert!(batch.get(0, "a").unwrap().is_null());
        assert!(batch.get(0, "b").unwrap().is_null());
        assert_eq!(batch.get(1, "a"), Some(&Value::text("null")));
    }

    #[test]
    fn test_empty_csv_error() {
        let result = parse_str("", ',', &nulls());
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_duplicate_header_error() {
        let result = parse_str("a,b,a\n1,2,3", ',', &nulls());
        assert!(matches!(result, Err(CsvError::DuplicateColumn(ref c)) if c == "a"));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let result = parse_str("a§b", '§', &nulls());
        assert!(matches!(result, Err(CsvError::InvalidDelimiter('§'))));
    }

    #[test]
    fn test_header_only() {
        let batch = parse_str("a,b\n", ',', &nulls()).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.columns(), ["a", "b"]);
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_detect_delimiter_single_column_defaults_to_comma() {
        assert_eq!(detect_delimiter("request_id\n1"), ',');
    }

    #[test]
    fn test_auto_parse_strips_bom() {
        let bytes = "\u{feff}request_id;status\n1;Done".as_bytes();
        let result = parse_bytes(bytes, &ReadOptions::default()).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.batch.columns(), ["request_id", "status"]);
        assert_eq!(result.batch.get(0, "status"), Some(&Value::text("Done")));
    }

    #[test]
    fn test_latin1_decoding() {
        // "name\nSociété" in ISO-8859-1
        let bytes: &[u8] = &[
            b'n', b'a', b'm', b'e', b'\n', 0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9,
        ];
        let options = ReadOptions {
            encoding: Some("iso-8859-1".into()),
            ..ReadOptions::default()
        };
        let result = parse_bytes(bytes, &options).unwrap();
        assert_eq!(result.batch.get(0, "name"), Some(&Value::text("Société")));
    }

    #[test]
    fn test_latin1_detected() {
        let bytes: &[u8] = b"name\nSoci\xe9t\xe9\n";
        let result = parse_bytes(bytes, &ReadOptions::default()).unwrap();

        assert!(
            ["iso-8859-1", "windows-1252"].contains(&result.encoding.as_str()),
            "detected {}",
            result.encoding
        );
        assert_eq!(result.batch.get(0, "name"), Some(&Value::text("Société")));
    }

    #[test]
    fn test_valid_utf8_never_redetected() {
        for name in ["Ωmega", "Привет", "日本語", "Müller"] {
            let csv = format!("id,name\n1,{}\n", name);
            let result = parse_bytes(csv.as_bytes(), &ReadOptions::default()).unwrap();

            assert_eq!(result.encoding, "utf-8", "input {name:?}");
            assert_eq!(result.batch.get(0, "name"), Some(&Value::text(name)));
        }
    }

    #[test]
    fn test_unknown_encoding_label() {
        let options = ReadOptions {
            encoding: Some("klingon".into()),
            ..ReadOptions::default()
        };
        assert!(matches!(
            parse_bytes(b"a\n1", &options),
            Err(CsvError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_batch_file("/definitely/not/here.csv", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, CsvError::Io { .. }));
    }
}
