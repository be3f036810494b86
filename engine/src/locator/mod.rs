//! Source file discovery: newest file in a folder matching a glob.
//!
//! Only `*` (any run of characters) and `?` (one character) are special in
//! patterns; everything else matches literally. "Newest" is by creation time,
//! falling back to modification time on filesystems that do not record it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{LocateError, LocateResult};

/// Compile a file-name glob to an anchored regex.
pub fn glob_to_regex(pattern: &str) -> LocateResult<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|e| LocateError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Return the most recently created regular file in `folder` whose name
/// matches `pattern`. Ties go to the greatest file name.
pub fn locate_latest(folder: &Path, pattern: &str) -> LocateResult<PathBuf> {
    let matcher = glob_to_regex(pattern)?;
    let io_err = |source| LocateError::Io {
        path: folder.to_path_buf(),
        source,
    };

    let mut newest: Option<(SystemTime, String, PathBuf)> = None;
    for entry in fs::read_dir(folder).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matcher.is_match(&name) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let stamp = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        debug!(file = %name, ?stamp, "candidate");

        let is_newer = match newest {
            Some((ref t, ref n, _)) => (stamp, &name) > (*t, n),
            None => true,
        };
        if is_newer {
            newest = Some((stamp, name, entry.path()));
        }
    }

    match newest {
        Some((_, _, path)) => {
            info!(path = %path.display(), "located source file");
            Ok(path)
        }
        None => Err(LocateError::NoMatch {
            folder: folder.to_path_buf(),
            pattern: pattern.to_string(),
        }),
    }
}
