//! Line-oriented project files terminated by a sentinel line.
//!
//! Readers stop at the first sentinel line and treat a file without one as
//! truncated. Writers always replace the whole file through a temporary file
//! in the same directory, so a reader never sees a partial write.

use std::fs;
use std::io::{self, Write};

use rpool_core::path::Utf8Path;

use crate::error::{Error, Result, ResultExt};

pub const SENTINEL: &str = "\\";

/// Reads the lines preceding the sentinel, paired with 1-based line numbers.
///
/// Returns `Ok(None)` if the file does not exist. Blank lines are skipped.
pub fn read_records(path: &Utf8Path) -> Result<Option<Vec<(usize, String)>>> {
    let text = match fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::new_filesystem(path, e)),
    };

    let mut records = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line == SENTINEL {
            return Ok(Some(records));
        }

        if line.trim().is_empty() {
            continue;
        }

        records.push((idx + 1, line.to_owned()));
    }

    Err(Error::Truncated {
        path: path.to_owned(),
    })
}

/// Replaces `path` with `records` followed by the sentinel line.
pub fn write_records<I, S>(path: &Utf8Path, records: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for record in records {
        text.push_str(record.as_ref());
        text.push('\n');
    }
    text.push_str(SENTINEL);

    write_atomic(path, text.as_bytes())
}

/// Writes the full contents to a sibling temporary file, syncs it and
/// renames it over `path`.
pub fn write_atomic(path: &Utf8Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(v) if !v.as_str().is_empty() => v,
        _ => Utf8Path::new("."),
    };

    let mut temp_file = tempfile::Builder::new()
        .prefix(".rpool-temp-")
        .tempfile_in(dir)
        .fs_context(dir)?;

    temp_file.write_all(data).fs_context(path)?;
    temp_file.flush().fs_context(path)?;
    temp_file.as_file().sync_all().fs_context(path)?;

    temp_file
        .persist(path)
        .map_err(|e| Error::new_filesystem(path, e.error))?;

    Ok(())
}
