
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

pub use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Converts a path into the single representation used as a lookup key.
///
/// Backslashes become forward slashes, a leading drive letter is upper-cased,
/// repeated separators and `.` segments are dropped and a trailing separator
/// is removed. A leading `//` (UNC prefix) is kept. `..` is left alone, the
/// result never depends on the filesystem.
///
/// The function is idempotent.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");

    let (mut out, rest) = split_prefix(&path);

    let mut first = true;
    for segment in rest.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }

        if !first {
            out.push('/');
        }

        out.push_str(segment);
        first = false;
    }

    if out.is_empty() && !path.is_empty() {
        out.push('.');
    }

    out
}

fn split_prefix(path: &str) -> (String, &str) {
    let bytes = path.as_bytes();

    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let mut prefix = String::with_capacity(path.len());
        prefix.push(char::from(bytes[0].to_ascii_uppercase()));
        prefix.push(':');

        let rest = &path[2..];
        if rest.starts_with('/') {
            prefix.push('/');
        }

        return (prefix, rest);
    }

    if path.starts_with("//") {
        let mut prefix = String::with_capacity(path.len());
        prefix.push_str("//");
        return (prefix, path.trim_start_matches('/'));
    }

    if path.starts_with('/') {
        let mut prefix = String::with_capacity(path.len());
        prefix.push('/');
        return (prefix, &path[1..]);
    }

    (String::with_capacity(path.len()), path)
}

/// A path that went through [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedPath(String);

impl NormalizedPath {
    pub fn new(path: impl AsRef<str>) -> NormalizedPath {
        NormalizedPath(normalize(path.as_ref()))
    }

    /// Returns `None` for paths that are not valid UTF-8.
    pub fn from_path(path: &Path) -> Option<NormalizedPath> {
        path.to_str().map(NormalizedPath::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn join(&self, segment: impl AsRef<str>) -> NormalizedPath {
        NormalizedPath::new(format!("{}/{}", self.0, segment.as_ref()))
    }

    pub fn starts_with(&self, prefix: &NormalizedPath) -> bool {
        self.as_path().starts_with(prefix.as_path())
    }

    pub fn extension(&self) -> Option<&str> {
        self.as_path().extension()
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Utf8Path> for NormalizedPath {
    fn as_ref(&self) -> &Utf8Path {
        self.as_path()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl Borrow<str> for NormalizedPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for NormalizedPath {
    fn from(path: String) -> NormalizedPath {
        NormalizedPath::new(path)
    }
}

impl From<&str> for NormalizedPath {
    fn from(path: &str) -> NormalizedPath {
        NormalizedPath::new(path)
    }
}

impl From<&Utf8Path> for NormalizedPath {
    fn from(path: &Utf8Path) -> NormalizedPath {
        NormalizedPath::new(path.as_str())
    }
}

impl From<Utf8PathBuf> for NormalizedPath {
    fn from(path: Utf8PathBuf) -> NormalizedPath {
        NormalizedPath::new(path.as_str())
    }
}

impl From<NormalizedPath> for String {
    fn from(path: NormalizedPath) -> String {
        path.0
    }
}
