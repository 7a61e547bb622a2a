use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use rpool_core::path::Utf8PathBuf;
use rpool_core::Uid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("source file not found: neither `{path}` nor `{samples_candidate}` exist")]
    SourceFileNotFound {
        path: Utf8PathBuf,
        samples_candidate: Utf8PathBuf,
    },
    #[error("audio pool already contains uid {uid}")]
    DuplicateUid { uid: Uid },
    #[error("audio pool already contains `{path}`")]
    DuplicatePath { path: Utf8PathBuf },
    #[error("audio pool does not contain uid {uid}")]
    UnknownUid { uid: Uid },

    #[error("time stretch failed: `{command}` {status}")]
    StretchFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("gateway {operation} failed: {message}")]
    Gateway {
        operation: &'static str,
        message: String,
    },

    #[error("`{path}` is truncated (no terminator line)")]
    Truncated { path: Utf8PathBuf },
    #[error("`{path}` line {line}: {message}")]
    Malformed {
        path: Utf8PathBuf,
        line: usize,
        message: String,
    },
    #[error("invalid sample graph `{path}`: {message}")]
    InvalidSampleGraph { path: Utf8PathBuf, message: String },
    #[error("invalid time stretch parameters: {message}")]
    InvalidStretch { message: String },
    #[error("unsupported project version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("invalid project `{path}`: {message}")]
    InvalidProject { path: Utf8PathBuf, message: String },
    #[error("path is not valid utf-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },
    #[error("config error: {path}: {message}")]
    Config { path: Utf8PathBuf, message: String },
    #[error("plugin uid counter exhausted")]
    PluginUidExhausted,
    #[error("audio pool uids exhausted")]
    UidExhausted,

    #[error("filesystem error: {path}: {source}")]
    Filesystem {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error: {source}")]
    Io {
        #[source]
        #[from]
        source: io::Error,
    },
}

impl Error {
    #[cold]
    pub fn new_filesystem<P: Into<Utf8PathBuf>>(path: P, source: io::Error) -> Error {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    #[cold]
    pub fn new_gateway<E: Display>(operation: &'static str, error: E) -> Error {
        Error::Gateway {
            operation,
            message: error.to_string(),
        }
    }

    #[cold]
    pub fn new_malformed<P: Into<Utf8PathBuf>, E: Display>(
        path: P,
        line: usize,
        error: E,
    ) -> Error {
        Error::Malformed {
            path: path.into(),
            line,
            message: error.to_string(),
        }
    }

    #[cold]
    pub fn new_non_utf8(path: &Path) -> Error {
        Error::NonUtf8Path {
            path: path.to_path_buf(),
        }
    }

    /// Whether the error means a file referenced by the pool is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::SourceFileNotFound { .. } => true,
            Error::Filesystem { source, .. } | Error::Io { source } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) trait ResultExt<T> {
    fn fs_context(self, path: impl Into<Utf8PathBuf>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, io::Error> {
    #[track_caller]
    fn fs_context(self, path: impl Into<Utf8PathBuf>) -> Result<T> {
        self.map_err(|e| Error::new_filesystem(path, e))
    }
}
