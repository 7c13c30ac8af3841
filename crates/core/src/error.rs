use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Rejected mode configuration. Raised before any file is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("character edit: the text to replace must not be empty")]
    EmptyTarget,
    #[error("character edit: replacement {0:?} would leave the output directory")]
    UnsafeReplacement(String),
    #[error("sequence: start number must be an integer, got {0:?}")]
    StartNumberNotInteger(String),
    #[error("sequence: start number must be greater than zero, got {0}")]
    StartNumberNotPositive(i64),
    #[error("unknown rename mode: {0:?}")]
    UnknownMode(String),
    #[error("unknown edit scope: {0:?} (expected stem, suffix or both)")]
    UnknownScope(String),
    #[error("unknown resequence strategy: {0:?} (expected size or sequence)")]
    UnknownStrategy(String),
}

/// Failures that abort a run before the first file is moved.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("source directory is missing or not a directory: {}", .path.display())]
    InvalidSource { path: PathBuf },
    #[error("cannot create output directory: {}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot list source directory: {}", .path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
