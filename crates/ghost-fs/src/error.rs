//! Error types for ghost-fs

use std::path::PathBuf;

/// Result type for ghost-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ghost-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path contains traversal segments: {path}")]
    Traversal { path: String },

    #[error("Resolved path {path} escapes store root {root}")]
    PathEscape { path: PathBuf, root: PathBuf },

    #[error("Store root is not a directory: {path}")]
    InvalidRoot { path: PathBuf },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
