//! Error types for ghost-store
//!
//! The taxonomy is part of the driver contract: callers branch on
//! "not found" vs "I/O failure" vs "not implemented", so each kind is a
//! distinct variant rather than a stringly-typed catch-all.

/// Result type for ghost-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ghost-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Read or delete target absent; expected and recoverable
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Underlying medium fault while reading
    #[error("Storage read failed for {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Underlying medium fault while writing or deleting
    #[error("Storage write failed for {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Directory enumeration blocked; a merely-absent directory is NOT an
    /// error and yields an empty listing instead
    #[error("Directory access failed for {path}: {source}")]
    DirectoryAccess {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Archive build or extract failure; extraction is all-or-nothing
    #[error("Archive operation failed: {message}")]
    Archive {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backend lacks a capability; signalled distinctly so callers can
    /// feature-detect instead of misreading a silent no-op as success
    #[error("{backend} does not implement {operation}")]
    NotImplemented {
        backend: &'static str,
        operation: &'static str,
    },

    /// Path normalization or resolution error from ghost-fs
    #[error(transparent)]
    Fs(#[from] ghost_fs::Error),
}

impl Error {
    pub fn read(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn write(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
            source: None,
        }
    }

    pub fn archive_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Archive {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error is the expected "not found" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}
