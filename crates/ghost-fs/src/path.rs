//! Logical path handling for cross-platform portability

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A relative path within a store root, normalized to forward slashes.
///
/// Logical paths are the wire convention of the store: they always use
/// forward slashes on output regardless of the host OS, so listings and
/// archive entries stay portable. Conversion to platform-native form
/// happens only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl LogicalPath {
    /// Create a logical path from any path-like input.
    ///
    /// Backslashes are converted to forward slashes, empty and `.` segments
    /// are dropped, and `..` segments are resolved against preceding
    /// segments. Inputs that are absolute or would climb above the root are
    /// rejected with [`Error::Traversal`].
    pub fn new(path: impl AsRef<str>) -> Result<Self> {
        let raw = path.as_ref().replace('\\', "/");
        if raw.starts_with('/') || has_drive_prefix(&raw) {
            return Err(Error::Traversal { path: raw });
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Error::Traversal { path: raw.clone() });
                    }
                }
                other => segments.push(other),
            }
        }

        Ok(Self {
            inner: segments.join("/"),
        })
    }

    /// Build a logical path from a native relative path.
    pub fn from_native(path: &Path) -> Result<Self> {
        Self::new(path.to_string_lossy())
    }

    /// Get the normalized forward-slash string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Whether this is the empty path (the store root itself).
    pub fn is_root(&self) -> bool {
        self.inner.is_empty()
    }

    /// Convert to a platform-native relative PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        self.inner.split('/').collect()
    }

    /// Join this path with a further relative segment.
    pub fn join(&self, segment: &str) -> Result<Self> {
        if self.inner.is_empty() {
            Self::new(segment)
        } else {
            Self::new(format!("{}/{}", self.inner, segment))
        }
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        let idx = self.inner.rfind('/')?;
        Some(Self {
            inner: self.inner[..idx].to_string(),
        })
    }

    /// Get the final path component.
    pub fn file_name(&self) -> Option<&str> {
        if self.inner.is_empty() {
            None
        } else {
            self.inner.rsplit('/').next()
        }
    }

    /// Get the first path component, the top-level directory or file name.
    pub fn top_level(&self) -> Option<&str> {
        if self.inner.is_empty() {
            None
        } else {
            self.inner.split('/').next()
        }
    }

    /// Whether any component of this path starts with a dot.
    pub fn has_dot_component(&self) -> bool {
        self.inner.split('/').any(|s| s.starts_with('.'))
    }

    /// Whether this path starts with the given prefix path.
    pub fn starts_with(&self, prefix: &LogicalPath) -> bool {
        if prefix.inner.is_empty() {
            return true;
        }
        self.inner == prefix.inner
            || self
                .inner
                .strip_prefix(&prefix.inner)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Detect Windows drive-letter prefixes such as `C:/`.
fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl std::fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl TryFrom<&str> for LogicalPath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for LogicalPath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}
