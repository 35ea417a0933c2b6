//! Store-root-bound path resolution

use std::path::{Path, PathBuf};

use crate::{Error, LogicalPath, Result};

/// Resolves logical paths against a single physical store root.
///
/// One resolver binds exactly one root for its lifetime. Every resolution
/// verifies the physical result is a descendant of the root, so a crafted
/// logical path can never reach outside the store.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Bind a resolver to an existing store root directory.
    ///
    /// The root is canonicalized once at construction; symlinked roots are
    /// resolved to their physical location so descendant checks compare
    /// like with like.
    pub fn bind(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = dunce::canonicalize(root).map_err(|e| Error::io(root, e))?;
        if !canonical.is_dir() {
            return Err(Error::InvalidRoot { path: canonical });
        }
        Ok(Self { root: canonical })
    }

    /// Bind a resolver, creating the root directory if it does not exist.
    pub fn bind_or_create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        Self::bind(root)
    }

    /// The physical store root this resolver is bound to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path to an absolute physical location.
    ///
    /// The logical path is already normalized (no `..` survives
    /// [`LogicalPath::new`]), but the joined result is re-checked against
    /// the root before being handed to any I/O.
    pub fn resolve(&self, path: &LogicalPath) -> Result<PathBuf> {
        let physical = if path.is_root() {
            self.root.clone()
        } else {
            self.root.join(path.to_native())
        };
        if !physical.starts_with(&self.root) {
            return Err(Error::PathEscape {
                path: physical,
                root: self.root.clone(),
            });
        }
        Ok(physical)
    }

    /// Express a physical path under the root as a logical path.
    pub fn relativize(&self, physical: &Path) -> Result<LogicalPath> {
        let relative = physical
            .strip_prefix(&self.root)
            .map_err(|_| Error::PathEscape {
                path: physical.to_path_buf(),
                root: self.root.clone(),
            })?;
        LogicalPath::from_native(relative)
    }
}
