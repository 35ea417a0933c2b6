//! Filesystem-backed storage driver
//!
//! The reference implementation of [`StorageDriver`]. One instance binds
//! one store root directory for its lifetime; logical paths resolve
//! through [`PathResolver`], so nothing the driver does can reach outside
//! the root.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use globset::GlobSet;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::archive::ArchiveCodec;
use crate::driver::{build_globset, ListingOptions, StorageDriver};
use crate::revision::{FileRevision, RevisionLedger};
use crate::scanner;
use crate::{Error, Result};
use ghost_fs::{io, LogicalPath, PathResolver};

/// Disk-backed [`StorageDriver`] bound to a single root directory.
pub struct DiskStorageDriver {
    resolver: PathResolver,
    ledger: RevisionLedger,
}

impl DiskStorageDriver {
    /// Bind a driver to a store root, creating the directory if absent.
    pub fn bind(root: impl Into<PathBuf>) -> Result<Self> {
        let resolver = PathResolver::bind_or_create(root.into())?;
        let ledger = RevisionLedger::new(resolver.clone());
        Ok(Self { resolver, ledger })
    }

    /// Attribute recorded revisions to `author`.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.ledger = RevisionLedger::new(self.resolver.clone()).with_author(author);
        self
    }

    /// The physical store root this driver is bound to.
    pub fn root(&self) -> &std::path::Path {
        self.resolver.root()
    }

    /// Normalize a caller path and resolve its physical location.
    fn locate(&self, path: &str) -> Result<(LogicalPath, PathBuf)> {
        let logical = LogicalPath::new(path)?;
        let physical = self.resolver.resolve(&logical)?;
        Ok((logical, physical))
    }

    /// Recursive file enumeration under a physical folder, returned as
    /// logical paths relative to that folder, lexicographically ordered.
    fn walk(
        folder: &str,
        physical: PathBuf,
        globs: Option<GlobSet>,
        include_dot_files: bool,
    ) -> Result<Vec<LogicalPath>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&physical).follow_links(false) {
            let entry = entry.map_err(|e| Error::DirectoryAccess {
                path: folder.to_string(),
                source: Box::new(e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&physical)
                .map_err(|e| Error::DirectoryAccess {
                    path: folder.to_string(),
                    source: Box::new(e),
                })?;
            let logical = LogicalPath::from_native(relative)?;
            if !include_dot_files && logical.has_dot_component() {
                continue;
            }
            if globs
                .as_ref()
                .is_some_and(|set| set.is_match(logical.as_str()))
            {
                continue;
            }
            out.push(logical);
        }
        out.sort();
        Ok(out)
    }

    async fn listing(&self, folder: &str, opts: ListingOptions) -> Result<Vec<LogicalPath>> {
        let (logical, physical) = self.locate(folder)?;
        if !physical.is_dir() {
            debug!(folder = %logical, "listing of absent folder, returning empty");
            return Ok(Vec::new());
        }

        // Listings are advisory: a bad glob degrades to empty, logged
        let globs = match build_globset(&opts.exclude) {
            Ok(globs) => globs,
            Err(e) => {
                warn!(folder = %logical, error = %e, "invalid exclude glob, returning empty listing");
                return Ok(Vec::new());
            }
        };

        let folder_name = logical.as_str().to_string();
        let include_dot_files = opts.include_dot_files;
        tokio::task::spawn_blocking(move || {
            Self::walk(&folder_name, physical, globs, include_dot_files)
        })
        .await
        .map_err(|e| Error::read(folder, e))?
    }
}

#[async_trait]
impl StorageDriver for DiskStorageDriver {
    async fn upsert_file(&self, path: &str, content: Vec<u8>, record_revision: bool) -> Result<()> {
        let (logical, physical) = self.locate(path)?;

        let write_path = physical.clone();
        tokio::task::spawn_blocking(move || io::write_atomic(&write_path, &content))
            .await
            .map_err(|e| Error::write(path, e))?
            .map_err(|e| Error::write(logical.as_str(), e))?;

        if record_revision {
            self.ledger.record(&logical).await?;
        }
        debug!(path = %logical, "upserted file");
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let (logical, physical) = self.locate(path)?;
        tokio::fs::read(&physical).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound {
                    path: logical.as_str().to_string(),
                }
            } else {
                Error::read(logical.as_str(), e)
            }
        })
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let (logical, physical) = self.locate(path)?;
        match tokio::fs::metadata(&physical).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::read(logical.as_str(), e)),
        }
    }

    async fn delete_file(&self, path: &str, record_revision: bool) -> Result<()> {
        let (logical, physical) = self.locate(path)?;
        tokio::fs::remove_file(&physical).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound {
                    path: logical.as_str().to_string(),
                }
            } else {
                Error::write(logical.as_str(), e)
            }
        })?;

        if record_revision {
            self.ledger.record(&logical).await?;
        }
        debug!(path = %logical, "deleted file");
        Ok(())
    }

    async fn delete_dir(&self, path: &str) -> Result<()> {
        let (logical, physical) = self.locate(path)?;
        tokio::fs::remove_dir_all(&physical)
            .await
            .map_err(|e| Error::write(logical.as_str(), e))
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let (logical, physical) = self.locate(path)?;
        tokio::fs::create_dir_all(&physical)
            .await
            .map_err(|e| Error::write(logical.as_str(), e))
    }

    async fn directory_listing(
        &self,
        folder: &str,
        opts: ListingOptions,
    ) -> Result<Vec<LogicalPath>> {
        self.listing(folder, opts).await
    }

    async fn list_revisions(&self, path_prefix: &str) -> Result<Vec<FileRevision>> {
        self.ledger.list(path_prefix).await
    }

    async fn delete_revision(&self, path: &str, revision_id: &str) -> Result<()> {
        let logical = LogicalPath::new(path)?;
        self.ledger.delete(&logical, revision_id).await
    }

    async fn discover_trackable_folders(&self, base_dir: &str) -> HashSet<String> {
        let listing = self
            .listing(base_dir, ListingOptions::new().with_dot_files())
            .await;
        match listing {
            Ok(listing) => scanner::discover_trackable_folders_in(&listing),
            Err(e) => {
                warn!(base_dir, error = %e, "trackable-folder discovery failed, returning empty set");
                HashSet::new()
            }
        }
    }

    async fn create_archive(
        &self,
        archive_id: &str,
        folder: &str,
        paths: &[String],
    ) -> Result<Vec<u8>> {
        let (logical, physical) = self.locate(folder)?;
        let members = paths
            .iter()
            .map(|p| LogicalPath::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let archive_name = archive_id.to_string();
        let folder_name = logical.as_str().to_string();
        tokio::task::spawn_blocking(move || {
            let bytes = ArchiveCodec::pack(&physical, &members)?;
            debug!(archive_id = %archive_name, folder = %folder_name, size = bytes.len(), "archive created");
            Ok(bytes)
        })
        .await
        .map_err(|e| Error::archive_with("archive task failed", e))?
    }

    async fn extract_archive(
        &self,
        archive: &[u8],
        destination: &str,
    ) -> Result<Vec<LogicalPath>> {
        let (_, physical) = self.locate(destination)?;

        let bytes = archive.to_vec();
        tokio::task::spawn_blocking(move || ArchiveCodec::unpack(&bytes, &physical))
            .await
            .map_err(|e| Error::archive_with("extract task failed", e))??;

        // Extraction has fully completed; only now is the listing computed
        self.listing(destination, ListingOptions::new().with_dot_files())
            .await
    }
}
