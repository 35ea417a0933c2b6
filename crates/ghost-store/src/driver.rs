//! The StorageDriver capability contract
//!
//! Every backing store implements this trait in full; there is no shared
//! base carrying behavior. Radically different physical models (a directory
//! tree, an in-memory map, an object bucket) all present the same
//! logical-path semantics to the content-management and synchronization
//! services.

use std::collections::HashSet;

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::revision::FileRevision;
use crate::Result;
use ghost_fs::LogicalPath;

/// Options for [`StorageDriver::directory_listing`].
#[derive(Debug, Clone, Default)]
pub struct ListingOptions {
    /// Glob patterns filtered out of the result set
    pub exclude: Vec<String>,
    /// Whether dot-prefixed entries are included
    pub include_dot_files: bool,
}

impl ListingOptions {
    /// Listing with no exclusions and dot-files hidden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a glob pattern to exclude from the listing.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// Include dot-prefixed files and directories.
    pub fn with_dot_files(mut self) -> Self {
        self.include_dot_files = true;
        self
    }
}

/// Compile exclude patterns into one matcher; `None` when there are none.
///
/// Backends treat a pattern that fails to compile as an advisory-path
/// degradation: the listing comes back empty with a logged diagnostic.
pub(crate) fn build_globset(
    patterns: &[String],
) -> std::result::Result<Option<GlobSet>, globset::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

/// A pluggable, versioned content store bound to a single store root.
///
/// All paths are logical: forward-slash relative paths within the root.
/// Instances are created once per root and held for the process lifetime
/// of the owning service.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Create or overwrite the file at `path` with `content` (binary-safe),
    /// creating missing ancestor directories. When `record_revision` is
    /// set, a [`FileRevision`] entry is appended to the path's ledger.
    async fn upsert_file(&self, path: &str, content: Vec<u8>, record_revision: bool) -> Result<()>;

    /// Read the file at `path`.
    ///
    /// Fails with [`Error::FileNotFound`](crate::Error::FileNotFound) when
    /// absent and [`Error::ReadFailed`](crate::Error::ReadFailed) for any
    /// other I/O failure, so callers can treat "not found" as expected.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Whether a file exists at `path`.
    async fn file_exists(&self, path: &str) -> Result<bool>;

    /// Remove the file at `path`. Deleting an absent file fails with
    /// `FileNotFound` rather than silently succeeding, keeping revision
    /// state consistent. When `record_revision` is set, the deletion is
    /// appended to the path's ledger.
    async fn delete_file(&self, path: &str, record_revision: bool) -> Result<()>;

    /// Recursively remove a directory subtree.
    async fn delete_dir(&self, path: &str) -> Result<()>;

    /// Ensure a directory exists (no-op if present).
    async fn create_dir(&self, path: &str) -> Result<()>;

    /// Enumerate files (not directories) under `folder`, recursively,
    /// returned with forward-slash separators in lexicographic order.
    ///
    /// A `folder` that does not exist yields an empty listing rather than
    /// an error; listings are advisory. Glob-evaluation failures degrade to
    /// an empty listing with a logged diagnostic. Any other read failure
    /// propagates as `DirectoryAccess`.
    async fn directory_listing(
        &self,
        folder: &str,
        opts: ListingOptions,
    ) -> Result<Vec<LogicalPath>>;

    /// Return the revision ledger for `path_prefix`, oldest first. A
    /// missing or unreadable ledger yields an empty sequence, never an
    /// error.
    async fn list_revisions(&self, path_prefix: &str) -> Result<Vec<FileRevision>>;

    /// Remove exactly one revision by id from the ledger tracking `path`,
    /// leaving others untouched.
    ///
    /// Backends without revision storage fail with `NotImplemented` so
    /// callers can detect the capability gap.
    async fn delete_revision(&self, path: &str, revision_id: &str) -> Result<()>;

    /// Derive the top-level directories under `base_dir` participating in
    /// synchronization, honoring `.noghost` opt-out markers.
    ///
    /// Discovery is advisory: any listing failure yields an empty set
    /// rather than aborting a larger synchronization flow.
    async fn discover_trackable_folders(&self, base_dir: &str) -> HashSet<String>;

    /// Build a portable compressed archive containing exactly `paths`,
    /// rooted at `folder`. Returns the archive bytes, which are the sole
    /// handle to the archive: `archive_id` is diagnostic-only, naming the
    /// archive in logs and staging without affecting the produced bytes.
    async fn create_archive(
        &self,
        archive_id: &str,
        folder: &str,
        paths: &[String],
    ) -> Result<Vec<u8>>;

    /// Unpack an archive under `destination`, creating it if absent.
    /// Strict and all-or-nothing: a malformed or path-escaping entry aborts
    /// the whole operation with nothing applied. Returns the extracted
    /// logical paths by re-listing `destination` after end-of-stream.
    async fn extract_archive(
        &self,
        archive: &[u8],
        destination: &str,
    ) -> Result<Vec<LogicalPath>>;
}
