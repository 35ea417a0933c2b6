//! In-memory storage driver
//!
//! A second concrete backend with a radically different physical model: a
//! sorted map guarded by an async lock. Useful for tests and ephemeral
//! stores, and the demonstration that the [`StorageDriver`] contract holds
//! without a filesystem. Revision deletion is deliberately unimplemented
//! so callers exercise capability detection.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::archive::ArchiveCodec;
use crate::driver::{build_globset, ListingOptions, StorageDriver};
use crate::revision::FileRevision;
use crate::scanner;
use crate::{Error, Result};
use ghost_fs::LogicalPath;

const BACKEND: &str = "MemoryStorageDriver";

#[derive(Default)]
struct State {
    /// Logical path -> file content; BTreeMap keeps listings ordered
    files: BTreeMap<LogicalPath, Vec<u8>>,
    /// Prefix -> recorded revisions, oldest first
    revisions: BTreeMap<String, Vec<FileRevision>>,
}

/// In-memory [`StorageDriver`].
pub struct MemoryStorageDriver {
    state: RwLock<State>,
    author: Option<String>,
}

impl MemoryStorageDriver {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            author: None,
        }
    }

    /// Attribute recorded revisions to `author`.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    fn record(&self, state: &mut State, path: &LogicalPath) {
        let prefix = path
            .parent()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default();
        state.revisions.entry(prefix).or_default().push(FileRevision {
            path: path.as_str().to_string(),
            revision_id: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now(),
            author: self.author.clone(),
        });
    }

    /// Relative listing of files under `folder`, ordered, before glob and
    /// dot-file filtering.
    fn files_under(state: &State, folder: &LogicalPath) -> Vec<LogicalPath> {
        state
            .files
            .keys()
            .filter(|k| k.starts_with(folder))
            .filter_map(|k| {
                if folder.is_root() {
                    Some(k.clone())
                } else {
                    k.as_str()
                        .strip_prefix(folder.as_str())
                        .and_then(|rest| rest.strip_prefix('/'))
                        .and_then(|rest| LogicalPath::new(rest).ok())
                }
            })
            .collect()
    }
}

impl Default for MemoryStorageDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageDriver for MemoryStorageDriver {
    async fn upsert_file(&self, path: &str, content: Vec<u8>, record_revision: bool) -> Result<()> {
        let logical = LogicalPath::new(path)?;
        let mut state = self.state.write().await;
        state.files.insert(logical.clone(), content);
        if record_revision {
            self.record(&mut state, &logical);
        }
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let logical = LogicalPath::new(path)?;
        let state = self.state.read().await;
        state
            .files
            .get(&logical)
            .cloned()
            .ok_or_else(|| Error::FileNotFound {
                path: logical.as_str().to_string(),
            })
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let logical = LogicalPath::new(path)?;
        Ok(self.state.read().await.files.contains_key(&logical))
    }

    async fn delete_file(&self, path: &str, record_revision: bool) -> Result<()> {
        let logical = LogicalPath::new(path)?;
        let mut state = self.state.write().await;
        if state.files.remove(&logical).is_none() {
            return Err(Error::FileNotFound {
                path: logical.as_str().to_string(),
            });
        }
        if record_revision {
            self.record(&mut state, &logical);
        }
        Ok(())
    }

    async fn delete_dir(&self, path: &str) -> Result<()> {
        let logical = LogicalPath::new(path)?;
        let mut state = self.state.write().await;
        state.files.retain(|k, _| !k.starts_with(&logical));
        Ok(())
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        // Directories exist only implicitly in the map model; validating
        // the path is the whole operation
        LogicalPath::new(path)?;
        Ok(())
    }

    async fn directory_listing(
        &self,
        folder: &str,
        opts: ListingOptions,
    ) -> Result<Vec<LogicalPath>> {
        let logical = LogicalPath::new(folder)?;
        let globs = match build_globset(&opts.exclude) {
            Ok(globs) => globs,
            Err(e) => {
                warn!(folder = %logical, error = %e, "invalid exclude glob, returning empty listing");
                return Ok(Vec::new());
            }
        };

        let state = self.state.read().await;
        let mut listing: Vec<LogicalPath> = Self::files_under(&state, &logical)
            .into_iter()
            .filter(|p| opts.include_dot_files || !p.has_dot_component())
            .filter(|p| {
                !globs
                    .as_ref()
                    .is_some_and(|set| set.is_match(p.as_str()))
            })
            .collect();
        listing.sort();
        Ok(listing)
    }

    async fn list_revisions(&self, path_prefix: &str) -> Result<Vec<FileRevision>> {
        let logical = LogicalPath::new(path_prefix)?;
        let state = self.state.read().await;
        Ok(state
            .revisions
            .get(logical.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_revision(&self, _path: &str, _revision_id: &str) -> Result<()> {
        Err(Error::NotImplemented {
            backend: BACKEND,
            operation: "delete_revision",
        })
    }

    async fn discover_trackable_folders(&self, base_dir: &str) -> HashSet<String> {
        match self
            .directory_listing(base_dir, ListingOptions::new().with_dot_files())
            .await
        {
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
        let logical = LogicalPath::new(folder)?;
        let members = paths
            .iter()
            .map(|p| LogicalPath::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Materialize the requested files into a scratch tree so the same
        // codec (and the same portability guarantees) apply to this backend
        let mut sources = Vec::with_capacity(members.len());
        {
            let state = self.state.read().await;
            for member in &members {
                let key = if logical.is_root() {
                    member.clone()
                } else {
                    logical.join(member.as_str())?
                };
                let content = state.files.get(&key).cloned().ok_or_else(|| {
                    Error::archive(format!("missing archive source {key}"))
                })?;
                sources.push((member.clone(), content));
            }
        }

        let archive_name = archive_id.to_string();
        tokio::task::spawn_blocking(move || {
            let scratch = tempfile::tempdir()
                .map_err(|e| Error::archive_with("failed to create scratch directory", e))?;
            for (member, content) in &sources {
                let physical = scratch.path().join(member.to_native());
                if let Some(parent) = physical.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| Error::archive_with("failed to stage archive member", e))?;
                }
                std::fs::write(&physical, content)
                    .map_err(|e| Error::archive_with("failed to stage archive member", e))?;
            }
            let bytes = ArchiveCodec::pack(scratch.path(), &members)?;
            debug!(archive_id = %archive_name, size = bytes.len(), "archive created");
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
        let logical = LogicalPath::new(destination)?;

        let bytes = archive.to_vec();
        let extracted = tokio::task::spawn_blocking(move || -> Result<Vec<(LogicalPath, Vec<u8>)>> {
            let scratch = tempfile::tempdir()
                .map_err(|e| Error::archive_with("failed to create scratch directory", e))?;
            ArchiveCodec::unpack(&bytes, scratch.path())?;

            let mut files = Vec::new();
            for entry in WalkDir::new(scratch.path()).follow_links(false) {
                let entry =
                    entry.map_err(|e| Error::archive_with("failed to re-list extraction", e))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(scratch.path())
                    .map_err(|e| Error::archive_with("failed to re-list extraction", e))?;
                let content = std::fs::read(entry.path())
                    .map_err(|e| Error::archive_with("failed to re-list extraction", e))?;
                files.push((LogicalPath::from_native(relative)?, content));
            }
            Ok(files)
        })
        .await
        .map_err(|e| Error::archive_with("extract task failed", e))??;

        // Apply only after the whole stream unpacked cleanly
        let mut state = self.state.write().await;
        for (relative, content) in extracted {
            let key = if logical.is_root() {
                relative
            } else {
                logical.join(relative.as_str())?
            };
            state.files.insert(key, content);
        }

        let mut listing = Self::files_under(&state, &logical);
        listing.sort();
        Ok(listing)
    }
}
