//! Per-prefix revision ledger
//!
//! Each tracked directory prefix carries an append-only history record,
//! `revisions.json`, colocated with the files it tracks. The record is the
//! source of truth for `list_revisions`; an absent or corrupt record
//! degrades to "no history" rather than failing a caller.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::{Error, Result};
use ghost_fs::{io, LogicalPath, PathResolver};

/// Well-known file name of the ledger record under a tracked prefix
pub const REVISIONS_FILE: &str = "revisions.json";

/// One recorded change to a file under a tracked prefix.
///
/// Immutable once recorded; ordering within a ledger is insertion order,
/// oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRevision {
    /// Logical path of the changed file
    pub path: String,
    /// Opaque unique id of this revision
    pub revision_id: String,
    /// When the change was recorded
    pub timestamp: DateTime<Utc>,
    /// Who recorded the change, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Append-only change history for the prefixes under one store root.
///
/// Append and delete are read-modify-write on a shared record, so they are
/// serialized per prefix through an async mutex map; the file itself is
/// additionally written atomically with advisory locking against
/// out-of-process writers.
pub struct RevisionLedger {
    resolver: PathResolver,
    author: Option<String>,
    prefix_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RevisionLedger {
    /// Create a ledger over the given store root.
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            author: None,
            prefix_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Attribute future recorded revisions to `author`.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// The prefix whose ledger tracks `path`: its parent directory, or the
    /// root for top-level files.
    fn prefix_of(path: &LogicalPath) -> String {
        path.parent().map(|p| p.as_str().to_string()).unwrap_or_default()
    }

    async fn lock_for(&self, prefix: &str) -> Arc<Mutex<()>> {
        let mut locks = self.prefix_locks.lock().await;
        locks
            .entry(prefix.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Read the ledger record for `prefix`, oldest first.
    ///
    /// Absent or malformed records yield an empty sequence; the degraded
    /// read is logged so silent data gaps stay debuggable.
    pub async fn list(&self, prefix: &str) -> Result<Vec<FileRevision>> {
        let prefix_path = LogicalPath::new(prefix)?;
        let record = self
            .resolver
            .resolve(&prefix_path.join(REVISIONS_FILE)?)?;

        let entries = tokio::task::spawn_blocking(move || {
            if !record.is_file() {
                return Vec::new();
            }
            match io::read_locked(&record) {
                Ok(bytes) => match serde_json::from_slice::<Vec<FileRevision>>(&bytes) {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(record = %record.display(), error = %e, "corrupt revision ledger, treating as empty");
                        Vec::new()
                    }
                },
                Err(e) => {
                    warn!(record = %record.display(), error = %e, "unreadable revision ledger, treating as empty");
                    Vec::new()
                }
            }
        })
        .await
        .map_err(|e| Error::read(prefix, e))?;

        Ok(entries)
    }

    /// Append one revision entry for `path` and return it.
    pub async fn record(&self, path: &LogicalPath) -> Result<FileRevision> {
        let revision = FileRevision {
            path: path.as_str().to_string(),
            revision_id: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now(),
            author: self.author.clone(),
        };

        let prefix = Self::prefix_of(path);
        let recorded = revision.clone();
        self.mutate(&prefix, move |entries| {
            entries.push(recorded);
            true
        })
        .await?;

        Ok(revision)
    }

    /// Remove exactly one revision by id under the prefix tracking `path`,
    /// leaving other entries untouched. Removing an id that is not present
    /// leaves the ledger unchanged.
    pub async fn delete(&self, path: &LogicalPath, revision_id: &str) -> Result<()> {
        let prefix = Self::prefix_of(path);
        let target = revision_id.to_string();
        self.mutate(&prefix, move |entries| {
            match entries.iter().position(|r| r.revision_id == target) {
                Some(idx) => {
                    entries.remove(idx);
                    true
                }
                None => false,
            }
        })
        .await
    }

    /// Serialized read-modify-write of one prefix's record. The closure
    /// returns whether the record changed and needs rewriting.
    async fn mutate<F>(&self, prefix: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<FileRevision>) -> bool + Send + 'static,
    {
        let prefix_path = LogicalPath::new(prefix)?;
        let record = self
            .resolver
            .resolve(&prefix_path.join(REVISIONS_FILE)?)?;
        let prefix_owned = prefix.to_string();

        let guard = self.lock_for(prefix).await;
        let held = guard.lock().await;

        let outcome = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut entries = if record.is_file() {
                let bytes =
                    io::read_locked(&record).map_err(|e| Error::write(prefix_owned.as_str(), e))?;
                serde_json::from_slice::<Vec<FileRevision>>(&bytes).unwrap_or_else(|e| {
                    warn!(record = %record.display(), error = %e, "corrupt revision ledger, rebuilding");
                    Vec::new()
                })
            } else {
                Vec::new()
            };

            if apply(&mut entries) {
                let serialized = serde_json::to_vec_pretty(&entries)
                    .map_err(|e| Error::write(prefix_owned.as_str(), e))?;
                io::write_atomic(&record, &serialized)
                    .map_err(|e| Error::write(prefix_owned.as_str(), e))?;
            }
            Ok(())
        })
        .await
        .unwrap_or_else(|e| Err(Error::write(prefix, e)));

        drop(held);
        // With the map locked no new waiter can clone the entry, so a
        // count of two (map + this guard) means the prefix is idle.
        let mut locks = self.prefix_locks.lock().await;
        if Arc::strong_count(&guard) == 2 {
            locks.remove(prefix);
        }
        drop(locks);

        outcome
    }
}
