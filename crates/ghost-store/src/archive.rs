//! Portable archive codec
//!
//! Builds and extracts gzip-compressed tar archives representing a subtree
//! snapshot. Archives are portable across machines: entry paths are
//! relative with forward slashes, and headers carry no host-specific
//! metadata (fixed mode, zeroed mtime/uid/gid). Extraction is strict and
//! all-or-nothing: entries unpack into a staging directory first, so a
//! malformed or path-escaping entry aborts before anything reaches the
//! destination.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder, EntryType, Header};
use tracing::{debug, warn};

use crate::{Error, Result};
use ghost_fs::LogicalPath;

/// Codec for building and extracting portable subtree snapshots.
pub struct ArchiveCodec;

/// One merge step applied to the destination, recorded so a later failure
/// can be undone in reverse order.
enum Applied {
    CreatedDir { target: PathBuf },
    CreatedFile { target: PathBuf },
    Replaced { target: PathBuf, parked: PathBuf },
}

impl ArchiveCodec {
    /// Build an archive containing exactly `paths`, read relative to
    /// `folder_root`. Entry paths are the logical paths themselves.
    ///
    /// Blocking; drivers call this off the reactor.
    pub fn pack(folder_root: &Path, paths: &[LogicalPath]) -> Result<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = Builder::new(encoder);

        for path in paths {
            let physical = folder_root.join(path.to_native());
            let mut file = File::open(&physical).map_err(|e| {
                Error::archive_with(format!("missing archive source {path}"), e)
            })?;
            let size = file
                .metadata()
                .map_err(|e| Error::archive_with(format!("stat failed for {path}"), e))?
                .len();

            // Portable header: no ownership, no timestamps, fixed mode
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(size);
            header.set_mode(0o644);
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);

            builder
                .append_data(&mut header, path.as_str(), &mut file)
                .map_err(|e| Error::archive_with(format!("failed to append {path}"), e))?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| Error::archive_with("failed to finish tar stream", e))?;
        encoder
            .finish()
            .map_err(|e| Error::archive_with("failed to finish gzip stream", e))
    }

    /// Unpack `archive` under `destination`, creating it if absent.
    ///
    /// Every entry is validated before anything is applied: only regular
    /// files and directories are accepted, and entry paths must stay under
    /// the root after normalization. Entries land in a staging directory
    /// inside `destination` and are merged only once the whole stream has
    /// been consumed. The merge itself is preflighted against conflicting
    /// destination entries and journaled, so a failure at any point rolls
    /// back and leaves `destination` as it was.
    ///
    /// Blocking; drivers call this off the reactor.
    pub fn unpack(archive: &[u8], destination: &Path) -> Result<()> {
        fs::create_dir_all(destination)
            .map_err(|e| Error::archive_with("failed to create destination", e))?;
        let staging = tempfile::tempdir_in(destination)
            .map_err(|e| Error::archive_with("failed to create staging directory", e))?;

        let mut reader = Archive::new(GzDecoder::new(archive));
        let mut extracted: Vec<LogicalPath> = Vec::new();
        let mut directories: Vec<LogicalPath> = Vec::new();

        for entry in reader
            .entries()
            .map_err(|e| Error::archive_with("unreadable archive stream", e))?
        {
            let mut entry =
                entry.map_err(|e| Error::archive_with("malformed archive entry", e))?;

            let kind = entry.header().entry_type();
            if !matches!(kind, EntryType::Regular | EntryType::Directory) {
                return Err(Error::archive(format!(
                    "archive entry has unsupported type {kind:?}"
                )));
            }

            let raw = entry
                .path()
                .map_err(|e| Error::archive_with("undecodable entry path", e))?
                .to_string_lossy()
                .into_owned();
            let logical = LogicalPath::new(&raw)
                .map_err(|_| Error::archive(format!("archive entry escapes root: {raw}")))?;

            // unpack_in re-checks containment against the staging root
            let applied = entry
                .unpack_in(staging.path())
                .map_err(|e| Error::archive_with(format!("failed to unpack {logical}"), e))?;
            if !applied {
                return Err(Error::archive(format!(
                    "archive entry escapes root: {raw}"
                )));
            }

            if kind == EntryType::Regular {
                extracted.push(logical);
            } else {
                directories.push(logical);
            }
        }

        // End of stream reached with every entry validated; merge into place
        Self::preflight(destination, &directories, &extracted)?;

        let parking = tempfile::tempdir_in(destination)
            .map_err(|e| Error::archive_with("failed to create rollback directory", e))?;
        let mut journal: Vec<Applied> = Vec::new();
        if let Err(e) = Self::merge(
            staging.path(),
            destination,
            parking.path(),
            &directories,
            &extracted,
            &mut journal,
        ) {
            Self::roll_back(&journal);
            return Err(e);
        }

        debug!(count = extracted.len(), destination = %destination.display(), "archive extracted");
        Ok(())
    }

    /// Reject the merge up front when any target path cannot take its
    /// entry, so nothing lands at all when part of the archive cannot.
    fn preflight(
        destination: &Path,
        directories: &[LogicalPath],
        files: &[LogicalPath],
    ) -> Result<()> {
        for logical in directories {
            let target = destination.join(logical.to_native());
            if target.exists() && !target.is_dir() {
                return Err(Error::archive(format!(
                    "destination entry {logical} is not a directory"
                )));
            }
        }
        for logical in files {
            let target = destination.join(logical.to_native());
            if target.is_dir() {
                return Err(Error::archive(format!(
                    "destination entry {logical} is a directory"
                )));
            }
            for ancestor in target.ancestors().skip(1) {
                if ancestor == destination {
                    break;
                }
                if ancestor.exists() && !ancestor.is_dir() {
                    return Err(Error::archive(format!(
                        "destination blocks ancestor of {logical}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Move staged entries into the destination, journaling every applied
    /// step. Replaced files are parked rather than overwritten so they can
    /// be restored.
    fn merge(
        staging: &Path,
        destination: &Path,
        parking: &Path,
        directories: &[LogicalPath],
        files: &[LogicalPath],
        journal: &mut Vec<Applied>,
    ) -> Result<()> {
        for logical in directories {
            let target = destination.join(logical.to_native());
            if !target.exists() {
                Self::create_ancestors(destination, &target, journal)
                    .map_err(|e| Error::archive_with(format!("failed to place {logical}"), e))?;
            }
        }
        for logical in files {
            let from = staging.join(logical.to_native());
            let to = destination.join(logical.to_native());
            if let Some(parent) = to.parent() {
                Self::create_ancestors(destination, parent, journal)
                    .map_err(|e| Error::archive_with(format!("failed to place {logical}"), e))?;
            }
            if to.exists() {
                let parked = parking.join(journal.len().to_string());
                fs::rename(&to, &parked)
                    .map_err(|e| Error::archive_with(format!("failed to place {logical}"), e))?;
                journal.push(Applied::Replaced { target: to.clone(), parked });
                fs::rename(&from, &to)
                    .map_err(|e| Error::archive_with(format!("failed to place {logical}"), e))?;
            } else {
                fs::rename(&from, &to)
                    .map_err(|e| Error::archive_with(format!("failed to place {logical}"), e))?;
                journal.push(Applied::CreatedFile { target: to });
            }
        }
        Ok(())
    }

    /// Create missing ancestors of `dir`, journaling the topmost directory
    /// actually created so rollback can remove the whole branch.
    fn create_ancestors(
        destination: &Path,
        dir: &Path,
        journal: &mut Vec<Applied>,
    ) -> std::io::Result<()> {
        if dir.exists() {
            return Ok(());
        }
        let mut top = dir.to_path_buf();
        while let Some(parent) = top.parent() {
            if parent == destination || parent.exists() {
                break;
            }
            top = parent.to_path_buf();
        }
        fs::create_dir_all(dir)?;
        journal.push(Applied::CreatedDir { target: top });
        Ok(())
    }

    /// Undo applied merge steps in reverse order. Best effort: a step that
    /// cannot be undone is logged, everything else is still restored.
    fn roll_back(journal: &[Applied]) {
        for step in journal.iter().rev() {
            let undone = match step {
                Applied::CreatedFile { target } => fs::remove_file(target),
                Applied::CreatedDir { target } => fs::remove_dir_all(target),
                Applied::Replaced { target, parked } => {
                    let _ = fs::remove_file(target);
                    fs::rename(parked, target)
                }
            };
            if let Err(e) = undone {
                let target = match step {
                    Applied::CreatedFile { target }
                    | Applied::CreatedDir { target }
                    | Applied::Replaced { target, .. } => target,
                };
                warn!(target = %target.display(), error = %e, "extraction rollback step failed");
            }
        }
    }
}
