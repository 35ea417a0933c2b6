//! Trackable-folder discovery
//!
//! Derives which top-level directories under a store root participate in
//! synchronization. A single `.noghost` marker file anywhere inside a
//! top-level directory excludes that whole tree from the trackable set,
//! giving content authors a file-based opt-out with no configuration
//! elsewhere. The set is derived on each scan, never persisted.

use std::collections::HashSet;

use ghost_fs::LogicalPath;

/// Reserved opt-out marker file name, matched case-insensitively
pub const NOGHOST_MARKER: &str = ".noghost";

/// Compute the trackable top-level directories from a full recursive
/// listing (dot-files included, no exclusions).
///
/// Files sitting directly at the root belong to no top-level directory and
/// do not contribute to the set.
pub fn discover_trackable_folders_in(listing: &[LogicalPath]) -> HashSet<String> {
    let mut all: HashSet<String> = HashSet::new();
    let mut opted_out: HashSet<String> = HashSet::new();

    for path in listing {
        // Only paths inside a top-level directory count
        if path.parent().is_none() {
            continue;
        }
        let Some(top) = path.top_level() else {
            continue;
        };

        all.insert(top.to_string());
        if path
            .file_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(NOGHOST_MARKER))
        {
            opted_out.insert(top.to_string());
        }
    }

    all.difference(&opted_out).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(paths: &[&str]) -> Vec<LogicalPath> {
        paths.iter().map(|p| LogicalPath::new(p).unwrap()).collect()
    }

    #[test]
    fn marker_excludes_its_top_level_directory() {
        let folders = discover_trackable_folders_in(&listing(&[
            "a/x.txt",
            "b/y.txt",
            "b/.noghost",
        ]));
        assert_eq!(folders, HashSet::from(["a".to_string()]));
    }

    #[test]
    fn marker_depth_does_not_matter() {
        let folders = discover_trackable_folders_in(&listing(&[
            "a/x.txt",
            "b/deep/nested/tree/.noghost",
            "b/y.txt",
        ]));
        assert_eq!(folders, HashSet::from(["a".to_string()]));
    }

    #[test]
    fn marker_name_is_case_insensitive() {
        let folders = discover_trackable_folders_in(&listing(&["b/.NoGhost", "b/y.txt"]));
        assert!(folders.is_empty());
    }

    #[test]
    fn root_level_files_contribute_nothing() {
        let folders = discover_trackable_folders_in(&listing(&["readme.md", "a/x.txt"]));
        assert_eq!(folders, HashSet::from(["a".to_string()]));
    }

    #[test]
    fn empty_listing_yields_empty_set() {
        assert!(discover_trackable_folders_in(&[]).is_empty());
    }

    #[test]
    fn similarly_named_file_is_not_a_marker() {
        let folders = discover_trackable_folders_in(&listing(&["b/noghost.txt", "b/y.txt"]));
        assert_eq!(folders, HashSet::from(["b".to_string()]));
    }
}
