//! Data source for the jump dialog: a fast recursive scan of directories
//! under a root, used to let the user type a few characters and land
//! anywhere in a deep tree without manual navigation.
//!
//! Local-only and synchronous -- jumping into a remote tree means the
//! dialog falls back to one-level-at-a-time navigation instead, since a
//! parallel recursive walk over SFTP/S3 would need its own connection
//! pool and cancellation story, which duplicates what the search
//! subsystem already owns.

use jwalk::WalkDir;

use crate::path::Path;

/// One entry in the jump candidate list: an absolute local directory path
/// and the depth it was found at, for ranking shallower matches first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpTarget {
    pub path: String,
    pub depth: usize,
}

/// Walks `root` (which must be a local directory) breadth-sensibly up to
/// `max_depth` levels, collecting every directory found. `jwalk` spreads
/// the walk across threads internally, which is the point: this is meant
/// to stay responsive even rooted at a home directory with tens of
/// thousands of subdirectories.
pub fn scan(root: &Path, max_depth: usize) -> Vec<JumpTarget> {
    let Some(root_path) = root.as_local_path() else {
        return Vec::new();
    };

    WalkDir::new(root_path)
        .max_depth(max_depth)
        .skip_hidden(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| JumpTarget {
            path: entry.path().to_string_lossy().to_string(),
            depth: entry.depth,
        })
        .collect()
}

/// Case-insensitive substring filter over scanned targets, shallowest
/// matches first -- the same tie-break the list dialog uses elsewhere.
pub fn filter(targets: &[JumpTarget], query: &str) -> Vec<JumpTarget> {
    let needle = query.to_lowercase();
    let mut matches: Vec<JumpTarget> = targets
        .iter()
        .filter(|t| needle.is_empty() || t.path.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    matches.sort_by_key(|t| t.depth);
    matches
}
