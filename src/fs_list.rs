//! Applies [`ListConfig`] sort/filter rules on top of a directory's raw
//! [`crate::path::Path::iterdir`] result and keeps the materialized list
//! around so a pane can re-sort or re-filter without another round trip
//! to a remote backend.

use crate::entry::{filter_entries, sort_entries, FileEntry, ListConfig};
use crate::error::Result;
use crate::path::Path;

/// One directory's listing, sorted and filtered per its [`ListConfig`].
///
/// Reload is the only network-touching operation; everything else
/// (`set_config`, `entries`) works against the last materialized list.
pub struct FileListManager {
    dir: Path,
    config: ListConfig,
    entries: Vec<FileEntry>,
}

impl FileListManager {
    pub fn new(dir: Path) -> Self {
        Self {
            dir,
            config: ListConfig::default(),
            entries: Vec::new(),
        }
    }

    pub fn with_config(dir: Path, config: ListConfig) -> Self {
        Self {
            dir,
            config,
            entries: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Re-lists `self.dir`, then applies the current sort/filter. On
    /// error the previous entries are left untouched so a transient
    /// network failure doesn't blank out the pane.
    pub fn reload(&mut self) -> Result<()> {
        let raw: Result<Vec<FileEntry>> = self.dir.iterdir()?.collect();
        let raw = raw?;
        self.entries = filter_entries(raw, &self.config);
        sort_entries(&mut self.entries, &self.config);
        Ok(())
    }

    /// Moves to a new directory and reloads. On failure the manager stays
    /// pointed at the new (possibly inaccessible) directory with an empty
    /// entry list -- callers surface the error and can navigate back.
    pub fn navigate_to(&mut self, dir: Path) -> Result<()> {
        self.dir = dir;
        self.entries.clear();
        self.reload()
    }

    pub fn set_config(&mut self, config: ListConfig) {
        self.config = config;
        let mut entries = std::mem::take(&mut self.entries);
        sort_entries(&mut entries, &self.config);
        self.entries = entries;
    }

    /// Clicking the same column twice toggles direction; clicking a
    /// different column switches to it ascending.
    pub fn set_sort_key(&mut self, key: crate::entry::SortKey) {
        if self.config.sort_key == key {
            self.config.sort_order = self.config.sort_order.toggled();
        } else {
            self.config.sort_key = key;
            self.config.sort_order = crate::entry::SortOrder::Ascending;
        }
        sort_entries(&mut self.entries, &self.config);
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }
}
