use std::cmp::Ordering;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Type hint attached to an entry, used by dialogs and the column renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    Archive,
}

/// The decoded per-item result of `iterdir`/`stat`.
///
/// Produced by [`crate::fs_list::FileListManager`]; invalidated when the
/// owning directory's cache entry expires or an explicit invalidation event
/// fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    #[serde(with = "system_time_secs")]
    pub mtime: SystemTime,
    /// Permission bits: real on Local, synthesized (0o755/0o644) on
    /// backends that don't expose POSIX permissions directly.
    pub mode: u32,
    pub kind: EntryKind,
}

impl FileEntry {
    pub fn new(name: String, is_dir: bool, size: u64, mtime: SystemTime) -> Self {
        let kind = if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let mode = if is_dir { 0o755 } else { 0o644 };
        Self {
            name,
            is_dir,
            size,
            mtime,
            mode,
            kind,
        }
    }

    pub fn symlink(name: String, size: u64, mtime: SystemTime) -> Self {
        Self {
            kind: EntryKind::Symlink,
            ..Self::new(name, false, size, mtime)
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

mod system_time_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

/// Column to sort entries by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Mtime,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Sort + filter configuration applied by [`crate::fs_list::FileListManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub directories_first: bool,
    pub show_hidden: bool,
    pub filter_glob: Option<String>,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            sort_key: SortKey::Name,
            sort_order: SortOrder::Ascending,
            directories_first: true,
            show_hidden: false,
            filter_glob: None,
        }
    }
}

/// Case-insensitive, locale-agnostic name comparison, used both as the
/// primary name sort and as the universal tie-break.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn extension_of(name: &str) -> &str {
    name.rsplit('.').next().filter(|ext| *ext != name).unwrap_or("")
}

/// Sorts `entries` in place per `config`. Tie-break is always
/// case-insensitive name ascending, regardless of the configured order.
pub fn sort_entries(entries: &mut [FileEntry], config: &ListConfig) {
    let key = config.sort_key;
    let order = config.sort_order;

    let cmp = |a: &FileEntry, b: &FileEntry| -> Ordering {
        let primary = match key {
            SortKey::Name => compare_names(&a.name, &b.name),
            SortKey::Size => a.size.cmp(&b.size),
            SortKey::Mtime => a.mtime.cmp(&b.mtime),
            SortKey::Type => extension_of(&a.name)
                .to_lowercase()
                .cmp(&extension_of(&b.name).to_lowercase()),
        };
        let primary = if order == SortOrder::Descending {
            primary.reverse()
        } else {
            primary
        };
        primary.then_with(|| compare_names(&a.name, &b.name))
    };

    if config.directories_first {
        entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => cmp(a, b),
        });
    } else {
        entries.sort_by(cmp);
    }
}

/// Applies the optional glob filter and hidden-file toggle.
pub fn filter_entries(entries: Vec<FileEntry>, config: &ListConfig) -> Vec<FileEntry> {
    let pattern = config
        .filter_glob
        .as_deref()
        .and_then(|p| glob::Pattern::new(p).ok());

    entries
        .into_iter()
        .filter(|entry| config.show_hidden || !entry.is_hidden())
        .filter(|entry| match &pattern {
            Some(p) => p.matches(&entry.name),
            None => true,
        })
        .collect()
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
