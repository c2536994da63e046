use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::entry::FileEntry;
use crate::error::TfmError;

/// Default time-to-live for both listing and stat cache entries, per
/// the spec's remote-backend cache contract.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
enum Slot {
    Stat(Result<FileEntry, TfmError>),
    Listing(Result<Vec<FileEntry>, TfmError>),
}

struct Entry {
    slot: Slot,
    inserted_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// Per-authority TTL cache for `stat` and `list_directory` results.
///
/// Keys have the shape `authority:op:path`. A `list_directory` write also
/// populates one `stat:child` entry per child in the same pass -- the
/// bulk-stat optimization that turns the first `iterdir` + N `stat` calls
/// into a single network round-trip.
///
/// Safe for concurrent access from the UI thread and background workers:
/// all mutation goes through a single mutex held only for the duration of
/// the map operation.
pub struct RemoteCache {
    authority: String,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl RemoteCache {
    pub fn new(authority: impl Into<String>) -> Self {
        Self::with_ttl(authority, DEFAULT_TTL)
    }

    pub fn with_ttl(authority: impl Into<String>, ttl: Duration) -> Self {
        Self {
            authority: authority.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn stat_key(&self, normalized_path: &str) -> String {
        format!("{}:stat:{}", self.authority, normalized_path)
    }

    fn listing_key(&self, normalized_path: &str) -> String {
        format!("{}:list_directory:{}", self.authority, normalized_path)
    }

    pub fn get_stat(&self, normalized_path: &str) -> Option<Result<FileEntry, TfmError>> {
        let key = self.stat_key(normalized_path);
        let entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if !entry.is_expired() => match &entry.slot {
                Slot::Stat(result) => Some(result.clone()),
                Slot::Listing(_) => None,
            },
            _ => None,
        }
    }

    pub fn get_listing(&self, normalized_path: &str) -> Option<Result<Vec<FileEntry>, TfmError>> {
        let key = self.listing_key(normalized_path);
        let entries = self.entries.lock().unwrap();
        match entries.get(&key) {
            Some(entry) if !entry.is_expired() => match &entry.slot {
                Slot::Listing(result) => Some(result.clone()),
                Slot::Stat(_) => None,
            },
            _ => None,
        }
    }

    pub fn put_stat(&self, normalized_path: &str, result: Result<FileEntry, TfmError>) {
        let key = self.stat_key(normalized_path);
        self.entries.lock().unwrap().insert(
            key,
            Entry {
                slot: Slot::Stat(result),
                inserted_at: Instant::now(),
                ttl: self.ttl,
            },
        );
    }

    /// Writes the listing AND, for every successfully listed child, a
    /// `stat:child` entry -- the bulk-stat optimization described in the
    /// spec's cache subsystem.
    pub fn put_listing(&self, normalized_dir: &str, result: Result<Vec<FileEntry>, TfmError>) {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();

        if let Ok(children) = &result {
            for child in children {
                let child_key = join_normalized(normalized_dir, &child.name);
                entries.insert(
                    self.stat_key(&child_key),
                    Entry {
                        slot: Slot::Stat(Ok(child.clone())),
                        inserted_at: now,
                        ttl: self.ttl,
                    },
                );
            }
        }

        entries.insert(
            self.listing_key(normalized_dir),
            Entry {
                slot: Slot::Listing(result),
                inserted_at: now,
                ttl: self.ttl,
            },
        );
    }

    /// Invalidates the `list_directory` entry for `parent` and every `stat`
    /// entry for `path` or a descendant of it. Every mutating path
    /// operation must call this for the destination's parent (and the
    /// source's parent, for moves) before its result is observed.
    pub fn invalidate(&self, path: &str, parent: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&self.listing_key(parent));

        let stat_prefix = format!("{}:stat:", self.authority);
        let path_key = format!("{}{}", stat_prefix, path);
        let descendant_prefix = format!("{}{}/", stat_prefix, path);

        entries.retain(|key, _| {
            if !key.starts_with(&stat_prefix) {
                return true;
            }
            key != &path_key && !key.starts_with(&descendant_prefix)
        });
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn join_normalized(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn entry(name: &str) -> FileEntry {
        FileEntry::new(name.to_string(), false, 10, SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn bulk_stat_populates_children_from_one_listing() {
        let cache = RemoteCache::new("bucket");
        let children = vec![entry("a.txt"), entry("b.txt")];
        cache.put_listing("inbox", Ok(children));

        assert!(cache.get_listing("inbox").unwrap().is_ok());
        assert!(cache.get_stat("inbox/a.txt").unwrap().is_ok());
        assert!(cache.get_stat("inbox/b.txt").unwrap().is_ok());
        assert!(cache.get_stat("inbox/missing.txt").is_none());
    }

    #[test]
    fn negative_results_are_cached() {
        let cache = RemoteCache::new("bucket");
        cache.put_stat("gone.txt", Err(TfmError::NotFound("gone.txt".into())));
        let cached = cache.get_stat("gone.txt").unwrap();
        assert!(cached.is_err());
    }

    #[test]
    fn invalidate_removes_listing_and_descendants() {
        let cache = RemoteCache::new("bucket");
        cache.put_listing("inbox", Ok(vec![entry("a.txt")]));
        cache.put_stat("inbox/sub/nested.txt", Ok(entry("nested.txt")));

        cache.invalidate("inbox/a.txt", "inbox");

        assert!(cache.get_listing("inbox").is_none());
        assert!(cache.get_stat("inbox/a.txt").is_none());
        // descendant of a different child path is untouched
        assert!(cache.get_stat("inbox/sub/nested.txt").is_some());
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = RemoteCache::with_ttl("bucket", Duration::from_millis(1));
        cache.put_stat("f.txt", Ok(entry("f.txt")));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get_stat("f.txt").is_none());
    }
}
