//! Persists the bits of UI state that should survive a restart: window
//! geometry, each pane's current directory, cursor position, sort
//! settings, and a bounded navigation history, plus a handful of
//! user preferences. Writes are atomic (write-to-temp, then rename) and
//! debounced so rapid navigation doesn't hit disk on every keystroke.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::entry::{SortKey, SortOrder};

pub const STATE_VERSION: u32 = 1;
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_secs(1);

/// Cap on the persisted history log, distinct from [`crate::pane::PaneState`]'s
/// in-memory navigation stack -- this one is a long-lived breadcrumb trail
/// written to disk, not the live "restore cursor on navigate-up" stack.
pub const MAX_PERSISTED_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub maximized: bool,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self { x: 0, y: 0, width: 120, height: 40, maximized: false }
    }
}

/// One breadcrumb: when a directory was entered and what the cursor was
/// on last time the pane left it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub timestamp_secs: u64,
    pub directory: String,
    pub last_cursor_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaneSnapshot {
    pub directory: String,
    pub cursor: usize,
    pub scroll: usize,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub history: Vec<HistoryEntry>,
}

impl Default for PaneSnapshot {
    fn default() -> Self {
        Self {
            directory: default_start_dir(),
            cursor: 0,
            scroll: 0,
            sort_key: SortKey::default(),
            sort_order: SortOrder::default(),
            history: Vec::new(),
        }
    }
}

impl PaneSnapshot {
    /// Appends a breadcrumb, dropping the oldest once [`MAX_PERSISTED_HISTORY`]
    /// is exceeded.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > MAX_PERSISTED_HISTORY {
            self.history.remove(0);
        }
    }

    /// Drops breadcrumbs pointing at local directories that no longer
    /// exist. Remote (`s3://`, `ssh://`) entries are left alone -- a
    /// startup existence check would mean blocking on the network before
    /// the first frame draws.
    pub fn purge_stale_local_history(&mut self) {
        self.history.retain(|entry| {
            if entry.directory.contains("://") {
                return true;
            }
            std::path::Path::new(&entry.directory).is_dir()
        });
    }
}

fn default_start_dir() -> String {
    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "/".to_string())
}

/// Preferences the core persists but, per `color_scheme`, does not itself
/// interpret -- the rendering backend owns color schemes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub show_hidden: bool,
    pub sort_by: SortKey,
    pub color_scheme: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { show_hidden: false, sort_by: SortKey::default(), color_scheme: "default".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,
    pub window: WindowGeometry,
    pub left: PaneSnapshot,
    pub right: PaneSnapshot,
    pub preferences: Preferences,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            window: WindowGeometry::default(),
            left: PaneSnapshot::default(),
            right: PaneSnapshot::default(),
            preferences: Preferences::default(),
        }
    }
}

impl StateSnapshot {
    pub fn purge_stale_local_history(&mut self) {
        self.left.purge_stale_local_history();
        self.right.purge_stale_local_history();
    }
}

/// Loads, debounces, and atomically saves a [`StateSnapshot`] at a fixed
/// path (normally `~/.tfm/state.json`).
pub struct StateManager {
    path: PathBuf,
    last_saved_at: Mutex<Option<Instant>>,
}

impl StateManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path, last_saved_at: Mutex::new(None) }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tfm")
            .join("state.json")
    }

    /// On a missing file, returns defaults silently. On a corrupt file,
    /// backs it up to `state.json.bad` and returns defaults rather than
    /// failing startup. On a version mismatch, falls back to the default
    /// for any snapshot newer than what this build understands; older
    /// versions are accepted as-is since every field so far has kept its
    /// meaning across the only version that has shipped.
    pub fn load(&self) -> StateSnapshot {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return StateSnapshot::default(),
        };
        match serde_json::from_str::<StateSnapshot>(&raw) {
            Ok(snapshot) if snapshot.version <= STATE_VERSION => snapshot,
            Ok(_) => StateSnapshot::default(),
            Err(_) => {
                let backup = self.path.with_extension("json.bad");
                let _ = std::fs::rename(&self.path, backup);
                StateSnapshot::default()
            }
        }
    }

    /// Writes immediately, ignoring the debounce window. Use on clean
    /// shutdown so the final state is never lost to a pending debounce.
    pub fn save_now(&self, snapshot: &StateSnapshot) -> crate::error::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::error::TfmError::io)?;
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| crate::error::TfmError::BadFormat(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut temp_file =
                std::fs::File::create(&temp_path).map_err(crate::error::TfmError::io)?;
            temp_file.write_all(json.as_bytes()).map_err(crate::error::TfmError::io)?;
            temp_file.sync_all().map_err(crate::error::TfmError::io)?;
        }
        std::fs::rename(&temp_path, &self.path).map_err(crate::error::TfmError::io)?;
        *self.last_saved_at.lock().unwrap() = Some(Instant::now());
        Ok(())
    }

    /// Writes only if [`DEBOUNCE_INTERVAL`] has elapsed since the last
    /// save; otherwise a no-op. Callers on a UI event loop can call this
    /// after every state change without worrying about save frequency.
    pub fn save_debounced(&self, snapshot: &StateSnapshot) -> crate::error::Result<()> {
        let should_save = {
            let last = self.last_saved_at.lock().unwrap();
            match *last {
                Some(instant) => instant.elapsed() >= DEBOUNCE_INTERVAL,
                None => true,
            }
        };
        if should_save {
            self.save_now(snapshot)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path().join("state.json"));
        let mut snapshot = StateSnapshot::default();
        snapshot.left.directory = "/tmp/left".to_string();
        snapshot.left.cursor = 3;
        snapshot.window.width = 200;
        manager.save_now(&snapshot).unwrap();

        let loaded = manager.load();
        assert_eq!(loaded.left.directory, "/tmp/left");
        assert_eq!(loaded.left.cursor, 3);
        assert_eq!(loaded.window.width, 200);
        assert_eq!(loaded.version, STATE_VERSION);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path().join("does-not-exist.json"));
        let loaded = manager.load();
        assert_eq!(loaded.version, STATE_VERSION);
    }

    #[test]
    fn corrupt_file_is_backed_up_and_defaults_are_returned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not valid json").unwrap();

        let manager = StateManager::new(path.clone());
        let loaded = manager.load();
        assert_eq!(loaded.version, STATE_VERSION);
        assert!(path.with_extension("json.bad").exists());
    }

    #[test]
    fn debounced_save_is_skipped_within_the_window() {
        let dir = tempdir().unwrap();
        let manager = StateManager::new(dir.path().join("state.json"));
        let snapshot = StateSnapshot::default();

        manager.save_now(&snapshot).unwrap();
        let written_at = std::fs::metadata(&manager.path).unwrap().modified().unwrap();

        manager.save_debounced(&snapshot).unwrap();
        let still_same = std::fs::metadata(&manager.path).unwrap().modified().unwrap();
        assert_eq!(written_at, still_same);
    }

    #[test]
    fn history_log_is_capped_at_the_persisted_limit() {
        let mut pane = PaneSnapshot::default();
        for i in 0..(MAX_PERSISTED_HISTORY + 10) {
            pane.push_history(HistoryEntry {
                timestamp_secs: i as u64,
                directory: format!("/tmp/{i}"),
                last_cursor_name: "x".to_string(),
            });
        }
        assert_eq!(pane.history.len(), MAX_PERSISTED_HISTORY);
        assert_eq!(pane.history.first().unwrap().timestamp_secs, 10);
    }

    #[test]
    fn purge_drops_missing_local_dirs_but_keeps_remote_entries() {
        let dir = tempdir().unwrap();
        let mut pane = PaneSnapshot::default();
        pane.push_history(HistoryEntry {
            timestamp_secs: 1,
            directory: dir.path().to_string_lossy().to_string(),
            last_cursor_name: "a".to_string(),
        });
        pane.push_history(HistoryEntry {
            timestamp_secs: 2,
            directory: "/definitely/not/a/real/path".to_string(),
            last_cursor_name: "b".to_string(),
        });
        pane.push_history(HistoryEntry {
            timestamp_secs: 3,
            directory: "s3://bucket/whatever".to_string(),
            last_cursor_name: "c".to_string(),
        });

        pane.purge_stale_local_history();

        let remaining: Vec<&str> = pane.history.iter().map(|h| h.directory.as_str()).collect();
        assert!(remaining.contains(&dir.path().to_string_lossy().as_ref()));
        assert!(remaining.contains(&"s3://bucket/whatever"));
        assert!(!remaining.iter().any(|d| *d == "/definitely/not/a/real/path"));
    }
}
