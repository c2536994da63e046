//! Dual-pane state: which side is active, each side's directory listing
//! and selection, and the per-directory cursor-history stack used to
//! restore the cursor when the user navigates back out of a directory.

use crate::error::Result;
use crate::fs_list::FileListManager;
use crate::path::Path;
use crate::state::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneSide {
    Left,
    Right,
}

impl PaneSide {
    pub fn opposite(self) -> Self {
        match self {
            PaneSide::Left => PaneSide::Right,
            PaneSide::Right => PaneSide::Left,
        }
    }
}

/// One `(directory, selected name, scroll offset)` checkpoint, pushed when
/// the user descends into a child directory and popped (to restore the
/// cursor) when they go back up. Resolved as an Open Question: a plain
/// list of triples rather than a nested tree, since panes only ever
/// unwind history in the order it was pushed.
type CursorCheckpoint = (Path, String, usize);

const MAX_CURSOR_HISTORY: usize = 256;

pub struct PaneState {
    pub path: Path,
    pub manager: FileListManager,
    pub selection: Vec<usize>,
    pub cursor: usize,
    pub scroll_offset: usize,
    cursor_history: Vec<CursorCheckpoint>,
    /// Long-lived breadcrumb trail, separate from `cursor_history`: this
    /// one carries a timestamp and is what gets written into the
    /// persisted session state, not used for in-session cursor restore.
    persisted_history: Vec<HistoryEntry>,
}

impl PaneState {
    pub fn new(path: Path) -> Self {
        Self {
            manager: FileListManager::new(path.clone()),
            path,
            selection: Vec::new(),
            cursor: 0,
            scroll_offset: 0,
            cursor_history: Vec::new(),
            persisted_history: Vec::new(),
        }
    }

    pub fn persisted_history(&self) -> &[HistoryEntry] {
        &self.persisted_history
    }

    pub fn reload(&mut self) -> Result<()> {
        self.manager.reload()
    }

    /// Descends into `child`, remembering the current directory, cursor
    /// position, and scroll offset so [`Self::navigate_up`] can restore
    /// them.
    pub fn navigate_into(&mut self, child: Path) -> Result<()> {
        let current_name = self
            .manager
            .entries()
            .get(self.cursor)
            .map(|e| e.name.clone())
            .unwrap_or_default();
        self.cursor_history.push((self.path.clone(), current_name.clone(), self.scroll_offset));
        if self.cursor_history.len() > MAX_CURSOR_HISTORY {
            self.cursor_history.remove(0);
        }

        let timestamp_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.persisted_history.push(HistoryEntry {
            timestamp_secs,
            directory: self.path.render(),
            last_cursor_name: current_name,
        });
        if self.persisted_history.len() > crate::state::MAX_PERSISTED_HISTORY {
            self.persisted_history.remove(0);
        }

        self.manager.navigate_to(child.clone())?;
        self.path = child;
        self.selection.clear();
        self.cursor = 0;
        self.scroll_offset = 0;
        Ok(())
    }

    /// Goes to the parent directory. If the parent was previously visited
    /// via [`Self::navigate_into`], the cursor and scroll offset are
    /// restored to where they were before descending.
    pub fn navigate_up(&mut self) -> Result<bool> {
        let Some(parent) = self.path.parent() else {
            return Ok(false);
        };
        self.manager.navigate_to(parent.clone())?;
        self.path = parent;
        self.selection.clear();

        if let Some((checkpoint_dir, name, scroll)) = self.cursor_history.pop() {
            if checkpoint_dir == self.path {
                self.cursor = self.manager.index_of(&name).unwrap_or(0);
                self.scroll_offset = scroll;
                return Ok(true);
            }
        }
        self.cursor = 0;
        self.scroll_offset = 0;
        Ok(true)
    }

    pub fn select(&mut self, index: usize) {
        if !self.selection.contains(&index) {
            self.selection.push(index);
        }
    }

    pub fn toggle_selection(&mut self, index: usize) {
        if let Some(pos) = self.selection.iter().position(|&i| i == index) {
            self.selection.remove(pos);
        } else {
            self.selection.push(index);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected_entries(&self) -> Vec<&crate::entry::FileEntry> {
        let entries = self.manager.entries();
        self.selection.iter().filter_map(|&i| entries.get(i)).collect()
    }

    /// The selected paths, or the cursor's path if nothing is explicitly
    /// selected -- the common "operate on what's under the cursor" case.
    pub fn selected_paths(&self) -> Vec<Path> {
        if self.selection.is_empty() {
            self.manager
                .entries()
                .get(self.cursor)
                .map(|e| vec![self.path.join(&e.name)])
                .unwrap_or_default()
        } else {
            self.selected_entries()
                .into_iter()
                .map(|e| self.path.join(&e.name))
                .collect()
        }
    }
}

pub struct DualPane {
    pub left: PaneState,
    pub right: PaneState,
    active: PaneSide,
}

impl DualPane {
    pub fn new(left: Path, right: Path) -> Self {
        Self {
            left: PaneState::new(left),
            right: PaneState::new(right),
            active: PaneSide::Left,
        }
    }

    pub fn active_side(&self) -> PaneSide {
        self.active
    }

    pub fn active_pane(&self) -> &PaneState {
        match self.active {
            PaneSide::Left => &self.left,
            PaneSide::Right => &self.right,
        }
    }

    pub fn active_pane_mut(&mut self) -> &mut PaneState {
        match self.active {
            PaneSide::Left => &mut self.left,
            PaneSide::Right => &mut self.right,
        }
    }

    pub fn inactive_pane(&self) -> &PaneState {
        match self.active {
            PaneSide::Left => &self.right,
            PaneSide::Right => &self.left,
        }
    }

    pub fn switch_active(&mut self) {
        self.active = self.active.opposite();
    }

    /// Points the inactive pane at the active pane's directory -- the
    /// common "copy to the directory I'm looking at" shortcut.
    pub fn sync_panes(&mut self) -> Result<()> {
        let target = self.active_pane().path.clone();
        match self.active {
            PaneSide::Left => self.right.navigate_into_absolute(target),
            PaneSide::Right => self.left.navigate_into_absolute(target),
        }
    }

    pub fn destination_path(&self) -> &Path {
        &self.inactive_pane().path
    }
}

impl PaneState {
    /// Like [`Self::navigate_into`] but doesn't treat `target` as a
    /// descendant of the current directory, so no cursor-history
    /// checkpoint is pushed.
    fn navigate_into_absolute(&mut self, target: Path) -> Result<()> {
        self.manager.navigate_to(target.clone())?;
        self.path = target;
        self.selection.clear();
        self.cursor = 0;
        self.scroll_offset = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn opposite_toggles_side() {
        assert_eq!(PaneSide::Left.opposite(), PaneSide::Right);
        assert_eq!(PaneSide::Right.opposite(), PaneSide::Left);
    }

    #[test]
    fn navigate_into_records_a_persisted_history_breadcrumb() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("child");
        fs::create_dir(&sub).unwrap();

        let mut pane = PaneState::new(Path::local(dir.path()));
        pane.reload().unwrap();
        pane.navigate_into(Path::local(&sub)).unwrap();

        let history = pane.persisted_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].directory, Path::local(&sub).render());
    }

    #[test]
    fn navigate_into_then_up_restores_cursor_on_matching_name() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        let sub = dir.path().join("beta");
        fs::write(sub.join("file.txt"), b"x").unwrap();

        let mut pane = PaneState::new(Path::local(dir.path()));
        pane.reload().unwrap();
        pane.cursor = pane.manager.index_of("beta").unwrap();

        pane.navigate_into(Path::local(&sub)).unwrap();
        assert_eq!(pane.path, Path::local(&sub));

        pane.navigate_up().unwrap();
        assert_eq!(pane.manager.entries()[pane.cursor].name, "beta");
    }

    #[test]
    fn switch_active_swaps_active_pane() {
        let dir = tempdir().unwrap();
        let mut dual = DualPane::new(Path::local(dir.path()), Path::local(dir.path()));
        assert_eq!(dual.active_side(), PaneSide::Left);
        dual.switch_active();
        assert_eq!(dual.active_side(), PaneSide::Right);
    }

    #[test]
    fn selected_paths_falls_back_to_cursor_when_nothing_selected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("only.txt"), b"x").unwrap();
        let mut pane = PaneState::new(Path::local(dir.path()));
        pane.reload().unwrap();

        let paths = pane.selected_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].name(), "only.txt");
    }
}
