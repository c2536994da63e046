//! Dual-pane directory tree diff. Walks two directory trees side by
//! side, flagging names present on only one side or differing in kind
//! or size; Left/Right arrows switch which side's listing is in focus,
//! Shift+Left/Shift+Right collapse/expand the focused node's subtree,
//! and Enter toggles a single node.

use std::collections::BTreeMap;

use crate::entry::FileEntry;
use crate::path::Path;
use crate::ui::{EventOutcome, Key, KeyEvent, MouseEvent, UILayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Same,
    LeftOnly,
    RightOnly,
    Differs,
}

#[derive(Debug, Clone)]
pub struct DiffNode {
    pub name: String,
    pub is_dir: bool,
    pub status: DiffStatus,
    pub children: Vec<DiffNode>,
    pub expanded: bool,
}

fn listing(dir: &Path) -> BTreeMap<String, FileEntry> {
    dir.iterdir()
        .map(|entries| entries.filter_map(|entry| entry.ok()).map(|entry| (entry.name.clone(), entry)).collect())
        .unwrap_or_default()
}

fn diff_dirs(left: &Path, right: &Path) -> Vec<DiffNode> {
    let left_entries = listing(left);
    let right_entries = listing(right);

    let mut names: Vec<&String> = left_entries.keys().chain(right_entries.keys()).collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let left_entry = left_entries.get(name);
            let right_entry = right_entries.get(name);
            let is_dir = left_entry.or(right_entry).map(|e| e.is_dir).unwrap_or(false);
            let status = match (left_entry, right_entry) {
                (Some(_), None) => DiffStatus::LeftOnly,
                (None, Some(_)) => DiffStatus::RightOnly,
                (Some(l), Some(r)) if l.is_dir != r.is_dir || l.size != r.size => DiffStatus::Differs,
                _ => DiffStatus::Same,
            };
            let children = if is_dir { diff_dirs(&left.join(name), &right.join(name)) } else { Vec::new() };
            DiffNode { name: name.clone(), is_dir, status, children, expanded: false }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSide {
    Left,
    Right,
}

pub struct DirectoryDiffViewer {
    left_root: Path,
    right_root: Path,
    nodes: Vec<DiffNode>,
    cursor: usize,
    active_side: DiffSide,
    dirty: bool,
    finished: bool,
}

impl DirectoryDiffViewer {
    pub fn new(left_root: Path, right_root: Path) -> Self {
        let nodes = diff_dirs(&left_root, &right_root);
        Self { left_root, right_root, nodes, cursor: 0, active_side: DiffSide::Left, dirty: true, finished: false }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn active_side(&self) -> DiffSide {
        self.active_side
    }

    /// `(depth, node)` pairs in display order, skipping the children of
    /// any collapsed directory.
    fn visible_rows(&self) -> Vec<(usize, &DiffNode)> {
        fn walk<'a>(nodes: &'a [DiffNode], depth: usize, out: &mut Vec<(usize, &'a DiffNode)>) {
            for node in nodes {
                out.push((depth, node));
                if node.is_dir && node.expanded {
                    walk(&node.children, depth + 1, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, 0, &mut out);
        out
    }

    fn set_expanded_at_cursor(&mut self, expanded: bool) {
        let target = self.cursor;
        fn walk_mut(nodes: &mut [DiffNode], counter: &mut usize, target: usize, expanded: bool) -> bool {
            for node in nodes.iter_mut() {
                if *counter == target {
                    if node.is_dir {
                        node.expanded = expanded;
                    }
                    return true;
                }
                *counter += 1;
                if node.is_dir && node.expanded && walk_mut(&mut node.children, counter, target, expanded) {
                    return true;
                }
            }
            false
        }
        let mut counter = 0;
        walk_mut(&mut self.nodes, &mut counter, target, expanded);
    }

    fn toggle_expanded_at_cursor(&mut self) {
        let current = self.visible_rows().get(self.cursor).map(|(_, node)| node.expanded);
        if let Some(expanded) = current {
            self.set_expanded_at_cursor(!expanded);
        }
    }
}

impl UILayer for DirectoryDiffViewer {
    fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        self.dirty = true;
        match event.key {
            Key::Up => self.cursor = self.cursor.saturating_sub(1),
            Key::Down => {
                let count = self.visible_rows().len();
                if count > 0 {
                    self.cursor = (self.cursor + 1).min(count - 1);
                }
            }
            Key::Left if event.modifiers.shift => self.set_expanded_at_cursor(false),
            Key::Right if event.modifiers.shift => self.set_expanded_at_cursor(true),
            Key::Left => self.active_side = DiffSide::Left,
            Key::Right => self.active_side = DiffSide::Right,
            Key::Enter => self.toggle_expanded_at_cursor(),
            Key::Escape => self.finished = true,
            _ => return EventOutcome::Ignored,
        }
        EventOutcome::Consumed
    }

    fn on_mouse(&mut self, _event: MouseEvent) -> EventOutcome {
        EventOutcome::Consumed
    }

    fn is_full_screen(&self) -> bool {
        true
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn render(&self, frame: &mut dyn std::fmt::Write) {
        let _ = writeln!(frame, "{}  |  {}", self.left_root.render(), self.right_root.render());
        for (position, (depth, node)) in self.visible_rows().into_iter().enumerate() {
            let marker = if position == self.cursor { ">" } else { " " };
            let indent = "  ".repeat(depth);
            let status = match node.status {
                DiffStatus::Same => ' ',
                DiffStatus::LeftOnly => '<',
                DiffStatus::RightOnly => '>',
                DiffStatus::Differs => '!',
            };
            let fold = if node.is_dir { if node.expanded { '-' } else { '+' } } else { ' ' };
            let _ = writeln!(frame, "{marker} {status} {indent}{fold}{}", node.name);
        }
        let _ = writeln!(frame, "-- active: {:?}", self.active_side);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn no_mods() -> crate::ui::Modifiers {
        crate::ui::Modifiers { shift: false, ctrl: false, alt: false }
    }

    fn shift() -> crate::ui::Modifiers {
        crate::ui::Modifiers { shift: true, ctrl: false, alt: false }
    }

    #[test]
    fn names_present_only_on_one_side_are_flagged() {
        let left = tempdir().unwrap();
        let right = tempdir().unwrap();
        fs::write(left.path().join("only_left.txt"), b"x").unwrap();
        fs::write(right.path().join("only_right.txt"), b"x").unwrap();

        let viewer = DirectoryDiffViewer::new(Path::local(left.path()), Path::local(right.path()));
        let rows = viewer.visible_rows();
        let only_left = rows.iter().find(|(_, n)| n.name == "only_left.txt").unwrap().1;
        let only_right = rows.iter().find(|(_, n)| n.name == "only_right.txt").unwrap().1;
        assert_eq!(only_left.status, DiffStatus::LeftOnly);
        assert_eq!(only_right.status, DiffStatus::RightOnly);
    }

    #[test]
    fn differing_sizes_are_flagged_as_differs() {
        let left = tempdir().unwrap();
        let right = tempdir().unwrap();
        fs::write(left.path().join("same_name.txt"), b"short").unwrap();
        fs::write(right.path().join("same_name.txt"), b"much longer content").unwrap();

        let viewer = DirectoryDiffViewer::new(Path::local(left.path()), Path::local(right.path()));
        let node = &viewer.visible_rows()[0].1;
        assert_eq!(node.status, DiffStatus::Differs);
    }

    #[test]
    fn right_arrow_switches_active_side() {
        let left = tempdir().unwrap();
        let right = tempdir().unwrap();
        let mut viewer = DirectoryDiffViewer::new(Path::local(left.path()), Path::local(right.path()));
        viewer.on_key(KeyEvent { key: Key::Right, modifiers: no_mods() });
        assert_eq!(viewer.active_side(), DiffSide::Right);
    }

    #[test]
    fn shift_right_expands_the_focused_directory() {
        let left = tempdir().unwrap();
        let right = tempdir().unwrap();
        fs::create_dir(left.path().join("sub")).unwrap();
        fs::create_dir(right.path().join("sub")).unwrap();
        fs::write(left.path().join("sub/inner.txt"), b"x").unwrap();

        let mut viewer = DirectoryDiffViewer::new(Path::local(left.path()), Path::local(right.path()));
        assert_eq!(viewer.visible_rows().len(), 1);

        viewer.on_key(KeyEvent { key: Key::Right, modifiers: shift() });
        assert_eq!(viewer.visible_rows().len(), 2);
    }
}
