//! Hosts `ops::jump::scan`/`filter` and presents the scanned candidate
//! directories through a [`ListDialog`], whose embedded filter field
//! does the live narrowing -- `scan` is the one-shot, possibly-slow
//! walk; `filter`'s shallow-first ranking runs once up front to decide
//! the list's initial order.

use crate::ops::jump::{self, JumpTarget};
use crate::path::Path;
use crate::ui::layers::dialogs::{ListDialog, ListDialogResult};
use crate::ui::{CharEvent, EventOutcome, KeyEvent, MouseEvent, UILayer};

#[derive(Debug)]
pub enum JumpOutcome {
    Go(Path),
    Cancelled,
}

pub struct JumpDialog {
    targets: Vec<JumpTarget>,
    list: ListDialog,
}

impl JumpDialog {
    pub fn new(root: &Path, max_depth: usize) -> Self {
        let scanned = jump::scan(root, max_depth);
        let targets = jump::filter(&scanned, "");
        let items = targets.iter().map(|t| t.path.clone()).collect();
        Self { targets, list: ListDialog::new("Jump to", items) }
    }

    pub fn is_finished(&self) -> bool {
        self.list.is_finished()
    }

    pub fn outcome(&self) -> Option<JumpOutcome> {
        match self.list.result {
            Some(ListDialogResult::Chosen(index)) => {
                self.targets.get(index).map(|target| JumpOutcome::Go(Path::local(&target.path)))
            }
            Some(ListDialogResult::Cancelled) => Some(JumpOutcome::Cancelled),
            None => None,
        }
    }
}

impl UILayer for JumpDialog {
    fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        self.list.on_key(event)
    }

    fn on_char(&mut self, event: CharEvent) -> EventOutcome {
        self.list.on_char(event)
    }

    fn on_mouse(&mut self, event: MouseEvent) -> EventOutcome {
        self.list.on_mouse(event)
    }

    fn is_full_screen(&self) -> bool {
        true
    }

    fn is_dirty(&self) -> bool {
        self.list.is_dirty()
    }

    fn render(&self, frame: &mut dyn std::fmt::Write) {
        self.list.render(frame)
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

    use crate::ui::{Key, KeyEvent, Modifiers};

    fn no_mods() -> Modifiers {
        Modifiers { shift: false, ctrl: false, alt: false }
    }

    #[test]
    fn enter_resolves_to_the_scanned_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("alpha")).unwrap();
        let mut dialog = JumpDialog::new(&Path::local(dir.path()), 5);

        dialog.on_key(KeyEvent { key: Key::Enter, modifiers: no_mods() });
        match dialog.outcome() {
            Some(JumpOutcome::Go(path)) => assert!(path.render().ends_with("alpha")),
            other => panic!("expected a resolved jump target, got {other:?}"),
        }
    }
}
