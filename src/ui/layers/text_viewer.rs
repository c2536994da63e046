//! Reads a single file through the Path facade and renders it as a
//! scrollable list of lines, decoding with the same UTF-8 → Latin-1 →
//! CP1252 ladder the content-search heuristic uses for the same reason:
//! a file with no declared encoding should still show something rather
//! than a wall of replacement characters.

use crate::error::Result;
use crate::path::Path;
use crate::ui::layers::dialogs::ListDialog;
use crate::ui::{CharEvent, EventOutcome, KeyEvent, MouseEvent, UILayer};
use crate::util::encoding::decode_best_effort;

pub struct TextViewer {
    list: ListDialog,
}

impl TextViewer {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = path.read_bytes()?;
        let text = decode_best_effort(&bytes);
        let lines = text.lines().map(|line| line.to_string()).collect();
        Ok(Self { list: ListDialog::new(path.render(), lines) })
    }

    pub fn is_finished(&self) -> bool {
        self.list.is_finished()
    }
}

impl UILayer for TextViewer {
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

    #[test]
    fn opens_a_utf8_file_as_lines() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "first\nsecond\n").unwrap();

        let viewer = TextViewer::open(&Path::local(&file)).unwrap();
        assert_eq!(viewer.list.items(), &["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn opens_a_cp1252_file_without_mangling_its_punctuation() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("legacy.txt");
        fs::write(&file, [b'h', b'i', 0x93, b'!', 0x94]).unwrap();

        let viewer = TextViewer::open(&Path::local(&file)).unwrap();
        assert_eq!(viewer.list.items(), &["hi\u{201C}!\u{201D}".to_string()]);
    }
}
