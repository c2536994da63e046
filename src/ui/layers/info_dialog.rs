//! Read-only scrollable text. Built on [`ListDialog`] with character
//! input disabled -- an info/help screen has no writable field, only
//! content to scroll through.

use crate::ui::layers::dialogs::ListDialog;
use crate::ui::{CharEvent, EventOutcome, KeyEvent, MouseEvent, UILayer};

pub struct InfoDialog {
    list: ListDialog,
}

impl InfoDialog {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self { list: ListDialog::new(title, lines) }
    }

    pub fn is_finished(&self) -> bool {
        self.list.is_finished()
    }
}

impl UILayer for InfoDialog {
    fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        self.list.on_key(event)
    }

    fn on_char(&mut self, _event: CharEvent) -> EventOutcome {
        EventOutcome::Ignored
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
