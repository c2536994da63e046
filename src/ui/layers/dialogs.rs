//! Small modal layers pushed on top of the file manager: a single-line
//! text prompt and a selectable list. Both are non-full-screen, so the
//! file manager beneath them still participates in dirty-region
//! rendering.

use crate::ui::{CharEvent, EventOutcome, Key, KeyEvent, MouseEvent, SystemEvent, UILayer};

/// A single-line text input, used for "go to folder", rename, and the
/// batch-rename pattern field.
pub struct InputDialog {
    pub title: String,
    pub buffer: String,
    pub cursor: usize,
    pub result: Option<DialogResult>,
    dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogResult {
    Confirmed(String),
    Cancelled,
}

impl InputDialog {
    pub fn new(title: impl Into<String>, initial: impl Into<String>) -> Self {
        let buffer: String = initial.into();
        let cursor = buffer.chars().count();
        Self { title: title.into(), buffer, cursor, result: None, dirty: true }
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }
}

impl UILayer for InputDialog {
    fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        self.dirty = true;
        match event.key {
            Key::Enter => self.result = Some(DialogResult::Confirmed(self.buffer.clone())),
            Key::Escape => self.result = Some(DialogResult::Cancelled),
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let byte_index = self.buffer.char_indices().nth(self.cursor).map(|(i, _)| i);
                    if let Some(i) = byte_index {
                        self.buffer.remove(i);
                    }
                }
            }
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.buffer.chars().count()),
            _ => return EventOutcome::Ignored,
        }
        EventOutcome::Consumed
    }

    fn on_char(&mut self, event: CharEvent) -> EventOutcome {
        self.dirty = true;
        let byte_index = self
            .buffer
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.buffer.len());
        self.buffer.insert(byte_index, event.ch);
        self.cursor += 1;
        EventOutcome::Consumed
    }

    fn on_mouse(&mut self, _event: MouseEvent) -> EventOutcome {
        EventOutcome::Consumed // dialogs sit over the file manager; swallow clicks meant for it
    }

    fn on_system(&mut self, _event: SystemEvent) {}

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn render(&self, frame: &mut dyn std::fmt::Write) {
        let _ = writeln!(frame, "{}: {}", self.title, self.buffer);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A filtered list over a sequence of items with an embedded search
/// field: typed characters narrow `items` to those containing the typed
/// text (case-insensitive), `selected` indexes into that filtered view,
/// and [`ListDialogResult::Chosen`] reports the index back into the
/// *original*, unfiltered list so callers never have to translate.
pub struct ListDialog {
    pub title: String,
    items: Vec<String>,
    pub filter: String,
    pub selected: usize,
    pub result: Option<ListDialogResult>,
    dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListDialogResult {
    Chosen(usize),
    Cancelled,
}

impl ListDialog {
    pub fn new(title: impl Into<String>, items: Vec<String>) -> Self {
        Self { title: title.into(), items, filter: String::new(), selected: 0, result: None, dirty: true }
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Appends one item, e.g. a search match arriving on the results
    /// channel while the dialog is already open.
    pub fn push_item(&mut self, item: String) {
        self.items.push(item);
        self.dirty = true;
    }

    /// `(original_index, item)` pairs whose item contains `filter`
    /// case-insensitively, in original order.
    pub fn visible(&self) -> Vec<(usize, &String)> {
        if self.filter.is_empty() {
            return self.items.iter().enumerate().collect();
        }
        let needle = self.filter.to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.to_lowercase().contains(&needle))
            .collect()
    }
}

impl UILayer for ListDialog {
    fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        self.dirty = true;
        match event.key {
            Key::Up => self.selected = self.selected.saturating_sub(1),
            Key::Down => {
                let visible_len = self.visible().len();
                if visible_len > 0 {
                    self.selected = (self.selected + 1).min(visible_len - 1);
                }
            }
            Key::Enter => {
                let original_index = self.visible().get(self.selected).map(|(i, _)| *i);
                self.result = match original_index {
                    Some(index) => Some(ListDialogResult::Chosen(index)),
                    None => Some(ListDialogResult::Cancelled),
                };
            }
            Key::Escape => self.result = Some(ListDialogResult::Cancelled),
            Key::Backspace => {
                self.filter.pop();
                self.selected = 0;
            }
            _ => return EventOutcome::Ignored,
        }
        EventOutcome::Consumed
    }

    fn on_char(&mut self, event: CharEvent) -> EventOutcome {
        self.dirty = true;
        self.filter.push(event.ch);
        self.selected = 0;
        EventOutcome::Consumed
    }

    fn on_mouse(&mut self, _event: MouseEvent) -> EventOutcome {
        EventOutcome::Consumed
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn render(&self, frame: &mut dyn std::fmt::Write) {
        let _ = writeln!(frame, "{} [{}]", self.title, self.filter);
        for (position, (_, item)) in self.visible().into_iter().enumerate() {
            let marker = if position == self.selected { ">" } else { " " };
            let _ = writeln!(frame, "{marker} {item}");
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_mods() -> crate::ui::Modifiers {
        crate::ui::Modifiers { shift: false, ctrl: false, alt: false }
    }

    #[test]
    fn typing_then_enter_confirms_buffer() {
        let mut dialog = InputDialog::new("Go to", "");
        dialog.on_char(CharEvent { ch: 'a' });
        dialog.on_char(CharEvent { ch: 'b' });
        dialog.on_key(KeyEvent { key: Key::Enter, modifiers: no_mods() });
        assert_eq!(dialog.result, Some(DialogResult::Confirmed("ab".to_string())));
    }

    #[test]
    fn escape_cancels_without_mutating_buffer_further() {
        let mut dialog = InputDialog::new("Go to", "keep");
        dialog.on_key(KeyEvent { key: Key::Escape, modifiers: no_mods() });
        assert_eq!(dialog.result, Some(DialogResult::Cancelled));
        assert_eq!(dialog.buffer, "keep");
    }

    #[test]
    fn backspace_removes_character_before_cursor() {
        let mut dialog = InputDialog::new("Rename", "abc");
        dialog.on_key(KeyEvent { key: Key::Backspace, modifiers: no_mods() });
        assert_eq!(dialog.buffer, "ab");
    }

    #[test]
    fn list_dialog_down_clamps_at_last_item() {
        let mut dialog = ListDialog::new("Pick", vec!["a".into(), "b".into()]);
        dialog.on_key(KeyEvent { key: Key::Down, modifiers: no_mods() });
        dialog.on_key(KeyEvent { key: Key::Down, modifiers: no_mods() });
        dialog.on_key(KeyEvent { key: Key::Down, modifiers: no_mods() });
        assert_eq!(dialog.selected, 1);
    }

    #[test]
    fn list_dialog_enter_reports_chosen_index() {
        let mut dialog = ListDialog::new("Pick", vec!["a".into(), "b".into()]);
        dialog.on_key(KeyEvent { key: Key::Down, modifiers: no_mods() });
        dialog.on_key(KeyEvent { key: Key::Enter, modifiers: no_mods() });
        assert_eq!(dialog.result, Some(ListDialogResult::Chosen(1)));
    }
}
