//! Hosts `batch_rename::BatchRename`'s preview/apply cycle: an
//! [`InputDialog`] takes the pattern text, then a [`ListDialog`] shows
//! the resulting preview (conflicts flagged) before anything touches
//! disk.

use crate::batch_rename::{BatchRename, RenameToken};
use crate::path::Path;
use crate::ui::layers::dialogs::{DialogResult, InputDialog, ListDialog};
use crate::ui::{CharEvent, EventOutcome, Key, KeyEvent, MouseEvent, UILayer};

enum Stage {
    EditingPattern,
    ReviewingPreview,
}

pub struct BatchRenameDialog {
    batch: BatchRename,
    pattern_input: InputDialog,
    preview_list: ListDialog,
    stage: Stage,
    pub applied: Option<Result<(), String>>,
    dirty: bool,
}

impl BatchRenameDialog {
    pub fn new(files: Vec<Path>) -> Self {
        let batch = BatchRename::new(files);
        let preview_list = build_preview_list(&batch);
        Self {
            batch,
            pattern_input: InputDialog::new("Rename pattern", "{name}{ext}"),
            preview_list,
            stage: Stage::EditingPattern,
            applied: None,
            dirty: true,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.applied.is_some()
    }

    fn apply_pattern_text(&mut self, text: &str) {
        self.batch.set_pattern(parse_pattern(text));
        self.preview_list = build_preview_list(&self.batch);
    }
}

fn build_preview_list(batch: &BatchRename) -> ListDialog {
    let rows = batch.preview().unwrap_or_default();
    let items = rows
        .iter()
        .map(|row| {
            let marker = if row.has_conflict { "!" } else { " " };
            format!("{marker} {} -> {}", row.original.name(), row.new_name)
        })
        .collect();
    ListDialog::new("Preview (enter applies, esc edits pattern)", items)
}

/// Parses `{name}`, `{ext}`, `{counter}`, and `{date:FORMAT}` tokens out
/// of literal text; an unrecognized or unterminated `{...}` is kept
/// as-is rather than rejected, since a typo here should still preview
/// something the user can see and correct.
fn parse_pattern(text: &str) -> Vec<RenameToken> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '{' {
            literal.push(c);
            continue;
        }
        let mut token_text = String::new();
        let mut closed = false;
        for next in chars.by_ref() {
            if next == '}' {
                closed = true;
                break;
            }
            token_text.push(next);
        }
        if !closed {
            literal.push('{');
            literal.push_str(&token_text);
            continue;
        }
        match token_text.as_str() {
            "name" => {
                flush_literal(&mut tokens, &mut literal);
                tokens.push(RenameToken::OriginalName);
            }
            "ext" => {
                flush_literal(&mut tokens, &mut literal);
                tokens.push(RenameToken::Extension);
            }
            "counter" => {
                flush_literal(&mut tokens, &mut literal);
                tokens.push(RenameToken::Counter { start: 1, padding: 2 });
            }
            other if other.starts_with("date:") => {
                flush_literal(&mut tokens, &mut literal);
                tokens.push(RenameToken::Date { format: other["date:".len()..].to_string() });
            }
            other => {
                literal.push('{');
                literal.push_str(other);
                literal.push('}');
            }
        }
    }
    flush_literal(&mut tokens, &mut literal);
    if tokens.is_empty() {
        tokens.push(RenameToken::OriginalName);
    }
    tokens
}

fn flush_literal(tokens: &mut Vec<RenameToken>, literal: &mut String) {
    if !literal.is_empty() {
        tokens.push(RenameToken::Text(std::mem::take(literal)));
    }
}

impl UILayer for BatchRenameDialog {
    fn on_key(&mut self, event: KeyEvent) -> EventOutcome {
        self.dirty = true;
        match self.stage {
            Stage::EditingPattern => {
                let outcome = self.pattern_input.on_key(event);
                if let Some(result) = self.pattern_input.result.take() {
                    match result {
                        DialogResult::Confirmed(text) => {
                            self.apply_pattern_text(&text);
                            self.stage = Stage::ReviewingPreview;
                        }
                        DialogResult::Cancelled => {
                            self.applied = Some(Err("cancelled".to_string()));
                        }
                    }
                }
                outcome
            }
            Stage::ReviewingPreview => match event.key {
                Key::Escape => {
                    self.stage = Stage::EditingPattern;
                    EventOutcome::Consumed
                }
                Key::Enter => {
                    self.applied = Some(self.batch.apply().map_err(|e| e.to_string()));
                    EventOutcome::Consumed
                }
                _ => self.preview_list.on_key(event),
            },
        }
    }

    fn on_char(&mut self, event: CharEvent) -> EventOutcome {
        self.dirty = true;
        match self.stage {
            Stage::EditingPattern => self.pattern_input.on_char(event),
            Stage::ReviewingPreview => EventOutcome::Ignored,
        }
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
        match self.stage {
            Stage::EditingPattern => self.pattern_input.render(frame),
            Stage::ReviewingPreview => self.preview_list.render(frame),
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

    fn file(name: &str) -> Path {
        Path::local(format!("/tmp/{name}"))
    }

    #[test]
    fn confirming_the_pattern_moves_to_the_preview_stage() {
        let mut dialog = BatchRenameDialog::new(vec![file("a.txt"), file("b.txt")]);
        dialog.pattern_input.buffer = "img_{counter}{ext}".to_string();
        dialog.on_key(KeyEvent { key: Key::Enter, modifiers: no_mods() });

        assert!(matches!(dialog.stage, Stage::ReviewingPreview));
        assert!(dialog.preview_list.items().iter().any(|item| item.contains("img_01.txt")));
    }

    #[test]
    fn escape_during_pattern_entry_marks_the_dialog_cancelled() {
        let mut dialog = BatchRenameDialog::new(vec![file("a.txt")]);
        dialog.on_key(KeyEvent { key: Key::Escape, modifiers: no_mods() });
        assert_eq!(dialog.applied, Some(Err("cancelled".to_string())));
    }

    #[test]
    fn unrecognized_token_is_kept_literally() {
        let tokens = parse_pattern("{mystery}-{name}");
        assert!(matches!(&tokens[0], RenameToken::Text(t) if t == "{mystery}-"));
    }
}
