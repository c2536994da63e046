//! Parses key-expression strings (`"Ctrl+C"`, `"Shift+Enter"`, `"g"`) into
//! a lookup key, and indexes bound actions by `(main key, modifier
//! bitmask)` so resolving a keystroke during input handling is O(1)
//! regardless of how many bindings are configured.

use std::collections::HashMap;

use super::{Key, Modifiers};

fn modifier_bitmask(modifiers: Modifiers) -> u8 {
    (modifiers.shift as u8) | ((modifiers.ctrl as u8) << 1) | ((modifiers.alt as u8) << 2)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownModifier(String),
    UnknownKey(String),
}

/// Parses one key expression, e.g. `"Ctrl-Shift-Enter"` or `"g"`. Accepts
/// `+` as an alternate separator for configs written the older way.
/// `Command`/`Cmd` has no distinct terminal signal, so it's folded into
/// the same bit as `Alt`/`Option` -- most terminals report Cmd chords
/// that way already.
pub fn parse_key_expr(expr: &str) -> Result<(Key, Modifiers), ParseError> {
    let parts: Vec<&str> = expr
        .split(|c| c == '-' || c == '+')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let Some((&main, modifier_tokens)) = parts.split_last() else {
        return Err(ParseError::Empty);
    };

    let mut modifiers = Modifiers { shift: false, ctrl: false, alt: false };
    for token in modifier_tokens {
        match token.to_lowercase().as_str() {
            "ctrl" | "control" => modifiers.ctrl = true,
            "shift" => modifiers.shift = true,
            "alt" | "meta" | "option" | "cmd" | "command" => modifiers.alt = true,
            other => return Err(ParseError::UnknownModifier(other.to_string())),
        }
    }

    let key = parse_main_key(main)?;
    Ok((key, modifiers))
}

fn parse_main_key(token: &str) -> Result<Key, ParseError> {
    let key = match token.to_lowercase().as_str() {
        "enter" | "return" => Key::Enter,
        "escape" | "esc" => Key::Escape,
        "tab" => Key::Tab,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "pgup" => Key::PageUp,
        "pagedown" | "pgdn" => Key::PageDown,
        other => {
            if let Some(rest) = other.strip_prefix('f') {
                if let Ok(n) = rest.parse::<u8>() {
                    return Ok(Key::Function(n));
                }
            }
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Key::Char(ch),
                _ => return Err(ParseError::UnknownKey(token.to_string())),
            }
        }
    };
    Ok(key)
}

/// Whether a binding applies given the current selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPredicate {
    /// Fires regardless of selection state.
    Any,
    /// Fires only when at least one entry is selected.
    Required,
    /// Fires only when nothing is selected.
    None,
}

impl SelectionPredicate {
    fn matches(self, selection_nonempty: bool) -> bool {
        match self {
            SelectionPredicate::Any => true,
            SelectionPredicate::Required => selection_nonempty,
            SelectionPredicate::None => !selection_nonempty,
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    action: String,
    predicate: SelectionPredicate,
}

/// `(main key, modifier bitmask) -> candidate bindings`, checked in
/// registration order against the current selection predicate.
#[derive(Default)]
pub struct KeyBindingTable {
    table: HashMap<(Key, u8), Vec<Binding>>,
}

impl KeyBindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(
        &mut self,
        expr: &str,
        action: impl Into<String>,
        predicate: SelectionPredicate,
    ) -> Result<(), ParseError> {
        let (key, modifiers) = parse_key_expr(expr)?;
        self.table
            .entry((key, modifier_bitmask(modifiers)))
            .or_default()
            .push(Binding { action: action.into(), predicate });
        Ok(())
    }

    /// O(1) average-case: one hash lookup plus a scan of the (typically
    /// single-element) candidate list for this exact key chord.
    pub fn resolve(&self, key: Key, modifiers: Modifiers, selection_nonempty: bool) -> Option<&str> {
        let candidates = self.table.get(&(key, modifier_bitmask(modifiers)))?;
        candidates
            .iter()
            .find(|binding| binding.predicate.matches(selection_nonempty))
            .map(|binding| binding.action.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_character_key() {
        let (key, modifiers) = parse_key_expr("g").unwrap();
        assert_eq!(key, Key::Char('g'));
        assert!(!modifiers.ctrl && !modifiers.shift && !modifiers.alt);
    }

    #[test]
    fn parses_modifier_combination_case_insensitively() {
        let (key, modifiers) = parse_key_expr("ctrl+Shift+Enter").unwrap();
        assert_eq!(key, Key::Enter);
        assert!(modifiers.ctrl && modifiers.shift && !modifiers.alt);
    }

    #[test]
    fn parses_dash_separated_expression_with_command_modifier() {
        let (key, modifiers) = parse_key_expr("Cmd-Shift-Enter").unwrap();
        assert_eq!(key, Key::Enter);
        assert!(modifiers.alt && modifiers.shift);
    }

    #[test]
    fn parses_function_keys() {
        assert_eq!(parse_main_key("F5").unwrap(), Key::Function(5));
    }

    #[test]
    fn rejects_unknown_modifier() {
        assert!(matches!(parse_key_expr("Hyper+a"), Err(ParseError::UnknownModifier(_))));
    }

    #[test]
    fn rejects_empty_expression() {
        assert_eq!(parse_key_expr(""), Err(ParseError::Empty));
    }

    #[test]
    fn resolve_respects_selection_predicate() {
        let mut table = KeyBindingTable::new();
        table.bind("Delete", "delete_selected", SelectionPredicate::Required).unwrap();
        table.bind("Delete", "noop", SelectionPredicate::None).unwrap();

        let no_mods = Modifiers { shift: false, ctrl: false, alt: false };
        assert_eq!(table.resolve(Key::Delete, no_mods, true), Some("delete_selected"));
        assert_eq!(table.resolve(Key::Delete, no_mods, false), Some("noop"));
    }

    #[test]
    fn resolve_returns_none_for_unbound_chord() {
        let table = KeyBindingTable::new();
        let no_mods = Modifiers { shift: false, ctrl: false, alt: false };
        assert_eq!(table.resolve(Key::Char('z'), no_mods, false), None);
    }

    #[test]
    fn different_modifier_masks_are_distinct_bindings() {
        let mut table = KeyBindingTable::new();
        table.bind("c", "copy_to_clipboard", SelectionPredicate::Any).unwrap();
        table.bind("Ctrl+c", "copy_files", SelectionPredicate::Any).unwrap();

        let plain = Modifiers { shift: false, ctrl: false, alt: false };
        let ctrl = Modifiers { shift: false, ctrl: true, alt: false };
        assert_eq!(table.resolve(Key::Char('c'), plain, false), Some("copy_to_clipboard"));
        assert_eq!(table.resolve(Key::Char('c'), ctrl, false), Some("copy_files"));
    }
}
