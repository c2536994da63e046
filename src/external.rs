//! Builds the environment an external program (editor, diff tool, custom
//! script) sees when launched from a pane: which directories the two
//! panes are showing and which entries are selected, as space-joined,
//! shell-quoted name lists. Launching the process itself is left to the
//! caller -- this module only computes the environment.

use crate::pane::{DualPane, PaneSide};

/// `TFM_*` variables set for a child process launched from the active pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEnv {
    pub vars: Vec<(String, String)>,
}

impl ExternalEnv {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Selected names, falling back to the entry under the cursor when
/// nothing is explicitly selected -- same rule as [`PaneState::selected_paths`].
fn selected_names(pane: &crate::pane::PaneState) -> String {
    let names: Vec<String> = if pane.selection.is_empty() {
        pane.manager.entries().get(pane.cursor).map(|e| e.name.clone()).into_iter().collect()
    } else {
        pane.selected_entries().into_iter().map(|e| e.name.clone()).collect()
    };
    names.iter().map(|n| shell_words::quote(n).to_string()).collect::<Vec<_>>().join(" ")
}

/// Computes the `TFM_*` environment for launching an external program from
/// `panes`, with `this`/`other` relative to whichever side is active.
pub fn build_env(panes: &DualPane) -> ExternalEnv {
    let left_dir = panes.left.path.render();
    let right_dir = panes.right.path.render();
    let left_selected = selected_names(&panes.left);
    let right_selected = selected_names(&panes.right);

    let (this_dir, other_dir, this_selected, other_selected) = match panes.active_side() {
        PaneSide::Left => (left_dir.clone(), right_dir.clone(), left_selected.clone(), right_selected.clone()),
        PaneSide::Right => (right_dir.clone(), left_dir.clone(), right_selected.clone(), left_selected.clone()),
    };

    ExternalEnv {
        vars: vec![
            ("TFM_ACTIVE".to_string(), "1".to_string()),
            ("TFM_LEFT_DIR".to_string(), left_dir),
            ("TFM_RIGHT_DIR".to_string(), right_dir),
            ("TFM_THIS_DIR".to_string(), this_dir),
            ("TFM_OTHER_DIR".to_string(), other_dir),
            ("TFM_LEFT_SELECTED".to_string(), left_selected),
            ("TFM_RIGHT_SELECTED".to_string(), right_selected),
            ("TFM_THIS_SELECTED".to_string(), this_selected),
            ("TFM_OTHER_SELECTED".to_string(), other_selected),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use tempfile::tempdir;

    #[test]
    fn this_and_other_flip_with_the_active_side() {
        let left_dir = tempdir().unwrap();
        let right_dir = tempdir().unwrap();
        let mut panes = DualPane::new(Path::local(left_dir.path()), Path::local(right_dir.path()));
        panes.left.reload().unwrap();
        panes.right.reload().unwrap();

        let env = build_env(&panes);
        assert_eq!(env.get("TFM_ACTIVE"), Some("1"));
        assert_eq!(env.get("TFM_THIS_DIR"), env.get("TFM_LEFT_DIR"));
        assert_eq!(env.get("TFM_OTHER_DIR"), env.get("TFM_RIGHT_DIR"));

        panes.switch_active();
        let env = build_env(&panes);
        assert_eq!(env.get("TFM_THIS_DIR"), env.get("TFM_RIGHT_DIR"));
        assert_eq!(env.get("TFM_OTHER_DIR"), env.get("TFM_LEFT_DIR"));
    }

    #[test]
    fn selected_names_are_shell_quoted_and_space_joined() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("two words.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("plain.txt"), b"x").unwrap();

        let other = tempdir().unwrap();
        let mut panes = DualPane::new(Path::local(dir.path()), Path::local(other.path()));
        panes.left.reload().unwrap();
        panes.right.reload().unwrap();
        panes.left.select(0);
        panes.left.select(1);

        let env = build_env(&panes);
        let selected = env.get("TFM_LEFT_SELECTED").unwrap();
        assert!(selected.contains("plain.txt"));
        assert!(selected.contains("'two words.txt'") || selected.contains("\"two words.txt\""));
    }
}
