//! Hosts a background search ([`search::spawn`]) and streams its matches
//! into a [`ListDialog`], owning the authoritative "searching" flag so
//! the UI can show a spinner while results are still arriving rather
//! than guessing from the channel's state.

use crate::path::Path;
use crate::search::{self, SearchHandle, SearchMatch, SearchQuery};
use crate::ui::layers::dialogs::{ListDialog, ListDialogResult};
use crate::ui::{CharEvent, EventOutcome, KeyEvent, MouseEvent, UILayer};

pub struct SearchDialog {
    list: ListDialog,
    matches: Vec<SearchMatch>,
    handle: Option<SearchHandle>,
    receiver: Option<flume::Receiver<SearchMatch>>,
    searching: bool,
}

impl SearchDialog {
    pub fn new(root: Path, query: SearchQuery) -> Self {
        let (handle, receiver) = search::spawn(root, query);
        Self {
            list: ListDialog::new("Search (live)", Vec::new()),
            matches: Vec::new(),
            handle: Some(handle),
            receiver: Some(receiver),
            searching: true,
        }
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn chosen_match(&self) -> Option<&SearchMatch> {
        match self.list.result {
            Some(ListDialogResult::Chosen(index)) => self.matches.get(index),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.list.is_finished()
    }

    /// Drains matches that arrived since the last poll. Call once per
    /// frame while [`Self::is_searching`] is true; a superseded or
    /// completed search closes its sender, which `try_recv` surfaces as
    /// `Disconnected` here.
    pub fn poll(&mut self) {
        let Some(receiver) = &self.receiver else { return };
        loop {
            match receiver.try_recv() {
                Ok(found) => {
                    self.list.push_item(format_match(&found));
                    self.matches.push(found);
                }
                Err(flume::TryRecvError::Empty) => break,
                Err(flume::TryRecvError::Disconnected) => {
                    self.searching = false;
                    self.receiver = None;
                    break;
                }
            }
        }
    }

    /// Cancels the background walk and waits up to the cancellation
    /// grace period for it to notice -- called when the dialog is
    /// dismissed before the search finished on its own.
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel_and_wait();
        }
    }
}

fn format_match(found: &SearchMatch) -> String {
    match found {
        SearchMatch::Name { path } => path.render(),
        SearchMatch::Content { path, line_number, line } => {
            format!("{}:{line_number}: {line}", path.render())
        }
    }
}

impl UILayer for SearchDialog {
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
        self.list.is_dirty() || self.searching
    }

    fn render(&self, frame: &mut dyn std::fmt::Write) {
        if self.searching {
            let _ = writeln!(frame, "searching...");
        }
        self.list.render(frame);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    use crate::search::SearchMode;

    #[test]
    fn poll_picks_up_matches_as_they_stream_in() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("needle.txt"), b"x").unwrap();
        fs::write(dir.path().join("other.txt"), b"x").unwrap();

        let query = SearchQuery {
            pattern: "needle".to_string(),
            mode: SearchMode::FileName,
            case_insensitive: true,
            use_regex: false,
        };
        let mut dialog = SearchDialog::new(Path::local(dir.path()), query);

        let deadline = Instant::now() + Duration::from_secs(2);
        while dialog.is_searching() && Instant::now() < deadline {
            dialog.poll();
            thread::sleep(Duration::from_millis(10));
        }
        dialog.poll();

        assert!(dialog.list.items().iter().any(|item| item.contains("needle.txt")));
        assert!(!dialog.list.items().iter().any(|item| item.contains("other.txt")));
    }
}
