//! Background filename/content search. Each call to [`spawn`] gets its own
//! thread and its own cancellation flag; a superseded search (the user
//! typed another character) is simply cancelled and left to wind down on
//! its own -- there is no thread pool to return it to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use regex::{Regex, RegexBuilder};

use crate::path::Path;

/// Superseded threads get up to this long to notice cancellation and exit
/// before the caller stops waiting on them.
pub const CANCELLATION_GRACE_PERIOD: Duration = Duration::from_millis(100);

#[derive(Clone, Default)]
pub struct SearchToken(Arc<AtomicBool>);

impl SearchToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub enum SearchMode {
    FileName,
    Content,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub pattern: String,
    pub mode: SearchMode,
    pub case_insensitive: bool,
    pub use_regex: bool,
}

#[derive(Debug, Clone)]
pub enum SearchMatch {
    Name { path: Path },
    Content { path: Path, line_number: usize, line: String },
}

pub struct SearchHandle {
    token: SearchToken,
    join: Option<std::thread::JoinHandle<()>>,
}

impl SearchHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Blocks up to [`CANCELLATION_GRACE_PERIOD`] for the thread to notice
    /// cancellation. Does not block indefinitely: a wedged thread (e.g. a
    /// stalled remote read) is left orphaned rather than holding up the
    /// caller.
    pub fn cancel_and_wait(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            let (done_tx, done_rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = join.join();
                let _ = done_tx.send(());
            });
            let _ = done_rx.recv_timeout(CANCELLATION_GRACE_PERIOD);
        }
    }
}

fn build_matcher(query: &SearchQuery) -> Result<Regex, regex::Error> {
    let pattern = if query.use_regex {
        query.pattern.clone()
    } else {
        regex::escape(&query.pattern)
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(query.case_insensitive)
        .build()
}

/// Likely-binary heuristic: a NUL byte in the first 8KiB. Everything else
/// is decoded with `from_utf8_lossy`, which degrades gracefully for
/// Latin-1/CP1252 text (undecodable bytes become the replacement
/// character rather than aborting the search).
fn looks_like_text(sample: &[u8]) -> bool {
    !sample.iter().take(8192).any(|&b| b == 0)
}

/// Spawns the search and returns a handle plus the channel matches stream
/// on. The channel closes when the search completes or is cancelled.
pub fn spawn(root: Path, query: SearchQuery) -> (SearchHandle, flume::Receiver<SearchMatch>) {
    let token = SearchToken::new();
    let (tx, rx) = flume::unbounded();
    let thread_token = token.clone();

    let join = std::thread::spawn(move || {
        let matcher = match build_matcher(&query) {
            Ok(m) => m,
            Err(_) => return,
        };
        walk(&root, &query, &matcher, &thread_token, &tx);
    });

    (
        SearchHandle { token, join: Some(join) },
        rx,
    )
}

fn walk(
    dir: &Path,
    query: &SearchQuery,
    matcher: &Regex,
    token: &SearchToken,
    tx: &flume::Sender<SearchMatch>,
) {
    if token.is_cancelled() {
        return;
    }
    let Ok(children) = dir.iterdir() else { return };

    for child in children {
        if token.is_cancelled() {
            return;
        }
        let Ok(child) = child else { continue };
        let child_path = dir.join(&child.name);

        if child.is_dir {
            walk(&child_path, query, matcher, token, tx);
            continue;
        }

        match query.mode {
            SearchMode::FileName => {
                if matcher.is_match(&child.name) {
                    let _ = tx.send(SearchMatch::Name { path: child_path });
                }
            }
            SearchMode::Content => {
                search_file_content(&child_path, matcher, token, tx);
            }
        }
    }
}

fn search_file_content(
    path: &Path,
    matcher: &Regex,
    token: &SearchToken,
    tx: &flume::Sender<SearchMatch>,
) {
    let Ok(bytes) = path.read_bytes() else { return };
    if !looks_like_text(&bytes) {
        return;
    }
    let text = crate::util::encoding::decode_best_effort(&bytes);
    for (index, line) in text.lines().enumerate() {
        if token.is_cancelled() {
            return;
        }
        if matcher.is_match(line) {
            let _ = tx.send(SearchMatch::Content {
                path: path.clone(),
                line_number: index + 1,
                line: line.to_string(),
            });
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
