//! File operations: copy, move, delete, each with streamed progress events
//! and cooperative cancellation, plus a bounded undo stack for the
//! reversible ones (copy, move/rename).
//!
//! Cross-storage moves (different scheme or authority) fall back from a
//! single `rename` call to stream copy + delete; same-storage moves take
//! the fast `rename` path. This mirrors [`crate::path::Path::rename`]'s
//! own contract, just one layer up so a single call handles both cases.

pub mod archive;
pub mod jump;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{Result, TfmError};
use crate::path::Path;

const COPY_BUFFER_SIZE: usize = 256 * 1024;
const MAX_UNDO_HISTORY: usize = 50;

/// Shared cooperative-cancellation flag. Cheap to clone; checked between
/// every chunk of a copy and before every recursive step of a delete.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TfmError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Copy,
    Move,
    Delete,
}

/// Streamed over a `flume` channel so a UI layer can render a progress
/// dialog without blocking the thread doing the actual I/O.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { total_files: u64, total_bytes: u64 },
    FileStarted { name: String },
    BytesTransferred { delta: u64 },
    FileCompleted { name: String },
    FileSkipped { name: String, reason: String },
    Completed,
    Cancelled,
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperationProgress {
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub files_done: u64,
    pub files_total: u64,
}

impl OperationProgress {
    pub fn percentage(&self) -> f32 {
        if self.bytes_total == 0 {
            if self.files_total == 0 {
                0.0
            } else {
                (self.files_done as f32 / self.files_total as f32) * 100.0
            }
        } else {
            (self.bytes_done as f32 / self.bytes_total as f32) * 100.0
        }
    }

    pub fn estimated_remaining(&self, elapsed: Duration) -> Option<Duration> {
        if self.bytes_done == 0 || self.bytes_total <= self.bytes_done {
            return None;
        }
        let rate = self.bytes_done as f64 / elapsed.as_secs_f64().max(0.001);
        let remaining_bytes = (self.bytes_total - self.bytes_done) as f64;
        Some(Duration::from_secs_f64(remaining_bytes / rate.max(1.0)))
    }
}

/// One tracked operation: its kind, live progress, and the cancellation
/// flag the UI's "cancel" action flips.
pub struct Operation {
    pub id: u64,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub progress: OperationProgress,
    pub started_at: Instant,
    pub token: CancellationToken,
}

/// What [`FileOperationsManager::undo`] reverses. Delete is deliberately
/// absent: without an OS trash there is nothing to restore from.
pub enum UndoableOperation {
    Copy { created: Path },
    Move { from: Path, to: Path },
}

impl UndoableOperation {
    fn undo(&self) -> Result<()> {
        match self {
            UndoableOperation::Copy { created } => created.unlink().or_else(|_| created.rmdir()),
            UndoableOperation::Move { from, to } => to.rename(from),
        }
    }

    fn redo(&self) -> Result<()> {
        match self {
            UndoableOperation::Copy { .. } => Ok(()), // the forward copy already ran; nothing to replay
            UndoableOperation::Move { from, to } => from.rename(to),
        }
    }
}

/// Owns the id counter, the table of in-flight operations, and the undo
/// history. One instance per running process.
pub struct FileOperationsManager {
    next_id: AtomicU64,
    active: Mutex<HashMap<u64, OperationStatus>>,
    undo_stack: Mutex<Vec<UndoableOperation>>,
    redo_stack: Mutex<Vec<UndoableOperation>>,
}

impl Default for FileOperationsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FileOperationsManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
            undo_stack: Mutex::new(Vec::new()),
            redo_stack: Mutex::new(Vec::new()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn set_status(&self, id: u64, status: OperationStatus) {
        self.active.lock().unwrap().insert(id, status);
    }

    pub fn status(&self, id: u64) -> Option<OperationStatus> {
        self.active.lock().unwrap().get(&id).copied()
    }

    fn push_undoable(&self, op: UndoableOperation) {
        let mut stack = self.undo_stack.lock().unwrap();
        stack.push(op);
        if stack.len() > MAX_UNDO_HISTORY {
            stack.remove(0);
        }
        self.redo_stack.lock().unwrap().clear();
    }

    pub fn undo(&self) -> Result<bool> {
        let Some(op) = self.undo_stack.lock().unwrap().pop() else {
            return Ok(false);
        };
        op.undo()?;
        self.redo_stack.lock().unwrap().push(op);
        Ok(true)
    }

    pub fn redo(&self) -> Result<bool> {
        let Some(op) = self.redo_stack.lock().unwrap().pop() else {
            return Ok(false);
        };
        op.redo()?;
        self.undo_stack.lock().unwrap().push(op);
        Ok(true)
    }

    /// Copies `src` to `dest`, recursing into directories. Emits progress
    /// on `events` and records an undo entry on success.
    pub fn copy(
        &self,
        src: &Path,
        dest: &Path,
        token: &CancellationToken,
        events: &flume::Sender<ProgressEvent>,
    ) -> Result<u64> {
        let id = self.next_id();
        self.set_status(id, OperationStatus::Running);
        let result = stream_copy(src, dest, token, events);
        self.set_status(
            id,
            match &result {
                Ok(()) => OperationStatus::Completed,
                Err(TfmError::Cancelled) => OperationStatus::Cancelled,
                Err(_) => OperationStatus::Failed,
            },
        );
        if result.is_ok() {
            self.push_undoable(UndoableOperation::Copy { created: dest.clone() });
        }
        result.map(|_| id)
    }

    /// Moves `src` to `dest`. Same-storage moves take the cheap `rename`
    /// path; cross-storage moves stream-copy then delete the source.
    pub fn move_path(
        &self,
        src: &Path,
        dest: &Path,
        token: &CancellationToken,
        events: &flume::Sender<ProgressEvent>,
    ) -> Result<u64> {
        let id = self.next_id();
        self.set_status(id, OperationStatus::Running);

        let result = if src.same_storage(dest) {
            src.rename(dest)
        } else {
            stream_copy(src, dest, token, events).and_then(|()| delete_recursive(src, token, events))
        };

        self.set_status(
            id,
            match &result {
                Ok(()) => OperationStatus::Completed,
                Err(TfmError::Cancelled) => OperationStatus::Cancelled,
                Err(_) => OperationStatus::Failed,
            },
        );
        if result.is_ok() {
            self.push_undoable(UndoableOperation::Move {
                from: src.clone(),
                to: dest.clone(),
            });
        }
        result.map(|_| id)
    }

    pub fn delete(
        &self,
        target: &Path,
        token: &CancellationToken,
        events: &flume::Sender<ProgressEvent>,
    ) -> Result<u64> {
        let id = self.next_id();
        self.set_status(id, OperationStatus::Running);
        let result = delete_recursive(target, token, events);
        self.set_status(
            id,
            match &result {
                Ok(()) => OperationStatus::Completed,
                Err(TfmError::Cancelled) => OperationStatus::Cancelled,
                Err(_) => OperationStatus::Failed,
            },
        );
        result.map(|_| id)
    }
}

fn stream_copy(
    src: &Path,
    dest: &Path,
    token: &CancellationToken,
    events: &flume::Sender<ProgressEvent>,
) -> Result<()> {
    token.check()?;
    let src_stat = src.stat()?;

    if src_stat.is_dir {
        dest.mkdir(true, true)?;
        for child in src.iterdir()? {
            let child = child?;
            token.check()?;
            stream_copy(&src.join(&child.name), &dest.join(&child.name), token, events)?;
        }
        return Ok(());
    }

    let _ = events.send(ProgressEvent::FileStarted { name: src.name() });
    let mut reader = src.open_read()?;
    let mut writer = dest.open_write()?;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        token.check()?;
        let read = reader.read(&mut buffer).map_err(TfmError::io)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read]).map_err(TfmError::io)?;
        let _ = events.send(ProgressEvent::BytesTransferred { delta: read as u64 });
    }
    drop(writer);
    let _ = events.send(ProgressEvent::FileCompleted { name: src.name() });
    Ok(())
}

fn delete_recursive(
    target: &Path,
    token: &CancellationToken,
    events: &flume::Sender<ProgressEvent>,
) -> Result<()> {
    token.check()?;
    let stat = target.stat()?;
    if stat.is_dir {
        for child in target.iterdir()? {
            let child = child?;
            token.check()?;
            delete_recursive(&target.join(&child.name), token, events)?;
        }
        target.rmdir()?;
    } else {
        target.unlink()?;
        let _ = events.send(ProgressEvent::FileCompleted { name: target.name() });
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
