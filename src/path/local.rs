//! Local disk backend. No cache, no connection pool -- `std::fs` already
//! does its own kernel-level caching, and stat/iterdir latency here is
//! negligible compared to the remote backends this crate also speaks.

use std::fs::{self, File};
use std::io::{Read, Write};

use crate::entry::{EntryKind, FileEntry};
use crate::error::{io_error_at, Result, TfmError};

use super::{DirIter, Path};

fn native(path: &Path) -> std::path::PathBuf {
    std::path::PathBuf::from(path.key())
}

pub fn stat(path: &Path) -> Result<FileEntry> {
    let native = native(path);
    let metadata = fs::symlink_metadata(&native).map_err(|e| io_error_at(&native, e))?;
    let name = path.name();

    if metadata.file_type().is_symlink() {
        let target_metadata = fs::metadata(&native).ok();
        let size = target_metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let mtime = metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        let mut entry = FileEntry::symlink(name, size, mtime);
        entry = entry.with_mode(mode_bits(&metadata));
        if target_metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false) {
            entry.is_dir = true;
        }
        return Ok(entry);
    }

    let is_dir = metadata.is_dir();
    let size = if is_dir { 0 } else { metadata.len() };
    let mtime = metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let mut entry = FileEntry::new(name, is_dir, size, mtime).with_mode(mode_bits(&metadata));
    if !is_dir && is_archive_name(&entry.name) {
        entry = entry.with_kind(EntryKind::Archive);
    }
    Ok(entry)
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn is_archive_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    [".zip", ".tar.gz", ".tgz", ".tar.bz2", ".tar.xz", ".tar", ".7z"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

pub fn iterdir(path: &Path) -> Result<DirIter> {
    let native = native(path);
    let read_dir = fs::read_dir(&native).map_err(|e| io_error_at(&native, e))?;
    let parent = path.clone();
    let iter = read_dir.map(move |entry| {
        let entry = entry.map_err(TfmError::io)?;
        let child = parent.join(&entry.file_name().to_string_lossy());
        stat(&child)
    });
    Ok(DirIter::new(iter))
}

pub fn open_read(path: &Path) -> Result<Box<dyn Read + Send>> {
    let native = native(path);
    let file = File::open(&native).map_err(|e| io_error_at(&native, e))?;
    Ok(Box::new(file))
}

pub fn open_write(path: &Path) -> Result<Box<dyn Write + Send>> {
    let native = native(path);
    let file = File::create(&native).map_err(|e| io_error_at(&native, e))?;
    Ok(Box::new(file))
}

pub fn mkdir(path: &Path, parents: bool, exist_ok: bool) -> Result<()> {
    let native = native(path);
    let result = if parents {
        fs::create_dir_all(&native)
    } else {
        fs::create_dir(&native)
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && exist_ok => Ok(()),
        Err(e) => Err(io_error_at(&native, e)),
    }
}

pub fn unlink(path: &Path) -> Result<()> {
    let native = native(path);
    fs::remove_file(&native).map_err(|e| io_error_at(&native, e))
}

pub fn rmdir(path: &Path) -> Result<()> {
    let native = native(path);
    fs::remove_dir(&native).map_err(|e| io_error_at(&native, e))
}

pub fn rename(path: &Path, dest: &Path) -> Result<()> {
    let from = native(path);
    let to = native(dest);
    fs::rename(&from, &to).map_err(|e| io_error_at(&from, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stat_reports_regular_file_size() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("hello.txt");
        fs::write(&file_path, b"hello").unwrap();

        let path = Path::local(&file_path);
        let entry = stat(&path).unwrap();
        assert_eq!(entry.size, 5);
        assert!(!entry.is_dir);
    }

    #[test]
    fn stat_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = Path::local(dir.path().join("missing.txt"));
        assert!(matches!(stat(&path), Err(TfmError::NotFound(_))));
    }

    #[test]
    fn iterdir_lists_children() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let path = Path::local(dir.path());
        let names: Vec<String> = iterdir(&path)
            .unwrap()
            .map(|e| e.unwrap().name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a.txt".to_string()));
        assert!(names.contains(&"sub".to_string()));
    }

    #[test]
    fn mkdir_then_rmdir_round_trips() {
        let dir = tempdir().unwrap();
        let nested = Path::local(dir.path().join("a/b/c"));
        mkdir(&nested, true, false).unwrap();
        assert!(std::path::Path::new(nested.key()).is_dir());
        rmdir(&nested).unwrap();
        assert!(!std::path::Path::new(nested.key()).is_dir());
    }

    #[test]
    fn rename_moves_file_within_local() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("from.txt");
        let to = dir.path().join("to.txt");
        fs::write(&from, b"x").unwrap();

        let from_path = Path::local(&from);
        let to_path = Path::local(&to);
        from_path.rename(&to_path).unwrap();

        assert!(!from.exists());
        assert!(to.exists());
    }
}
