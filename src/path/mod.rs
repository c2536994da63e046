//! The virtual path layer: a single [`Path`] value type that dispatches to
//! one of three backends (local disk, S3, SSH/SFTP) by scheme. Paths are
//! values -- they never own a connection; connections live in per-backend
//! singleton pools keyed by authority (see [`s3`] and [`ssh`]).

pub mod cache;
pub mod local;
pub mod s3;
pub mod ssh;

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::entry::FileEntry;
use crate::error::{Result, TfmError};

/// The storage backend a [`Path`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Local,
    S3,
    Ssh,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Scheme::Local => "file",
            Scheme::S3 => "s3",
            Scheme::Ssh => "ssh",
        }
    }
}

/// An immutable value identifying a location in some storage: `(scheme,
/// authority, normalized key)`. Two Paths with the same triple denote the
/// same object, regardless of how they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    scheme: Scheme,
    authority: String,
    key: String,
}

/// What end of a stream `open` should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadBinary,
    WriteBinary,
}

/// A lazy, single-pass, re-invocable listing of one directory's children.
///
/// Not restartable mid-iteration: a caller that wants to list the same
/// directory again must call [`Path::iterdir`] a second time.
pub struct DirIter(Box<dyn Iterator<Item = Result<FileEntry>> + Send>);

impl Iterator for DirIter {
    type Item = Result<FileEntry>;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl DirIter {
    pub(crate) fn new(inner: impl Iterator<Item = Result<FileEntry>> + Send + 'static) -> Self {
        DirIter(Box::new(inner))
    }
}

/// Collapses `.`/`..` segments and drops a trailing slash. Applied to S3 and
/// SSH keys only -- local paths are left to the OS, which already
/// understands `.`/`..` and symlinks in ways a naive collapse would break.
///
/// `stat` and `iterdir` both route their cache-key construction through
/// this function so the two operations can never disagree about what a
/// given path's canonical key is.
pub fn normalize_remote_key(key: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

impl Path {
    pub fn local(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        Path {
            scheme: Scheme::Local,
            authority: String::new(),
            key: path.to_string_lossy().replace('\\', "/"),
        }
    }

    pub fn s3(bucket: impl Into<String>, key: impl AsRef<str>) -> Self {
        Path {
            scheme: Scheme::S3,
            authority: bucket.into(),
            key: normalize_remote_key(key.as_ref()),
        }
    }

    pub fn ssh(host_alias: impl Into<String>, key: impl AsRef<str>) -> Self {
        Path {
            scheme: Scheme::Ssh,
            authority: host_alias.into(),
            key: normalize_remote_key(key.as_ref()),
        }
    }

    /// Parses `scheme://authority/key` forms (`s3://bucket/key`,
    /// `ssh://host/key`), the scp-style shorthand `user@host:/key`, plain
    /// local paths (`/a/b`), and the explicit `local:` prefix the CLI uses
    /// for its default arguments.
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(rest) = uri.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            return Ok(Path::s3(bucket, key));
        }
        if let Some(rest) = uri.strip_prefix("ssh://") {
            let (host, key) = rest.split_once('/').unwrap_or((rest, ""));
            return Ok(Path::ssh(host, key));
        }
        if let Some(rest) = uri.strip_prefix("file://") {
            return Ok(Path::local(rest));
        }
        if let Some(rest) = uri.strip_prefix("local:") {
            return Ok(Path::local(rest));
        }
        if let Some((host, key)) = uri.split_once(':') {
            if host.contains('@') && !host.contains('/') {
                return Ok(Path::ssh(host, key));
            }
        }
        Ok(Path::local(uri))
    }

    pub fn render(&self) -> String {
        match self.scheme {
            Scheme::Local => self.key.clone(),
            Scheme::S3 | Scheme::Ssh => {
                format!("{}://{}/{}", self.scheme.as_str(), self.authority, self.key)
            }
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The normalized POSIX-style key (S3/SSH) or native path string
    /// (Local).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying OS path, for callers (like the jump scanner) that
    /// need a real filesystem walk and have no local-only equivalent for
    /// S3/SSH.
    pub fn as_local_path(&self) -> Option<std::path::PathBuf> {
        match self.scheme {
            Scheme::Local => Some(std::path::PathBuf::from(&self.key)),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self.scheme {
            Scheme::Local => std::path::Path::new(&self.key)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            Scheme::S3 | Scheme::Ssh => {
                self.key.rsplit('/').next().unwrap_or(&self.key).to_string()
            }
        }
    }

    pub fn suffix(&self) -> Option<String> {
        let name = self.name();
        let ext = name.rsplit('.').next().filter(|e| *e != name)?;
        Some(ext.to_string())
    }

    pub fn parent(&self) -> Option<Path> {
        match self.scheme {
            Scheme::Local => std::path::Path::new(&self.key).parent().map(|p| Path {
                scheme: self.scheme,
                authority: self.authority.clone(),
                key: p.to_string_lossy().to_string(),
            }),
            Scheme::S3 | Scheme::Ssh => {
                if self.key.is_empty() {
                    None
                } else {
                    match self.key.rsplit_once('/') {
                        Some((parent, _)) => Some(Path {
                            scheme: self.scheme,
                            authority: self.authority.clone(),
                            key: parent.to_string(),
                        }),
                        None => Some(Path {
                            scheme: self.scheme,
                            authority: self.authority.clone(),
                            key: String::new(),
                        }),
                    }
                }
            }
        }
    }

    pub fn join(&self, child: &str) -> Path {
        match self.scheme {
            Scheme::Local => Path {
                scheme: self.scheme,
                authority: self.authority.clone(),
                key: std::path::Path::new(&self.key)
                    .join(child)
                    .to_string_lossy()
                    .replace('\\', "/"),
            },
            Scheme::S3 | Scheme::Ssh => {
                let joined = if self.key.is_empty() {
                    child.to_string()
                } else {
                    format!("{}/{}", self.key, child)
                };
                Path {
                    scheme: self.scheme,
                    authority: self.authority.clone(),
                    key: normalize_remote_key(&joined),
                }
            }
        }
    }

    pub fn exists(&self) -> bool {
        self.stat().is_ok()
    }

    pub fn is_dir(&self) -> bool {
        self.stat().map(|e| e.is_dir).unwrap_or(false)
    }

    pub fn is_file(&self) -> bool {
        self.stat().map(|e| !e.is_dir).unwrap_or(false)
    }

    pub fn stat(&self) -> Result<FileEntry> {
        match self.scheme {
            Scheme::Local => local::stat(self),
            Scheme::S3 => s3::stat(self),
            Scheme::Ssh => ssh::stat(self),
        }
    }

    /// Finite, not restartable: call again to re-list the same directory.
    pub fn iterdir(&self) -> Result<DirIter> {
        match self.scheme {
            Scheme::Local => local::iterdir(self),
            Scheme::S3 => s3::iterdir(self),
            Scheme::Ssh => ssh::iterdir(self),
        }
    }

    pub fn open_read(&self) -> Result<Box<dyn Read + Send>> {
        match self.scheme {
            Scheme::Local => local::open_read(self),
            Scheme::S3 => s3::open_read(self),
            Scheme::Ssh => ssh::open_read(self),
        }
    }

    pub fn open_write(&self) -> Result<Box<dyn Write + Send>> {
        match self.scheme {
            Scheme::Local => local::open_write(self),
            Scheme::S3 => s3::open_write(self),
            Scheme::Ssh => ssh::open_write(self),
        }
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open_read()?.read_to_end(&mut buf).map_err(TfmError::io)?;
        Ok(buf)
    }

    pub fn write_bytes(&self, data: &[u8]) -> Result<()> {
        self.open_write()?.write_all(data).map_err(TfmError::io)
    }

    pub fn mkdir(&self, parents: bool, exist_ok: bool) -> Result<()> {
        match self.scheme {
            Scheme::Local => local::mkdir(self, parents, exist_ok),
            Scheme::S3 => s3::mkdir(self, exist_ok),
            Scheme::Ssh => ssh::mkdir(self, parents, exist_ok),
        }
    }

    pub fn unlink(&self) -> Result<()> {
        match self.scheme {
            Scheme::Local => local::unlink(self),
            Scheme::S3 => s3::unlink(self),
            Scheme::Ssh => ssh::unlink(self),
        }
    }

    pub fn rmdir(&self) -> Result<()> {
        match self.scheme {
            Scheme::Local => local::rmdir(self),
            Scheme::S3 => s3::rmdir(self),
            Scheme::Ssh => ssh::rmdir(self),
        }
    }

    /// Renames within the same scheme+authority. Returns
    /// `Err(CrossStorage)` otherwise -- callers must fall back to
    /// copy+delete (see [`crate::ops::copy_or_move`]).
    pub fn rename(&self, dest: &Path) -> Result<()> {
        if self.scheme != dest.scheme || self.authority != dest.authority {
            return Err(TfmError::CrossStorage {
                from: self.render().into(),
                to: dest.render().into(),
            });
        }
        match self.scheme {
            Scheme::Local => local::rename(self, dest),
            Scheme::S3 => s3::rename(self, dest),
            Scheme::Ssh => ssh::rename(self, dest),
        }
    }

    pub fn same_storage(&self, other: &Path) -> bool {
        self.scheme == other.scheme && self.authority == other.authority
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
