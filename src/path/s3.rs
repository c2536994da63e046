//! S3 backend. One [`BucketHandle`] (client + [`RemoteCache`]) per bucket
//! name, built lazily and kept in a process-wide pool -- `rust-s3`'s
//! `Bucket` is cheap to clone but credentials resolution and the region
//! lookup are not things we want to repeat on every `stat`.
//!
//! S3 has no real directories. A key ending in `/` is a zero-byte
//! "directory marker" object; everything else is inferred from common
//! prefixes returned by a delimited `list_objects`.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::{Mutex, OnceLock};
use std::time::SystemTime;

use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use crate::entry::FileEntry;
use crate::error::{Result, TfmError};

use super::cache::RemoteCache;
use super::{DirIter, Path};

struct BucketHandle {
    bucket: Bucket,
    cache: RemoteCache,
}

static POOL: OnceLock<Mutex<HashMap<String, std::sync::Arc<BucketHandle>>>> = OnceLock::new();

fn pool() -> &'static Mutex<HashMap<String, std::sync::Arc<BucketHandle>>> {
    POOL.get_or_init(|| Mutex::new(HashMap::new()))
}

fn region() -> Region {
    match std::env::var("AWS_S3_ENDPOINT") {
        Ok(endpoint) => Region::Custom {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint,
        },
        Err(_) => std::env::var("AWS_REGION")
            .ok()
            .and_then(|r| r.parse().ok())
            .unwrap_or(Region::UsEast1),
    }
}

fn handle_for(bucket_name: &str) -> Result<std::sync::Arc<BucketHandle>> {
    let mut pool = pool().lock().unwrap();
    if let Some(existing) = pool.get(bucket_name) {
        return Ok(existing.clone());
    }

    let credentials = Credentials::default()
        .map_err(|e| TfmError::BadFormat(format!("s3 credentials: {e}")))?;
    let bucket = Bucket::new(bucket_name, region(), credentials)
        .map_err(|e| TfmError::BadFormat(format!("s3 bucket {bucket_name}: {e}")))?
        .with_path_style();

    let handle = std::sync::Arc::new(BucketHandle {
        bucket,
        cache: RemoteCache::new(bucket_name.to_string()),
    });
    pool.insert(bucket_name.to_string(), handle.clone());
    Ok(handle)
}

fn not_found(path: &Path) -> TfmError {
    TfmError::NotFound(path.render().into())
}

fn parse_mtime(raw: Option<&str>) -> SystemTime {
    raw.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| {
            SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(dt.timestamp().max(0) as u64)
        })
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn directory_entry(name: String) -> FileEntry {
    FileEntry::new(name, true, 0, SystemTime::UNIX_EPOCH)
}

pub fn stat(path: &Path) -> Result<FileEntry> {
    let handle = handle_for(path.authority())?;

    if path.key().is_empty() {
        return Ok(directory_entry(path.authority().to_string()));
    }

    if let Some(cached) = handle.cache.get_stat(path.key()) {
        return cached;
    }

    let result = fetch_stat(&handle, path);
    handle.cache.put_stat(path.key(), result.clone());
    result
}

fn fetch_stat(handle: &BucketHandle, path: &Path) -> Result<FileEntry> {
    if let Ok((head, code)) = handle.bucket.head_object(path.key()) {
        if code == 200 {
            let size = head.content_length.unwrap_or(0).max(0) as u64;
            let mtime = parse_mtime(head.last_modified.as_deref());
            return Ok(FileEntry::new(path.name(), false, size, mtime));
        }
    }

    let dir_prefix = format!("{}/", path.key());
    if let Ok((head, code)) = handle.bucket.head_object(&dir_prefix) {
        if code == 200 {
            let _ = head;
            return Ok(directory_entry(path.name()));
        }
    }

    match handle
        .bucket
        .list(dir_prefix, Some("/".to_string()))
    {
        Ok(pages) if pages.iter().any(|p| !p.contents.is_empty() || p.common_prefixes.as_ref().map(|c| !c.is_empty()).unwrap_or(false)) => {
            Ok(directory_entry(path.name()))
        }
        _ => Err(not_found(path)),
    }
}

pub fn iterdir(path: &Path) -> Result<DirIter> {
    let handle = handle_for(path.authority())?;

    if let Some(cached) = handle.cache.get_listing(path.key()) {
        return cached.map(|entries| DirIter::new(entries.into_iter().map(Ok)));
    }

    let entries = fetch_listing(&handle, path);
    handle.cache.put_listing(path.key(), entries.clone());
    entries.map(|entries| DirIter::new(entries.into_iter().map(Ok)))
}

fn fetch_listing(handle: &BucketHandle, path: &Path) -> Result<Vec<FileEntry>> {
    let prefix = if path.key().is_empty() {
        String::new()
    } else {
        format!("{}/", path.key())
    };

    let pages = handle
        .bucket
        .list(prefix.clone(), Some("/".to_string()))
        .map_err(|e| TfmError::BadFormat(format!("s3 list {prefix}: {e}")))?;

    let mut entries = Vec::new();
    for page in pages {
        for object in page.contents {
            if object.key == prefix {
                continue; // the directory marker for this directory itself
            }
            let name = object.key.trim_start_matches(&prefix as &str).to_string();
            if name.is_empty() || name.contains('/') {
                continue;
            }
            let mtime = parse_mtime(Some(&object.last_modified));
            entries.push(FileEntry::new(name, false, object.size, mtime));
        }
        if let Some(common) = page.common_prefixes {
            for cp in common {
                let name = cp
                    .prefix
                    .trim_start_matches(&prefix as &str)
                    .trim_end_matches('/')
                    .to_string();
                if !name.is_empty() {
                    entries.push(directory_entry(name));
                }
            }
        }
    }
    Ok(entries)
}

pub fn open_read(path: &Path) -> Result<Box<dyn Read + Send>> {
    let handle = handle_for(path.authority())?;
    let response = handle
        .bucket
        .get_object(path.key())
        .map_err(|_| not_found(path))?;
    Ok(Box::new(Cursor::new(response.bytes().to_vec())))
}

struct UploadWriter {
    handle: std::sync::Arc<BucketHandle>,
    key: String,
    parent_key: String,
    buffer: Vec<u8>,
}

impl Write for UploadWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.handle
            .bucket
            .put_object(&self.key, &self.buffer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        self.handle.cache.invalidate(&self.key, &self.parent_key);
        Ok(())
    }
}

impl Drop for UploadWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

pub fn open_write(path: &Path) -> Result<Box<dyn Write + Send>> {
    let handle = handle_for(path.authority())?;
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    Ok(Box::new(UploadWriter {
        handle,
        key: path.key().to_string(),
        parent_key,
        buffer: Vec::new(),
    }))
}

pub fn mkdir(path: &Path, exist_ok: bool) -> Result<()> {
    let handle = handle_for(path.authority())?;
    let marker_key = format!("{}/", path.key());
    let exists = matches!(handle.bucket.head_object(&marker_key), Ok((_, 200)));
    if exists && !exist_ok {
        return Err(TfmError::AlreadyExists(path.render().into()));
    }
    handle
        .bucket
        .put_object(&marker_key, &[])
        .map_err(|e| TfmError::BadFormat(format!("s3 mkdir {marker_key}: {e}")))?;
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    handle.cache.invalidate(path.key(), &parent_key);
    Ok(())
}

pub fn unlink(path: &Path) -> Result<()> {
    let handle = handle_for(path.authority())?;
    handle
        .bucket
        .delete_object(path.key())
        .map_err(|_| not_found(path))?;
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    handle.cache.invalidate(path.key(), &parent_key);
    Ok(())
}

pub fn rmdir(path: &Path) -> Result<()> {
    let handle = handle_for(path.authority())?;
    let marker_key = format!("{}/", path.key());
    handle
        .bucket
        .delete_object(&marker_key)
        .map_err(|_| not_found(path))?;
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    handle.cache.invalidate(path.key(), &parent_key);
    Ok(())
}

/// `rust-s3` has no native server-side copy in the sync client we depend
/// on, so a rename is a download, an upload under the new key, and a
/// delete of the old one. Not atomic -- acceptable for a facade whose
/// contract is "eventually consistent remote backend", not a transaction.
pub fn rename(path: &Path, dest: &Path) -> Result<()> {
    let handle = handle_for(path.authority())?;
    let data = handle
        .bucket
        .get_object(path.key())
        .map_err(|_| not_found(path))?;
    handle
        .bucket
        .put_object(dest.key(), &data.bytes())
        .map_err(|e| TfmError::BadFormat(format!("s3 rename put {}: {e}", dest.key())))?;
    handle
        .bucket
        .delete_object(path.key())
        .map_err(|e| TfmError::BadFormat(format!("s3 rename delete {}: {e}", path.key())))?;

    let src_parent = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    let dest_parent = dest.parent().map(|p| p.key().to_string()).unwrap_or_default();
    handle.cache.invalidate(path.key(), &src_parent);
    handle.cache.invalidate(dest.key(), &dest_parent);
    Ok(())
}
