//! SSH/SFTP backend. Delegates the actual wire protocol to the system
//! `ssh`/`sftp` binaries; this module owns only the connection lifecycle
//! (one control-master socket per authority, reused across every request)
//! and result caching.
//!
//! The exact sftp batch-command text is considered external plumbing --
//! the engineering surface this module actually owns is the control-master
//! socket path convention, the per-authority singleton + mutex, and
//! mapping the remote exit status into [`TfmError`].

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::{Mutex, OnceLock};
use std::time::SystemTime;

use crate::entry::FileEntry;
use crate::error::{Result, TfmError};

use super::cache::RemoteCache;
use super::{DirIter, Path};

/// Connection details for one SSH authority. The default resolver treats
/// the authority string as a literal hostname and leaves everything else
/// to `~/.ssh/config`; a host-config file loader can install a richer
/// resolver via [`set_host_config_resolver`].
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    pub hostname: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<String>,
}

pub trait HostConfigResolver: Send + Sync {
    fn resolve(&self, alias: &str) -> HostConfig;
}

struct DefaultHostConfigResolver;

impl HostConfigResolver for DefaultHostConfigResolver {
    fn resolve(&self, _alias: &str) -> HostConfig {
        HostConfig::default()
    }
}

static RESOLVER: OnceLock<Mutex<Box<dyn HostConfigResolver>>> = OnceLock::new();

fn resolver() -> &'static Mutex<Box<dyn HostConfigResolver>> {
    RESOLVER.get_or_init(|| Mutex::new(Box::new(DefaultHostConfigResolver)))
}

pub fn set_host_config_resolver(resolver_impl: Box<dyn HostConfigResolver>) {
    *resolver().lock().unwrap() = resolver_impl;
}

struct Connection {
    authority: String,
    socket_path: std::path::PathBuf,
    ssh_target: String,
    extra_args: Vec<String>,
    cache: RemoteCache,
    master_started: Mutex<bool>,
}

static POOL: OnceLock<Mutex<HashMap<String, std::sync::Arc<Connection>>>> = OnceLock::new();

fn pool() -> &'static Mutex<HashMap<String, std::sync::Arc<Connection>>> {
    POOL.get_or_init(|| Mutex::new(HashMap::new()))
}

fn hash_hostname(hostname: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    hostname.hash(&mut hasher);
    hasher.finish()
}

/// `~/.tfm/ssh_sockets/tfm-ssh-<hostnameHash>-<pid>` -- per-user,
/// per-host, per-process, so two tfm processes never fight over the same
/// control-master socket.
fn socket_path_for(hostname: &str) -> std::path::PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".tfm")
        .join("ssh_sockets");
    let _ = std::fs::create_dir_all(&dir);
    dir.join(format!(
        "tfm-ssh-{:x}-{}",
        hash_hostname(hostname),
        std::process::id()
    ))
}

fn connection_for(authority: &str) -> std::sync::Arc<Connection> {
    let mut pool = pool().lock().unwrap();
    if let Some(existing) = pool.get(authority) {
        return existing.clone();
    }

    let config = resolver().lock().unwrap().resolve(authority);
    let hostname = config.hostname.clone().unwrap_or_else(|| authority.to_string());
    let mut extra_args = Vec::new();
    if let Some(port) = config.port {
        extra_args.push("-p".to_string());
        extra_args.push(port.to_string());
    }
    if let Some(identity) = &config.identity_file {
        extra_args.push("-i".to_string());
        extra_args.push(identity.clone());
    }
    let ssh_target = match &config.user {
        Some(user) => format!("{user}@{hostname}"),
        None => hostname.clone(),
    };

    let connection = std::sync::Arc::new(Connection {
        authority: authority.to_string(),
        socket_path: socket_path_for(&hostname),
        ssh_target,
        extra_args,
        cache: RemoteCache::new(authority.to_string()),
        master_started: Mutex::new(false),
    });
    pool.insert(authority.to_string(), connection.clone());
    connection
}

impl Connection {
    fn ensure_master(&self) -> Result<()> {
        let mut started = self.master_started.lock().unwrap();
        if *started {
            return Ok(());
        }

        let check = Command::new("ssh")
            .args(["-S", &self.socket_path.to_string_lossy(), "-O", "check", &self.ssh_target])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Ok(status) = check {
            if status.success() {
                *started = true;
                return Ok(());
            }
        }

        let mut command = Command::new("ssh");
        command
            .args(["-MNf", "-o", "ControlPersist=600"])
            .args(["-S", &self.socket_path.to_string_lossy()])
            .args(&self.extra_args)
            .arg(&self.ssh_target);
        let status = command
            .status()
            .map_err(|e| TfmError::BadFormat(format!("spawning ssh control master: {e}")))?;
        if !status.success() {
            return Err(TfmError::NetworkTimeout(std::time::Duration::from_secs(10)));
        }
        *started = true;
        Ok(())
    }

    fn sftp_batch(&self, commands: &[String]) -> Result<String> {
        self.ensure_master()?;
        let mut command = Command::new("sftp");
        command
            .args(["-b", "-"])
            .args(["-o", &format!("ControlPath={}", self.socket_path.to_string_lossy())])
            .args(&self.extra_args)
            .arg(&self.ssh_target)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| TfmError::BadFormat(format!("spawning sftp: {e}")))?;
        {
            let stdin = child.stdin.as_mut().expect("piped stdin");
            let script = commands.join("\n") + "\n";
            stdin
                .write_all(script.as_bytes())
                .map_err(TfmError::io)?;
        }
        let output = child.wait_with_output().map_err(TfmError::io)?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(TfmError::BadFormat(format!("sftp: {message}")));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn quoted(path: &str) -> String {
        shell_words::quote(path).to_string()
    }
}

/// Parses one line of `sftp ls -la` output:
/// `-rw-r--r--    1 user group      1234 Jan  1 00:00 filename`
fn parse_ls_line(line: &str) -> Option<FileEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 9 {
        return None;
    }
    let perms = fields[0];
    if perms.len() < 1 {
        return None;
    }
    let is_dir = perms.starts_with('d');
    let is_symlink = perms.starts_with('l');
    let size: u64 = fields[4].parse().unwrap_or(0);
    let name_field = fields[8..].join(" ");
    let name = name_field.split(" -> ").next().unwrap_or(&name_field).to_string();
    if name == "." || name == ".." {
        return None;
    }
    let mode = parse_permission_bits(perms);
    let mtime = SystemTime::now(); // sftp ls doesn't give a parseable epoch cheaply; refined by a later `stat`.

    let mut entry = if is_symlink {
        FileEntry::symlink(name, size, mtime)
    } else {
        FileEntry::new(name, is_dir, size, mtime)
    };
    entry = entry.with_mode(mode);
    Some(entry)
}

fn parse_permission_bits(perms: &str) -> u32 {
    let mut mode = 0u32;
    for (i, ch) in perms.chars().skip(1).take(9).enumerate() {
        if ch != '-' {
            mode |= 1 << (8 - i);
        }
    }
    mode
}

pub fn stat(path: &Path) -> Result<FileEntry> {
    let connection = connection_for(path.authority());
    if let Some(cached) = connection.cache.get_stat(path.key()) {
        return cached;
    }
    let result = fetch_stat(&connection, path);
    connection.cache.put_stat(path.key(), result.clone());
    result
}

fn fetch_stat(connection: &Connection, path: &Path) -> Result<FileEntry> {
    let command = format!("ls -la {}", Connection::quoted(path.key()));
    let output = connection.sftp_batch(&[command])?;
    for line in output.lines() {
        if let Some(mut entry) = parse_ls_line(line) {
            if entry.name == path.name() || line.trim_start().ends_with(&path.name()) {
                entry.name = path.name();
                return Ok(entry);
            }
        }
    }
    Err(TfmError::NotFound(path.render().into()))
}

pub fn iterdir(path: &Path) -> Result<DirIter> {
    let connection = connection_for(path.authority());
    if let Some(cached) = connection.cache.get_listing(path.key()) {
        return cached.map(|entries| DirIter::new(entries.into_iter().map(Ok)));
    }

    let target = if path.key().is_empty() { ".".to_string() } else { path.key().to_string() };
    let command = format!("ls -la {}", Connection::quoted(&target));
    let result = connection.sftp_batch(&[command]).map(|output| {
        output.lines().filter_map(parse_ls_line).collect::<Vec<_>>()
    });
    connection.cache.put_listing(path.key(), result.clone());
    result.map(|entries| DirIter::new(entries.into_iter().map(Ok)))
}

pub fn open_read(path: &Path) -> Result<Box<dyn Read + Send>> {
    let connection = connection_for(path.authority());
    let local = tempfile::NamedTempFile::new().map_err(TfmError::io)?;
    let command = format!(
        "get {} {}",
        Connection::quoted(path.key()),
        Connection::quoted(&local.path().to_string_lossy())
    );
    connection.sftp_batch(&[command])?;
    let file = std::fs::File::open(local.path()).map_err(TfmError::io)?;
    Ok(Box::new(DownloadedFile {
        file,
        _temp: local,
    }))
}

struct DownloadedFile {
    file: std::fs::File,
    _temp: tempfile::NamedTempFile,
}

impl Read for DownloadedFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

struct UploadWriter {
    connection: std::sync::Arc<Connection>,
    remote_key: String,
    parent_key: String,
    local: tempfile::NamedTempFile,
}

impl Write for UploadWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.local.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.local.flush()?;
        let command = format!(
            "put {} {}",
            Connection::quoted(&self.local.path().to_string_lossy()),
            Connection::quoted(&self.remote_key)
        );
        self.connection
            .sftp_batch(&[command])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        self.connection.cache.invalidate(&self.remote_key, &self.parent_key);
        Ok(())
    }
}

impl Drop for UploadWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

pub fn open_write(path: &Path) -> Result<Box<dyn Write + Send>> {
    let connection = connection_for(path.authority());
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    let local = tempfile::NamedTempFile::new().map_err(TfmError::io)?;
    Ok(Box::new(UploadWriter {
        connection,
        remote_key: path.key().to_string(),
        parent_key,
        local,
    }))
}

pub fn mkdir(path: &Path, parents: bool, exist_ok: bool) -> Result<()> {
    let connection = connection_for(path.authority());
    let mut commands = Vec::new();
    if parents {
        let mut built = String::new();
        for segment in path.key().split('/').filter(|s| !s.is_empty()) {
            if !built.is_empty() {
                built.push('/');
            }
            built.push_str(segment);
            commands.push(format!("-mkdir {}", Connection::quoted(&built)));
        }
    } else {
        commands.push(format!("mkdir {}", Connection::quoted(path.key())));
    }
    let result = connection.sftp_batch(&commands);
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    connection.cache.invalidate(path.key(), &parent_key);
    match result {
        Ok(_) => Ok(()),
        Err(_) if exist_ok => Ok(()),
        Err(e) => Err(e),
    }
}

pub fn unlink(path: &Path) -> Result<()> {
    let connection = connection_for(path.authority());
    let command = format!("rm {}", Connection::quoted(path.key()));
    connection.sftp_batch(&[command])?;
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    connection.cache.invalidate(path.key(), &parent_key);
    Ok(())
}

pub fn rmdir(path: &Path) -> Result<()> {
    let connection = connection_for(path.authority());
    let command = format!("rmdir {}", Connection::quoted(path.key()));
    connection.sftp_batch(&[command])?;
    let parent_key = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    connection.cache.invalidate(path.key(), &parent_key);
    Ok(())
}

pub fn rename(path: &Path, dest: &Path) -> Result<()> {
    let connection = connection_for(path.authority());
    let command = format!(
        "rename {} {}",
        Connection::quoted(path.key()),
        Connection::quoted(dest.key())
    );
    connection.sftp_batch(&[command])?;
    let src_parent = path.parent().map(|p| p.key().to_string()).unwrap_or_default();
    let dest_parent = dest.parent().map(|p| p.key().to_string()).unwrap_or_default();
    connection.cache.invalidate(path.key(), &src_parent);
    connection.cache.invalidate(dest.key(), &dest_parent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regular_file_listing_line() {
        let line = "-rw-r--r--    1 user  group      1234 Jan  1 00:00 notes.txt";
        let entry = parse_ls_line(line).unwrap();
        assert_eq!(entry.name, "notes.txt");
        assert_eq!(entry.size, 1234);
        assert!(!entry.is_dir);
    }

    #[test]
    fn parses_directory_listing_line() {
        let line = "drwxr-xr-x    2 user  group      4096 Jan  1 00:00 projects";
        let entry = parse_ls_line(line).unwrap();
        assert!(entry.is_dir);
        assert_eq!(entry.name, "projects");
    }

    #[test]
    fn skips_dot_and_dotdot_entries() {
        assert!(parse_ls_line("drwxr-xr-x 2 u g 4096 Jan 1 00:00 .").is_none());
        assert!(parse_ls_line("drwxr-xr-x 2 u g 4096 Jan 1 00:00 ..").is_none());
    }

    #[test]
    fn socket_path_is_stable_per_process() {
        let a = socket_path_for("example.com");
        let b = socket_path_for("example.com");
        assert_eq!(a, b);
        assert!(a.to_string_lossy().contains(&std::process::id().to_string()));
    }
}
