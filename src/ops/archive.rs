//! Archive creation and extraction, built on top of [`crate::path::Path`]
//! so both the archive itself and its contents can live on any backend:
//! archive bytes are always read/written whole (`read_bytes`/`write_bytes`)
//! rather than streamed, since `zip`'s writer needs `Seek` and a `Path`'s
//! write handle over a remote backend generally doesn't offer one.

use std::io::{Cursor, Read};

use bzip2::read::{BzDecoder, BzEncoder};
use bzip2::Compression as BzCompression;
use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression as GzCompression;
use xz2::read::{XzDecoder, XzEncoder};

use crate::error::{Result, TfmError};
use crate::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Gzip,
    Bzip2,
    Xz,
}

impl ArchiveFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
            Some(ArchiveFormat::TarBz2)
        } else if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            Some(ArchiveFormat::TarXz)
        } else if lower.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if lower.ends_with(".gz") {
            Some(ArchiveFormat::Gzip)
        } else if lower.ends_with(".bz2") {
            Some(ArchiveFormat::Bzip2)
        } else if lower.ends_with(".xz") {
            Some(ArchiveFormat::Xz)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::TarBz2 => ".tar.bz2",
            ArchiveFormat::TarXz => ".tar.xz",
            ArchiveFormat::Gzip => ".gz",
            ArchiveFormat::Bzip2 => ".bz2",
            ArchiveFormat::Xz => ".xz",
        }
    }

    fn is_tar_family(self) -> bool {
        matches!(
            self,
            ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 | ArchiveFormat::TarXz
        )
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    Skip,
    Overwrite,
    Fail,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub overwrite: OverwriteMode,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { overwrite: OverwriteMode::Fail }
    }
}

/// Rejects entries whose path would land outside the extraction root:
/// absolute paths and any `..` path component ("zip slip"). Every
/// extraction path in this module is built from a name that has passed
/// this check.
fn guard_entry_path(raw: &str) -> Result<String> {
    let normalized = raw.replace('\\', "/");
    if normalized.starts_with('/') {
        return Err(TfmError::BadFormat(format!(
            "archive entry has an absolute path: {raw}"
        )));
    }
    for component in normalized.split('/') {
        if component == ".." {
            return Err(TfmError::BadFormat(format!(
                "archive entry escapes the extraction directory: {raw}"
            )));
        }
    }
    Ok(normalized)
}

pub fn list_contents(archive: &Path) -> Result<Vec<ArchiveEntry>> {
    let format = ArchiveFormat::from_name(&archive.name())
        .ok_or_else(|| TfmError::Unsupported("unrecognized archive extension"))?;
    let data = archive.read_bytes()?;

    if format == ArchiveFormat::Zip {
        let mut zip = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| TfmError::BadFormat(e.to_string()))?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let file = zip.by_index(i).map_err(|e| TfmError::BadFormat(e.to_string()))?;
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                size: file.size(),
                is_dir: file.is_dir(),
            });
        }
        return Ok(entries);
    }

    if format.is_tar_family() {
        let reader = tar_decoder(format, data)?;
        let mut tar = tar::Archive::new(reader);
        let mut entries = Vec::new();
        for entry in tar.entries().map_err(TfmError::io)? {
            let entry = entry.map_err(TfmError::io)?;
            let header = entry.header();
            entries.push(ArchiveEntry {
                name: entry.path().map_err(TfmError::io)?.to_string_lossy().to_string(),
                size: header.size().unwrap_or(0),
                is_dir: header.entry_type().is_dir(),
            });
        }
        return Ok(entries);
    }

    // single-stream formats (.gz/.bz2/.xz) wrap exactly one file
    Ok(vec![ArchiveEntry {
        name: strip_single_stream_suffix(&archive.name(), format),
        size: 0,
        is_dir: false,
    }])
}

fn strip_single_stream_suffix(name: &str, format: ArchiveFormat) -> String {
    name.strip_suffix(format.extension()).unwrap_or(name).to_string()
}

fn tar_decoder(format: ArchiveFormat, data: Vec<u8>) -> Result<Box<dyn Read>> {
    Ok(match format {
        ArchiveFormat::Tar => Box::new(Cursor::new(data)),
        ArchiveFormat::TarGz => Box::new(GzDecoder::new(Cursor::new(data))),
        ArchiveFormat::TarBz2 => Box::new(BzDecoder::new(Cursor::new(data))),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(Cursor::new(data))),
        _ => return Err(TfmError::Unsupported("not a tar family format")),
    })
}

pub fn extract(archive: &Path, dest: &Path, options: ExtractOptions) -> Result<Vec<ArchiveEntry>> {
    let format = ArchiveFormat::from_name(&archive.name())
        .ok_or_else(|| TfmError::Unsupported("unrecognized archive extension"))?;
    let data = archive.read_bytes()?;
    dest.mkdir(true, true)?;

    match format {
        ArchiveFormat::Zip => extract_zip(data, dest, options),
        ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarBz2 | ArchiveFormat::TarXz => {
            extract_tar(format, data, dest, options)
        }
        ArchiveFormat::Gzip | ArchiveFormat::Bzip2 | ArchiveFormat::Xz => {
            extract_single_stream(format, data, archive, dest, options)
        }
    }
}

fn extract_zip(data: Vec<u8>, dest: &Path, options: ExtractOptions) -> Result<Vec<ArchiveEntry>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| TfmError::BadFormat(e.to_string()))?;
    let mut written = Vec::new();
    for i in 0..zip.len() {
        let mut file = zip.by_index(i).map_err(|e| TfmError::BadFormat(e.to_string()))?;
        let safe_name = guard_entry_path(file.name())?;
        let target = dest.join(&safe_name);

        if file.is_dir() {
            target.mkdir(true, true)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            parent.mkdir(true, true)?;
        }
        if target.exists() && !should_overwrite(&target, options)? {
            continue;
        }
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf).map_err(TfmError::io)?;
        written.push(ArchiveEntry { name: safe_name, size: buf.len() as u64, is_dir: false });
        target.write_bytes(&buf)?;
    }
    Ok(written)
}

fn extract_tar(
    format: ArchiveFormat,
    data: Vec<u8>,
    dest: &Path,
    options: ExtractOptions,
) -> Result<Vec<ArchiveEntry>> {
    let reader = tar_decoder(format, data)?;
    let mut tar = tar::Archive::new(reader);
    let mut written = Vec::new();
    for entry in tar.entries().map_err(TfmError::io)? {
        let mut entry = entry.map_err(TfmError::io)?;
        let raw_name = entry.path().map_err(TfmError::io)?.to_string_lossy().to_string();
        let safe_name = guard_entry_path(&raw_name)?;
        let target = dest.join(&safe_name);

        if entry.header().entry_type().is_dir() {
            target.mkdir(true, true)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            parent.mkdir(true, true)?;
        }
        if target.exists() && !should_overwrite(&target, options)? {
            continue;
        }
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(TfmError::io)?;
        written.push(ArchiveEntry { name: safe_name, size: buf.len() as u64, is_dir: false });
        target.write_bytes(&buf)?;
    }
    Ok(written)
}

fn extract_single_stream(
    format: ArchiveFormat,
    data: Vec<u8>,
    archive: &Path,
    dest: &Path,
    options: ExtractOptions,
) -> Result<Vec<ArchiveEntry>> {
    let name = strip_single_stream_suffix(&archive.name(), format);
    let target = dest.join(&name);
    if target.exists() && !should_overwrite(&target, options)? {
        return Ok(vec![]);
    }
    let mut buf = Vec::new();
    match format {
        ArchiveFormat::Gzip => GzDecoder::new(Cursor::new(data)).read_to_end(&mut buf),
        ArchiveFormat::Bzip2 => BzDecoder::new(Cursor::new(data)).read_to_end(&mut buf),
        ArchiveFormat::Xz => XzDecoder::new(Cursor::new(data)).read_to_end(&mut buf),
        _ => unreachable!(),
    }
    .map_err(TfmError::io)?;
    target.write_bytes(&buf)?;
    Ok(vec![ArchiveEntry { name, size: buf.len() as u64, is_dir: false }])
}

fn should_overwrite(target: &Path, options: ExtractOptions) -> Result<bool> {
    match options.overwrite {
        OverwriteMode::Overwrite => Ok(true),
        OverwriteMode::Skip => Ok(false),
        OverwriteMode::Fail => Err(TfmError::AlreadyExists(target.render().into())),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
    pub format: ArchiveFormat,
    pub level: u32,
}

/// Recursively walks `sources`, builds the archive in memory, and writes
/// the result to `dest` in one shot.
pub fn compress(sources: &[Path], dest: &Path, options: CompressOptions) -> Result<()> {
    let files = collect_files(sources)?;
    let bytes = match options.format {
        ArchiveFormat::Zip => build_zip(&files, options.level)?,
        f if f.is_tar_family() => build_tar(f, &files, options.level)?,
        _ => return Err(TfmError::Unsupported("single-stream compression needs exactly one file")),
    };
    dest.write_bytes(&bytes)
}

/// `(archive-relative path, source Path)` pairs for every regular file
/// under `sources`, walked recursively.
fn collect_files(sources: &[Path]) -> Result<Vec<(String, Path)>> {
    let mut files = Vec::new();
    for source in sources {
        let stat = source.stat()?;
        if stat.is_dir {
            collect_dir_files(source, &source.name(), &mut files)?;
        } else {
            files.push((source.name(), source.clone()));
        }
    }
    Ok(files)
}

fn collect_dir_files(dir: &Path, prefix: &str, out: &mut Vec<(String, Path)>) -> Result<()> {
    for child in dir.iterdir()? {
        let child = child?;
        let child_path = dir.join(&child.name);
        let archive_path = format!("{prefix}/{}", child.name);
        if child.is_dir {
            collect_dir_files(&child_path, &archive_path, out)?;
        } else {
            out.push((archive_path, child_path));
        }
    }
    Ok(())
}

fn build_zip(files: &[(String, Path)], level: u32) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut buffer);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(level as i64));
    for (archive_path, source) in files {
        writer
            .start_file(archive_path, options)
            .map_err(|e| TfmError::BadFormat(e.to_string()))?;
        let data = source.read_bytes()?;
        std::io::Write::write_all(&mut writer, &data).map_err(TfmError::io)?;
    }
    writer.finish().map_err(|e| TfmError::BadFormat(e.to_string()))?;
    Ok(buffer.into_inner())
}

fn build_tar(format: ArchiveFormat, files: &[(String, Path)], level: u32) -> Result<Vec<u8>> {
    let mut tar_bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_bytes);
        for (archive_path, source) in files {
            let data = source.read_bytes()?;
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, archive_path, Cursor::new(data))
                .map_err(TfmError::io)?;
        }
        builder.finish().map_err(TfmError::io)?;
    }

    match format {
        ArchiveFormat::Tar => Ok(tar_bytes),
        ArchiveFormat::TarGz => {
            let mut encoder = GzEncoder::new(Cursor::new(tar_bytes), GzCompression::new(level));
            let mut out = Vec::new();
            encoder.read_to_end(&mut out).map_err(TfmError::io)?;
            Ok(out)
        }
        ArchiveFormat::TarBz2 => {
            let mut encoder = BzEncoder::new(Cursor::new(tar_bytes), BzCompression::new(level));
            let mut out = Vec::new();
            encoder.read_to_end(&mut out).map_err(TfmError::io)?;
            Ok(out)
        }
        ArchiveFormat::TarXz => {
            let mut encoder = XzEncoder::new(Cursor::new(tar_bytes), level);
            let mut out = Vec::new();
            encoder.read_to_end(&mut out).map_err(TfmError::io)?;
            Ok(out)
        }
        _ => unreachable!("handled by is_tar_family"),
    }
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
