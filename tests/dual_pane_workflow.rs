//! End-to-end exercise of the pieces a real session wires together:
//! listing a directory into a pane, copying a file to the other pane,
//! archiving a folder, and batch-renaming the result -- all against the
//! local backend so the test needs no network fixtures.

use tempfile::tempdir;

use tfm_core::batch_rename::{BatchRename, RenameToken};
use tfm_core::ops::archive::{ArchiveFormat, CompressOptions, ExtractOptions};
use tfm_core::ops::{self, FileOperationsManager};
use tfm_core::pane::DualPane;
use tfm_core::path::Path;

#[test]
fn copy_a_file_into_the_inactive_pane_directory() {
    let source_root = tempdir().unwrap();
    let dest_root = tempdir().unwrap();
    std::fs::write(source_root.path().join("notes.txt"), b"hello").unwrap();

    let mut panes = DualPane::new(Path::local(source_root.path()), Path::local(dest_root.path()));
    panes.left.reload().unwrap();
    panes.right.reload().unwrap();

    let manager = FileOperationsManager::new();
    let source = panes.left.path.join("notes.txt");
    let dest = panes.destination_path().join("notes.txt");
    let (tx, _rx) = flume::unbounded();
    manager.copy(&source, &dest, &ops::CancellationToken::new(), &tx).unwrap();

    panes.right.reload().unwrap();
    assert_eq!(panes.right.manager.entries()[0].name, "notes.txt");
    assert_eq!(dest.read_bytes().unwrap(), b"hello");
}

#[test]
fn archive_a_directory_then_extract_it_back() {
    let project = tempdir().unwrap();
    std::fs::create_dir(project.path().join("src")).unwrap();
    std::fs::write(project.path().join("src/main.rs"), b"fn main() {}").unwrap();
    std::fs::write(project.path().join("README.md"), b"# demo").unwrap();

    let archive_path = Path::local(project.path().parent().unwrap().join("project.zip"));
    let source = Path::local(project.path());
    tfm_core::ops::archive::compress(
        &[source],
        &archive_path,
        CompressOptions { format: ArchiveFormat::Zip, level: 6 },
    )
    .unwrap();

    let extract_dir = tempdir().unwrap();
    let dest = Path::local(extract_dir.path());
    tfm_core::ops::archive::extract(&archive_path, &dest, ExtractOptions::default()).unwrap();

    let project_name = project.path().file_name().unwrap().to_string_lossy().to_string();
    let restored_main = dest.join(&project_name).join("src").join("main.rs");
    assert_eq!(restored_main.read_bytes().unwrap(), b"fn main() {}");
}

#[test]
fn batch_rename_a_set_of_exported_screenshots() {
    let dir = tempdir().unwrap();
    let files = ["shot_a.png", "shot_b.png", "shot_c.png"];
    for name in files {
        std::fs::write(dir.path().join(name), b"\x89PNG").unwrap();
    }

    let paths: Vec<Path> = files.iter().map(|n| Path::local(dir.path().join(n))).collect();
    let mut batch = BatchRename::new(paths);
    batch.set_pattern(vec![
        RenameToken::Text("screenshot_".to_string()),
        RenameToken::Counter { start: 1, padding: 2 },
        RenameToken::Extension,
    ]);
    batch.apply().unwrap();

    let mut remaining: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["screenshot_01.png", "screenshot_02.png", "screenshot_03.png"]);
}
