use super::*;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn drain(rx: &flume::Receiver<SearchMatch>) -> Vec<SearchMatch> {
    let mut out = Vec::new();
    while let Ok(m) = rx.recv_timeout(Duration::from_secs(2)) {
        out.push(m);
    }
    out
}

#[test]
fn filename_search_finds_matching_entries_recursively() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("report.txt"), b"x").unwrap();
    fs::write(dir.path().join("sub/report_final.txt"), b"x").unwrap();
    fs::write(dir.path().join("other.md"), b"x").unwrap();

    let query = SearchQuery {
        pattern: "report".to_string(),
        mode: SearchMode::FileName,
        case_insensitive: true,
        use_regex: false,
    };
    let (handle, rx) = spawn(Path::local(dir.path()), query);
    let matches = drain(&rx);
    handle.cancel_and_wait();

    assert_eq!(matches.len(), 2);
}

#[test]
fn content_search_reports_line_numbers() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("log.txt"), "first\nneedle here\nthird\n").unwrap();

    let query = SearchQuery {
        pattern: "needle".to_string(),
        mode: SearchMode::Content,
        case_insensitive: false,
        use_regex: false,
    };
    let (handle, rx) = spawn(Path::local(dir.path()), query);
    let matches = drain(&rx);
    handle.cancel_and_wait();

    assert_eq!(matches.len(), 1);
    match &matches[0] {
        SearchMatch::Content { line_number, line, .. } => {
            assert_eq!(*line_number, 2);
            assert_eq!(line, "needle here");
        }
        _ => panic!("expected a content match"),
    }
}

#[test]
fn content_search_skips_binary_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bin.dat"), [0u8, 1, 2, b'n', b'e', b'e', b'd', b'l', b'e']).unwrap();

    let query = SearchQuery {
        pattern: "needle".to_string(),
        mode: SearchMode::Content,
        case_insensitive: false,
        use_regex: false,
    };
    let (handle, rx) = spawn(Path::local(dir.path()), query);
    let matches = drain(&rx);
    handle.cancel_and_wait();

    assert!(matches.is_empty());
}

#[test]
fn cancel_stops_a_running_search_quickly() {
    let dir = tempdir().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("file{i}.txt")), b"x").unwrap();
    }

    let query = SearchQuery {
        pattern: "file".to_string(),
        mode: SearchMode::FileName,
        case_insensitive: false,
        use_regex: false,
    };
    let (handle, _rx) = spawn(Path::local(dir.path()), query);
    handle.cancel_and_wait();
}

#[test]
fn invalid_regex_pattern_yields_no_matches_instead_of_panicking() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"x").unwrap();

    let query = SearchQuery {
        pattern: "(unclosed".to_string(),
        mode: SearchMode::FileName,
        case_insensitive: false,
        use_regex: true,
    };
    let (handle, rx) = spawn(Path::local(dir.path()), query);
    let matches = drain(&rx);
    handle.cancel_and_wait();
    assert!(matches.is_empty());
}
