use super::*;

#[test]
fn normalize_collapses_dot_and_dotdot() {
    assert_eq!(normalize_remote_key("a/./b/../c"), "a/c");
    assert_eq!(normalize_remote_key("/a/b/"), "a/b");
    assert_eq!(normalize_remote_key("../a"), "a");
}

#[test]
fn s3_paths_with_different_spelling_are_equal() {
    let a = Path::s3("bucket", "inbox/file.txt");
    let b = Path::s3("bucket", "/inbox/./file.txt");
    assert_eq!(a, b);
}

#[test]
fn parse_and_render_round_trip_for_each_scheme() {
    for uri in ["s3://bucket/inbox/file.txt", "ssh://host/home/user/file.txt", "/local/abs/path"] {
        let path = Path::parse(uri).unwrap();
        let rendered = path.render();
        let reparsed = Path::parse(&rendered).unwrap();
        assert_eq!(path, reparsed);
    }
}

#[test]
fn parse_accepts_local_prefix_and_scp_style_shorthand() {
    assert_eq!(Path::parse("local:.").unwrap(), Path::local("."));
    let scp = Path::parse("me@host:/srv/data").unwrap();
    assert_eq!(scp, Path::ssh("me@host", "/srv/data"));
}

#[test]
fn join_then_parent_recovers_original_directory() {
    let dir = Path::s3("bucket", "photos/2024");
    let child = dir.join("a.jpg");
    assert_eq!(child.key(), "photos/2024/a.jpg");
    assert_eq!(child.parent().unwrap(), dir);
}

#[test]
fn local_join_uses_native_path_joining() {
    let dir = Path::local("/tmp/work");
    let child = dir.join("notes.txt");
    assert_eq!(child.key(), "/tmp/work/notes.txt");
}

#[test]
fn name_and_suffix_are_derived_from_the_key() {
    let path = Path::s3("bucket", "archives/report.tar.gz");
    assert_eq!(path.name(), "report.tar.gz");
    assert_eq!(path.suffix().as_deref(), Some("gz"));
}

#[test]
fn rename_across_different_authorities_is_cross_storage() {
    let from = Path::s3("bucket-a", "a.txt");
    let to = Path::s3("bucket-b", "a.txt");
    let err = from.rename(&to).unwrap_err();
    assert!(matches!(err, TfmError::CrossStorage { .. }));
}

#[test]
fn rename_across_schemes_is_cross_storage() {
    let from = Path::local("/tmp/a.txt");
    let to = Path::ssh("host", "a.txt");
    let err = from.rename(&to).unwrap_err();
    assert!(matches!(err, TfmError::CrossStorage { .. }));
}

#[test]
fn same_storage_is_true_only_for_matching_scheme_and_authority() {
    let a = Path::ssh("host1", "a.txt");
    let b = Path::ssh("host1", "b.txt");
    let c = Path::ssh("host2", "a.txt");
    assert!(a.same_storage(&b));
    assert!(!a.same_storage(&c));
}
