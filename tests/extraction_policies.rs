use std::collections::BTreeMap;
use std::fs;
use zipper::{AddFlags, OpenMode, OverwritePolicy, Source, Target, Unzipper, Zipper};

fn archive_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut zipper = Zipper::new(Target::vector(&mut bytes));
    zipper.open(OpenMode::Overwrite).unwrap();
    for (name, content) in entries {
        zipper.add(name, *content, AddFlags::default()).unwrap();
    }
    zipper.close().unwrap();
    bytes
}

#[test]
fn glob_star_matches_the_same_set_as_no_pattern() {
    let bytes = archive_with(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.log", b"c")]);

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();

    let mut all: Vec<String> = unzipper.entries().unwrap().into_iter().map(|e| e.name).collect();
    let mut starred: Vec<String> = unzipper.entries_matching("*").unwrap().into_iter().map(|e| e.name).collect();
    all.sort();
    starred.sort();
    assert_eq!(all, starred);

    let txt_only: Vec<String> = unzipper
        .entries_matching("*.txt")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(txt_only.len(), 2);
}

#[test]
fn extract_all_with_star_glob_extracts_the_same_set_as_no_glob() {
    let bytes = archive_with(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.log", b"c")]);

    let no_glob_dir = tempfile::tempdir().unwrap();
    let mut unzipper = Unzipper::new(Source::bytes(bytes.clone()));
    unzipper.open().unwrap();
    let mut no_glob = zipper::extract_all(
        &mut unzipper,
        None,
        no_glob_dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::Overwrite,
        |_| {},
    )
    .unwrap();

    let star_glob_dir = tempfile::tempdir().unwrap();
    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    let mut star_glob = zipper::extract_all(
        &mut unzipper,
        Some("*"),
        star_glob_dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::Overwrite,
        |_| {},
    )
    .unwrap();

    no_glob.sort();
    star_glob.sort();
    assert_eq!(no_glob, star_glob);
}

#[test]
fn extract_all_glob_restricts_the_walk_to_matching_entries() {
    let bytes = archive_with(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.log", b"c")]);
    let dir = tempfile::tempdir().unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    let written = zipper::extract_all(
        &mut unzipper,
        Some("*.txt"),
        dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::Overwrite,
        |_| {},
    )
    .unwrap();

    assert_eq!(written.len(), 2);
    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
    assert!(!dir.path().join("c.log").exists());
}

#[test]
fn extract_all_alt_names_remaps_the_on_disk_path() {
    let bytes = archive_with(&[("report.txt", b"contents")]);
    let dir = tempfile::tempdir().unwrap();

    let mut alt_names = BTreeMap::new();
    alt_names.insert("report.txt".to_string(), "renamed/report-2024.txt".to_string());

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    let written = zipper::extract_all(
        &mut unzipper,
        None,
        dir.path().to_str().unwrap(),
        &alt_names,
        OverwritePolicy::Overwrite,
        |_| {},
    )
    .unwrap();

    assert_eq!(written, vec!["renamed/report-2024.txt".to_string()]);
    assert!(!dir.path().join("report.txt").exists());
    assert_eq!(fs::read(dir.path().join("renamed/report-2024.txt")).unwrap(), b"contents");
}

#[test]
fn do_not_overwrite_leaves_existing_file_untouched() {
    let bytes = archive_with(&[("note.txt", b"new content")]);
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("note.txt"), b"original content").unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    let result = zipper::extract_all(
        &mut unzipper,
        None,
        dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::DoNotOverwrite,
        |_| {},
    );

    assert!(result.is_err());
    assert_eq!(fs::read(dir.path().join("note.txt")).unwrap(), b"original content");
}

#[test]
fn overwrite_replaces_the_existing_file() {
    let bytes = archive_with(&[("note.txt", b"new content")]);
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("note.txt"), b"original content").unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    zipper::extract_all(
        &mut unzipper,
        None,
        dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::Overwrite,
        |_| {},
    )
    .unwrap();

    assert_eq!(fs::read(dir.path().join("note.txt")).unwrap(), b"new content");
}

#[test]
fn progress_callback_reports_idle_then_totals_then_ok() {
    let bytes = archive_with(&[("one.txt", b"1"), ("two.txt", b"2")]);
    let dir = tempfile::tempdir().unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();

    let mut statuses = Vec::new();
    zipper::extract_all(
        &mut unzipper,
        None,
        dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::Overwrite,
        |info| statuses.push(info.status),
    )
    .unwrap();

    assert_eq!(statuses.first(), Some(&zipper::ProgressStatus::Idle));
    assert_eq!(statuses.get(1), Some(&zipper::ProgressStatus::InProgress));
    assert_eq!(statuses.last(), Some(&zipper::ProgressStatus::Ok));
}

#[test]
fn progress_callback_reports_byte_level_decode_updates() {
    let bytes = archive_with(&[("big.bin", &[7u8; 1024])]);
    let dir = tempfile::tempdir().unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();

    let mut max_extracted_bytes = 0u64;
    zipper::extract_all(
        &mut unzipper,
        None,
        dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::Overwrite,
        |info| max_extracted_bytes = max_extracted_bytes.max(info.extracted_bytes),
    )
    .unwrap();

    assert_eq!(max_extracted_bytes, 1024);
}
