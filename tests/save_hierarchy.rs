use std::fs;
use zipper::{AddFlags, OpenMode, OverwritePolicy, Source, Target, Unzipper, Zipper};

#[test]
fn save_hierarchy_preserves_the_directory_tree_on_add_and_extract() {
    let source_dir = tempfile::tempdir().unwrap();
    let nested = source_dir.path().join("data").join("somefolder");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("test.txt"), b"nested content").unwrap();

    let mut bytes = Vec::new();
    let mut zipper = Zipper::new(Target::vector(&mut bytes));
    zipper.open(OpenMode::Overwrite).unwrap();
    zipper
        .add_path(source_dir.path().join("data"), "data", AddFlags::default().with_save_hierarchy(true))
        .unwrap();
    zipper.close().unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    let mut names: Vec<String> = unzipper
        .entries()
        .unwrap()
        .into_iter()
        .filter(|e| !e.is_directory())
        .map(|e| e.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["data/somefolder/test.txt".to_string()]);

    let extract_dir = tempfile::tempdir().unwrap();
    zipper::extract_all(
        &mut unzipper,
        None,
        extract_dir.path().to_str().unwrap(),
        &Default::default(),
        OverwritePolicy::DoNotOverwrite,
        |_| {},
    )
    .unwrap();

    let extracted = extract_dir.path().join("data").join("somefolder").join("test.txt");
    assert_eq!(fs::read(extracted).unwrap(), b"nested content");
}

#[test]
fn without_save_hierarchy_only_the_basename_is_kept() {
    let source_dir = tempfile::tempdir().unwrap();
    let nested = source_dir.path().join("somefolder");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("test.txt"), b"flat content").unwrap();

    let mut bytes = Vec::new();
    let mut zipper = Zipper::new(Target::vector(&mut bytes));
    zipper.open(OpenMode::Overwrite).unwrap();
    zipper
        .add_path(nested.join("test.txt"), "test.txt", AddFlags::default())
        .unwrap();
    zipper.close().unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    let names: Vec<String> = unzipper.entries().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["test.txt".to_string()]);
}
