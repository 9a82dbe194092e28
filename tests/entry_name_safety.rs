use zipper::{AddFlags, OpenMode, Target, Zipper, ZipperErrorKind};

#[test]
fn rejects_a_name_that_escapes_via_leading_dotdot() {
    let mut bytes = Vec::new();
    let mut zipper = Zipper::new(Target::vector(&mut bytes));
    zipper.open(OpenMode::Overwrite).unwrap();

    let result = zipper.add("../Test1", &b"payload"[..], AddFlags::default());
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind(), ZipperErrorKind::SecurityError);

    zipper.close().unwrap();
    // No entries were ever added to the central directory.
    assert!(zip_entry_names(&bytes).is_empty());
}

#[test]
fn canonicalizes_an_escaping_but_resolvable_name() {
    let mut bytes = Vec::new();
    let mut zipper = Zipper::new(Target::vector(&mut bytes));
    zipper.open(OpenMode::Overwrite).unwrap();
    zipper.add("foo/../Test1", &b"payload"[..], AddFlags::default()).unwrap();
    zipper.close().unwrap();

    assert_eq!(zip_entry_names(&bytes), vec!["Test1".to_string()]);
}

fn zip_entry_names(bytes: &[u8]) -> Vec<String> {
    let mut unzipper = zipper::Unzipper::new(zipper::Source::bytes(bytes.to_vec()));
    unzipper.open().unwrap();
    unzipper.entries().unwrap().into_iter().map(|e| e.name).collect()
}
