use zipper::{AddFlags, OpenMode, Source, Target, Unzipper, Zipper, ZipperErrorKind};

#[test]
fn password_round_trips_and_rejects_the_wrong_one() {
    let mut bytes = Vec::new();
    let mut zipper = Zipper::new(Target::vector(&mut bytes));
    zipper.set_password("correct horse battery staple");
    zipper.open(OpenMode::Overwrite).unwrap();
    zipper.add("secret.txt", &b"classified"[..], AddFlags::default()).unwrap();
    zipper.close().unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes.clone()));
    unzipper.set_password("correct horse battery staple");
    unzipper.open().unwrap();
    assert_eq!(unzipper.read("secret.txt").unwrap(), b"classified");

    let mut wrong = Unzipper::new(Source::bytes(bytes));
    wrong.set_password("wrong password");
    wrong.open().unwrap();
    let result = wrong.read("secret.txt");
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind(), ZipperErrorKind::OpeningError);
}

#[test]
fn encrypted_entries_are_reported_as_such() {
    let mut bytes = Vec::new();
    let mut zipper = Zipper::new(Target::vector(&mut bytes));
    zipper.set_password("hunter2");
    zipper.open(OpenMode::Overwrite).unwrap();
    zipper.add("locked.txt", &b"shh"[..], AddFlags::default()).unwrap();
    zipper.close().unwrap();

    let mut unzipper = Unzipper::new(Source::bytes(bytes));
    unzipper.open().unwrap();
    let entries = unzipper.entries().unwrap();
    assert!(entries[0].is_encrypted);
}
