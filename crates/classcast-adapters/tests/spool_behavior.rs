//! Behavior tests for the filesystem spool against real directories.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::PathBuf;

use classcast_adapters::FsSpool;
use tempfile::TempDir;

struct Fixture {
    root: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let input = root.path().join("in");
        let output = root.path().join("out");
        fs::create_dir_all(&input).unwrap();
        Self {
            root,
            input,
            output,
        }
    }

    fn spool(&self) -> FsSpool {
        FsSpool::new(self.input.clone(), self.output.clone(), None, None).unwrap()
    }
}

#[test]
fn test_missing_input_dir_is_rejected() {
    let fixture = Fixture::new();
    let result = FsSpool::new(
        fixture.input.join("missing"),
        fixture.output.clone(),
        None,
        None,
    );
    assert!(result.is_err());
}

#[test]
fn test_output_dir_is_created_eagerly() {
    let fixture = Fixture::new();
    let _spool = fixture.spool();
    assert!(fixture.output.is_dir());
}

#[test]
fn test_new_file_is_deferred_for_one_scan() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    fs::write(fixture.input.join("a.jpg"), b"bytes").unwrap();

    assert!(spool.scan().unwrap().is_empty());
    assert!(spool.has_work());

    let ready = spool.scan().unwrap();
    assert_eq!(ready, vec![fixture.input.join("a.jpg")]);
}

#[test]
fn test_growing_file_stays_deferred() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("upload.png");

    fs::write(&path, b"1234").unwrap();
    assert!(spool.scan().unwrap().is_empty());

    // The writer is still copying; the size changed between scans.
    fs::write(&path, b"12345678").unwrap();
    assert!(spool.scan().unwrap().is_empty());

    assert_eq!(spool.scan().unwrap(), vec![path]);
}

#[test]
fn test_ready_files_come_out_sorted() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    fs::write(fixture.input.join("b.png"), b"x").unwrap();
    fs::write(fixture.input.join("a.png"), b"x").unwrap();

    spool.scan().unwrap();
    let ready = spool.scan().unwrap();
    assert_eq!(
        ready,
        vec![fixture.input.join("a.png"), fixture.input.join("b.png")]
    );
}

#[test]
fn test_unsupported_extensions_are_ignored() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    fs::write(fixture.input.join("notes.txt"), b"hello").unwrap();

    assert!(spool.scan().unwrap().is_empty());
    assert!(spool.scan().unwrap().is_empty());
    assert!(!spool.has_work());
    assert!(fixture.input.join("notes.txt").exists());
}

#[test]
fn test_vanished_file_is_forgotten() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("gone.jpg");

    fs::write(&path, b"x").unwrap();
    spool.scan().unwrap();
    fs::remove_file(&path).unwrap();

    assert!(spool.scan().unwrap().is_empty());
    assert!(!spool.has_work());
}

#[test]
fn test_write_result_lands_in_output() {
    let fixture = Fixture::new();
    let spool = fixture.spool();

    let result = spool
        .write_result(&fixture.input.join("photo.png"), r#"{"cat":0.5}"#)
        .unwrap();

    assert_eq!(result, fixture.output.join("photo.json"));
    assert_eq!(fs::read_to_string(result).unwrap(), "{\"cat\":0.5}\n");
}

#[test]
fn test_write_result_stages_through_tmp() {
    let fixture = Fixture::new();
    let tmp = fixture.root.path().join("tmp");
    let spool = FsSpool::new(
        fixture.input.clone(),
        fixture.output.clone(),
        Some(tmp.clone()),
        None,
    )
    .unwrap();

    let result = spool
        .write_result(&fixture.input.join("photo.png"), "{}")
        .unwrap();

    assert!(result.exists());
    // Nothing is left behind in the staging directory.
    assert_eq!(fs::read_dir(&tmp).unwrap().count(), 0);
}

#[test]
fn test_retire_moves_input_to_output() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("done.jpg");
    fs::write(&path, b"x").unwrap();

    spool.retire(&path, false).unwrap();
    assert!(!path.exists());
    assert!(fixture.output.join("done.jpg").exists());
}

#[test]
fn test_retire_can_delete_input() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("done.jpg");
    fs::write(&path, b"x").unwrap();

    spool.retire(&path, true).unwrap();
    assert!(!path.exists());
    assert!(!fixture.output.join("done.jpg").exists());
}

#[test]
fn test_failed_retire_keeps_the_file_tracked() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("done.jpg");
    fs::write(&path, b"x").unwrap();
    spool.scan().unwrap();

    // Occupy the destination so the move cannot succeed.
    fs::create_dir_all(fixture.output.join("done.jpg")).unwrap();
    assert!(spool.retire(&path, false).is_err());

    // Still tracked at its known size: the next scan hands it straight out.
    assert!(spool.has_work());
    assert_eq!(spool.scan().unwrap(), vec![path]);
}

#[test]
fn test_quarantine_defaults_to_failed_under_input() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("broken.jpg");
    fs::write(&path, b"x").unwrap();

    let target = spool.quarantine(&path).unwrap();
    assert_eq!(target, fixture.input.join("failed").join("broken.jpg"));
    assert!(target.exists());
    assert!(!path.exists());
}

#[test]
fn test_quarantine_dir_is_not_scanned() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("broken.jpg");
    fs::write(&path, b"x").unwrap();
    spool.quarantine(&path).unwrap();

    assert!(spool.scan().unwrap().is_empty());
    assert!(spool.scan().unwrap().is_empty());
}

#[test]
fn test_failed_quarantine_keeps_failure_history() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("stuck.jpg");
    fs::write(&path, b"x").unwrap();
    spool.scan().unwrap();
    assert_eq!(spool.record_failure(&path), 1);

    // Occupy the quarantine target so the move cannot succeed.
    fs::create_dir_all(fixture.input.join("failed").join("stuck.jpg")).unwrap();
    assert!(spool.quarantine(&path).is_err());

    // The counter picks up where it left off instead of restarting at one,
    // and the file stays ready rather than being deferred again.
    assert!(spool.has_work());
    assert_eq!(spool.scan().unwrap(), vec![path.clone()]);
    assert_eq!(spool.record_failure(&path), 2);
}

#[test]
fn test_failure_counter_increments() {
    let fixture = Fixture::new();
    let mut spool = fixture.spool();
    let path = fixture.input.join("flaky.jpg");

    assert_eq!(spool.record_failure(&path), 1);
    assert_eq!(spool.record_failure(&path), 2);
    assert_eq!(spool.record_failure(&path), 3);
}
