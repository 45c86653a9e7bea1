// crates/xornet-client/tests/token_tests.rs

use std::fs;

use tempfile::tempdir;
use xornet_client::{FileTokenHolder, MemoryTokenHolder, TokenHolder};

#[test]
fn missing_file_means_no_token() {
    let dir = tempdir().unwrap();
    let holder = FileTokenHolder::open(dir.path().join("token")).unwrap();
    assert!(holder.get().is_none());
}

#[test]
fn set_creates_parent_dirs_and_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join(".xornet").join("token");

    let holder = FileTokenHolder::open(&path).unwrap();
    holder.set("abc123").unwrap();
    assert_eq!(holder.get().as_deref(), Some("abc123"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "abc123");

    let reopened = FileTokenHolder::open(&path).unwrap();
    assert_eq!(reopened.get().as_deref(), Some("abc123"));
}

#[test]
fn contents_are_trimmed_and_placeholders_ignored() {
    let dir = tempdir().unwrap();

    let padded = dir.path().join("padded");
    fs::write(&padded, "  tok\n").unwrap();
    assert_eq!(FileTokenHolder::open(&padded).unwrap().get().as_deref(), Some("tok"));

    let empty = dir.path().join("empty");
    fs::write(&empty, "\n").unwrap();
    assert!(FileTokenHolder::open(&empty).unwrap().get().is_none());

    let undefined = dir.path().join("undefined");
    fs::write(&undefined, "undefined").unwrap();
    assert!(FileTokenHolder::open(&undefined).unwrap().get().is_none());
}

#[test]
fn clear_removes_the_file_and_is_repeatable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("token");

    let holder = FileTokenHolder::open(&path).unwrap();
    holder.set("abc").unwrap();
    holder.clear().unwrap();

    assert!(holder.get().is_none());
    assert!(!path.exists());
    holder.clear().unwrap();
}

#[test]
fn memory_holder_round_trip() {
    let holder = MemoryTokenHolder::new(Some("first"));
    assert_eq!(holder.get().as_deref(), Some("first"));

    holder.set("second").unwrap();
    assert_eq!(holder.get().as_deref(), Some("second"));

    holder.clear().unwrap();
    assert!(holder.get().is_none());
}
