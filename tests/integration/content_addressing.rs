//! Content store behavior as seen through snapshots: idempotent writes, dedup, stable locators

use super::test_utils::{count_files, Fixture};
use reclaim::{ContentStore, HashAlgorithm};
use std::fs;
use tempfile::TempDir;

#[test]
fn identical_content_is_written_once() {
    let fixture = Fixture::new();
    let a = fixture.file("a.txt", "dup");
    let b = fixture.file("b.txt", "dup");

    let snapshot = fixture.manager.create_snapshot(&[&a, &b]).unwrap();

    assert_eq!(snapshot.files.len(), 2);
    assert_eq!(snapshot.files[0].content_hash, snapshot.files[1].content_hash);
    assert_eq!(snapshot.files[0].backup_path, snapshot.files[1].backup_path);
    let store = fixture.manager.snapshots().content_store();
    assert_eq!(count_files(store.root()), 1);
    assert_eq!(store.blobs_written(), 1);
}

#[test]
fn storing_twice_returns_same_locator_without_rewriting() {
    let temp_dir = TempDir::new().unwrap();
    let store = ContentStore::new(temp_dir.path(), HashAlgorithm::Blake3).unwrap();

    let first = store.store_bytes(b"same bytes").unwrap();
    let second = store.store_bytes(b"same bytes").unwrap();

    assert_eq!(first.backup_path, second.backup_path);
    assert!(first.newly_written);
    assert!(!second.newly_written);
    assert_eq!(store.blobs_written(), 1);
}

#[test]
fn repeated_snapshots_share_blobs() {
    let fixture = Fixture::new();
    let f = fixture.file("stable.txt", "unchanging");

    let first = fixture.manager.create_snapshot(&[&f]).unwrap();
    let second = fixture.manager.create_snapshot(&[&f]).unwrap();

    assert_ne!(first.snapshot_id, second.snapshot_id);
    assert_eq!(first.files[0].backup_path, second.files[0].backup_path);
    assert_eq!(fixture.manager.snapshots().content_store().blobs_written(), 1);
}

#[test]
fn locator_names_the_algorithm() {
    let temp_dir = TempDir::new().unwrap();
    for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
        let store = ContentStore::new(temp_dir.path(), algorithm).unwrap();
        let blob = store.store_bytes(b"abc").unwrap();
        let relative = blob.backup_path.strip_prefix(store.root()).unwrap();
        let first = relative.components().next().unwrap();
        assert_eq!(first.as_os_str(), algorithm.name());
        assert_eq!(store.locate(&blob.backup_path).unwrap(), blob.content_hash);
    }
}

#[test]
fn sha256_store_matches_known_digest() {
    let temp_dir = TempDir::new().unwrap();
    let store = ContentStore::new(temp_dir.path(), HashAlgorithm::Sha256).unwrap();
    let blob = store.store_bytes(b"abc").unwrap();
    assert_eq!(
        blob.content_hash.hex,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(fs::read(&blob.backup_path).unwrap(), b"abc");
}

#[test]
fn empty_file_is_captured() {
    let fixture = Fixture::new();
    let empty = fixture.file("empty.txt", "");
    let snapshot = fixture.manager.create_snapshot(&[&empty]).unwrap();
    assert_eq!(snapshot.files[0].size, 0);

    fs::write(&empty, "no longer empty").unwrap();
    let report = fixture.manager.restore_to_snapshot(&snapshot.snapshot_id).unwrap();
    assert!(report.is_complete());
    assert_eq!(fs::read(&empty).unwrap(), b"");
}
