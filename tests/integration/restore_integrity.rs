//! Restore and verification against damaged state: symlinks, corrupt blobs, missing blobs

use super::test_utils::Fixture;
use reclaim::config::RollbackConfig;
use reclaim::RollbackError;
use std::fs;

#[cfg(unix)]
#[test]
fn restore_replaces_dedup_symlink_with_original_file() {
    let fixture = Fixture::new();
    let keeper = fixture.file("keeper.txt", "shared content");
    let duplicate = fixture.file("duplicate.txt", "shared content");
    let snapshot = fixture.manager.create_snapshot(&[&duplicate]).unwrap();

    fs::remove_file(&duplicate).unwrap();
    std::os::unix::fs::symlink(&keeper, &duplicate).unwrap();

    let report = fixture.manager.restore_to_snapshot(&snapshot.snapshot_id).unwrap();
    assert!(report.is_complete());
    assert!(fs::symlink_metadata(&duplicate).unwrap().file_type().is_file());
    assert_eq!(fs::read_to_string(&duplicate).unwrap(), "shared content");
    assert_eq!(fs::read_to_string(&keeper).unwrap(), "shared content");
}

#[cfg(unix)]
#[test]
fn symlink_input_is_rejected() {
    let fixture = Fixture::new();
    let target = fixture.file("target.txt", "t");
    let link = fixture.dir.path().join("files").join("link.txt");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    assert!(matches!(
        fixture.manager.create_snapshot(&[&link]),
        Err(RollbackError::NotAFile(_))
    ));
}

#[test]
fn verification_names_algorithm_of_corrupt_blob() {
    let mut config = RollbackConfig::default();
    config.storage.hash_algorithm = reclaim::HashAlgorithm::Sha256;
    let fixture = Fixture::with_config(config);
    let f = fixture.file("data.bin", "original bytes");
    let snapshot = fixture.manager.create_snapshot(&[&f]).unwrap();

    fs::write(&snapshot.files[0].backup_path, "bit rot").unwrap();
    let report = fixture.manager.verify_snapshot(&snapshot.snapshot_id).unwrap();

    assert!(!report.is_intact());
    assert_eq!(report.corrupt.len(), 1);
    assert_eq!(report.corrupt[0].algorithm, "sha256");
}

#[test]
fn corrupt_blob_is_not_restored_over_current_file() {
    let fixture = Fixture::new();
    let f = fixture.file("doc.txt", "good");
    let snapshot = fixture.manager.create_snapshot(&[&f]).unwrap();
    fs::write(&snapshot.files[0].backup_path, "evil").unwrap();
    fs::write(&f, "current").unwrap();

    let report = fixture.manager.restore_to_snapshot(&snapshot.snapshot_id).unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.failed_paths(), vec![snapshot.files[0].original_path.clone()]);
    assert_eq!(fs::read_to_string(&f).unwrap(), "current");
    assert!(matches!(
        report.into_result(),
        Err(RollbackError::Restore { .. })
    ));
}

#[test]
fn deleting_snapshot_keeps_blobs_for_other_snapshots() {
    let fixture = Fixture::new();
    let f = fixture.file("kept.txt", "blob");
    let first = fixture.manager.create_snapshot(&[&f]).unwrap();
    let second = fixture.manager.create_snapshot(&[&f]).unwrap();

    assert!(fixture.manager.delete_snapshot(&first.snapshot_id).unwrap());
    assert!(!fixture.manager.delete_snapshot(&first.snapshot_id).unwrap());

    let remaining = fixture.manager.list_snapshots().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].snapshot_id, second.snapshot_id);
    assert!(fixture
        .manager
        .verify_snapshot(&second.snapshot_id)
        .unwrap()
        .is_intact());
}

#[test]
fn snapshot_records_persist_across_managers() {
    let fixture = Fixture::new();
    let f = fixture.file("persist.txt", "durable");
    let snapshot = fixture.manager.create_snapshot(&[&f]).unwrap();

    let reopened = reclaim::SnapshotManager::new(
        fixture.state_dir(),
        reclaim::HashAlgorithm::Blake3,
        reclaim::RestorePolicy::default(),
    )
    .unwrap();
    let loaded = reopened.load_snapshot(&snapshot.snapshot_id).unwrap();
    assert_eq!(loaded, snapshot);
}
