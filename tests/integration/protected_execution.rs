//! Protected execution: commit on success, restore and surface the original error on failure

use super::test_utils::Fixture;
use anyhow::{anyhow, Context};
use reclaim::fs_ops;
use reclaim::ledger::OperationKind;
use reclaim::{ProtectedError, TransactionStatus};
use std::fs;

#[test]
fn round_trip_restore() {
    let fixture = Fixture::new();
    let f = fixture.file("note.txt", "hello");

    let snapshot = fixture.manager.create_snapshot(&[&f]).unwrap();
    fs::write(&f, "world").unwrap();
    let report = fixture.manager.restore_to_snapshot(&snapshot.snapshot_id).unwrap();

    assert!(report.is_complete());
    assert_eq!(fs::read_to_string(&f).unwrap(), "hello");
}

#[test]
fn failed_operation_restores_deleted_file() {
    let fixture = Fixture::new();
    let f = fixture.file("important.txt", "do not lose me");

    let result: Result<(), ProtectedError<anyhow::Error>> =
        fixture.manager.execute_with_protection(&[&f], || {
            fs::remove_file(&f).context("removing duplicate")?;
            Err(anyhow!("dedup planner failed after delete"))
        });

    let err = result.unwrap_err();
    let rollback = err.rollback().unwrap();
    assert!(rollback.is_clean());
    let source = err.into_operation_error().unwrap();
    assert_eq!(source.to_string(), "dedup planner failed after delete");
    assert_eq!(fs::read_to_string(&f).unwrap(), "do not lose me");

    let transactions = fixture.manager.list_transactions().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, TransactionStatus::RolledBack);
    assert!(transactions[0].ended_at.is_some());
}

#[test]
fn successful_operation_is_committed_and_kept() {
    let fixture = Fixture::new();
    let keeper = fixture.file("keeper.bin", "payload");
    let duplicate = fixture.file("duplicate.bin", "payload");

    let result: Result<(), ProtectedError<reclaim::RollbackError>> = fixture
        .manager
        .execute_recorded(&[&keeper, &duplicate], |scope| {
            fs_ops::delete_file(scope, &duplicate)
        });
    result.unwrap();

    assert!(!duplicate.exists());
    let transactions = fixture.manager.list_transactions().unwrap();
    assert_eq!(transactions[0].status, TransactionStatus::Committed);
    assert_eq!(transactions[0].operation_count, 1);
}

#[test]
fn recorded_operations_survive_rollback() {
    let fixture = Fixture::new();
    let a = fixture.file("a.txt", "A");
    let b = fixture.file("b.txt", "B");
    let moved = fixture.dir.path().join("files").join("moved.txt");

    let result: Result<(), ProtectedError<reclaim::RollbackError>> =
        fixture.manager.execute_recorded(&[&a, &b], |scope| {
            fs_ops::move_file(scope, &a, &moved)?;
            fs_ops::delete_file(scope, &b)?;
            fs_ops::delete_file(scope, &moved.with_file_name("missing.txt"))
        });

    assert!(matches!(result, Err(ProtectedError::Operation { .. })));
    assert_eq!(fs::read_to_string(&a).unwrap(), "A");
    assert_eq!(fs::read_to_string(&b).unwrap(), "B");

    let summary = &fixture.manager.list_transactions().unwrap()[0];
    let tx = fixture
        .manager
        .ledger()
        .get_transaction(&summary.transaction_id)
        .unwrap()
        .unwrap();
    let kinds: Vec<_> = tx.operations.iter().map(|o| o.kind).collect();
    assert_eq!(
        kinds,
        vec![OperationKind::Move, OperationKind::Delete, OperationKind::Delete]
    );
    assert_eq!(tx.status, TransactionStatus::RolledBack);
}

#[test]
fn setup_failure_leaves_no_trace() {
    let fixture = Fixture::new();
    let missing = fixture.dir.path().join("files").join("ghost.txt");

    let result: Result<(), ProtectedError<anyhow::Error>> =
        fixture.manager.execute_with_protection(&[&missing], || Ok(()));

    assert!(matches!(result, Err(ProtectedError::Setup(_))));
    assert!(fixture.manager.list_snapshots().unwrap().is_empty());
    assert!(fixture.manager.list_transactions().unwrap().is_empty());
}

#[test]
fn undo_with_restore_reverts_committed_operation() {
    let fixture = Fixture::new();
    let f = fixture.file("doc.txt", "version one");

    let result: Result<(), ProtectedError<reclaim::RollbackError>> =
        fixture.manager.execute_recorded(&[&f], |scope| {
            fs_ops::create_file(scope, &f, b"version two")
        });
    result.unwrap();
    assert_eq!(fs::read_to_string(&f).unwrap(), "version two");

    let outcome = fixture
        .manager
        .undo_last_operation_with_restore()
        .unwrap()
        .unwrap();
    assert!(outcome.restore.unwrap().is_complete());
    assert_eq!(fs::read_to_string(&f).unwrap(), "version one");

    // Nothing committed remains
    assert!(!fixture.manager.undo_last_operation().unwrap());
}
