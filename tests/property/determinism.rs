//! Property-based tests for content addressing guarantees

use proptest::prelude::*;
use reclaim::content::{registry, ContentStore, HashAlgorithm};
use std::fs;

/// Storing the same bytes twice yields one blob and one locator
#[test]
fn test_store_idempotence_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    runner
        .run(&any::<Vec<u8>>(), |content| {
            let temp_dir = tempfile::TempDir::new().unwrap();
            for &algorithm in registry() {
                let store = ContentStore::new(temp_dir.path(), algorithm).unwrap();
                let first = store.store_bytes(&content).unwrap();
                let second = store.store_bytes(&content).unwrap();

                prop_assert_eq!(&first.backup_path, &second.backup_path);
                prop_assert_eq!(&first.content_hash, &second.content_hash);
                prop_assert!(!second.newly_written);
                prop_assert_eq!(store.blobs_written(), 1);
                prop_assert_eq!(first.size, content.len() as u64);
                prop_assert_eq!(fs::read(&first.backup_path).unwrap(), content.clone());
            }
            Ok(())
        })
        .unwrap();
}

/// Streaming and in-memory hashing agree
#[test]
fn test_reader_matches_bytes_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(any::<u8>(), 0..200_000), |content| {
            for &algorithm in registry() {
                let expected = algorithm.hash_bytes(&content);
                let mut reader = content.as_slice();
                let (streamed, len) = algorithm.hash_reader(&mut reader).unwrap();
                prop_assert_eq!(streamed, expected);
                prop_assert_eq!(len, content.len() as u64);
            }
            Ok(())
        })
        .unwrap();
}

/// Distinct content never shares a locator
#[test]
fn test_distinct_content_distinct_locator_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    runner
        .run(
            &(any::<Vec<u8>>(), any::<Vec<u8>>()),
            |(content1, content2)| {
                prop_assume!(content1 != content2);
                let temp_dir = tempfile::TempDir::new().unwrap();
                let store = ContentStore::new(temp_dir.path(), HashAlgorithm::Blake3).unwrap();
                let first = store.store_bytes(&content1).unwrap();
                let second = store.store_bytes(&content2).unwrap();

                prop_assert_ne!(&first.backup_path, &second.backup_path);
                prop_assert_eq!(store.blobs_written(), 2);
                Ok(())
            },
        )
        .unwrap();
}

/// A locator parses back to the hash it was built from
#[test]
fn test_locator_parse_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    runner
        .run(&any::<Vec<u8>>(), |content| {
            let temp_dir = tempfile::TempDir::new().unwrap();
            let store = ContentStore::new(temp_dir.path(), HashAlgorithm::Sha256).unwrap();
            let stored = store.store_bytes(&content).unwrap();
            prop_assert_eq!(store.locate(&stored.backup_path).unwrap(), stored.content_hash);
            Ok(())
        })
        .unwrap();
}
