//! Configuration layering as seen by the CLI run context

use super::test_utils::with_xdg_env;
use reclaim::cli::RunContext;
use reclaim::config::ConfigLoader;
use reclaim::{HashAlgorithm, RollbackError};
use std::fs;
use tempfile::TempDir;

fn write_global_config(test_dir: &TempDir, contents: &str) {
    let config_dir = test_dir.path().join("reclaim");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), contents).unwrap();
}

#[test]
fn global_config_selects_hash_algorithm() {
    let test_dir = TempDir::new().unwrap();
    write_global_config(
        &test_dir,
        r#"
[storage]
hash_algorithm = "sha256"
"#,
    );
    let base = test_dir.path().join("state");
    let file = test_dir.path().join("input.txt");
    fs::write(&file, "configured").unwrap();

    let snapshot = with_xdg_env(&test_dir, || {
        let context = RunContext::new(Some(base.clone()), None).unwrap();
        assert_eq!(context.base_dir(), base.as_path());
        context.manager().create_snapshot(&[&file]).unwrap()
    });

    assert_eq!(snapshot.files[0].content_hash.algorithm, HashAlgorithm::Sha256);
    assert!(snapshot.files[0]
        .backup_path
        .starts_with(base.join("blobs").join("sha256")));
}

#[test]
fn base_dir_from_config_file_is_used_without_override() {
    let test_dir = TempDir::new().unwrap();
    let configured = test_dir.path().join("configured-state");
    let explicit = test_dir.path().join("explicit.toml");
    fs::write(
        &explicit,
        format!(
            "[storage]\nbase_dir = \"{}\"\n",
            configured.display().to_string().replace('\\', "\\\\")
        ),
    )
    .unwrap();

    with_xdg_env(&test_dir, || {
        let context = RunContext::new(None, Some(explicit.clone())).unwrap();
        assert_eq!(context.base_dir(), configured.as_path());
        assert!(configured.join("transactions").exists());
    });
}

#[test]
fn environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    write_global_config(
        &test_dir,
        "[recovery]\norphan_after_secs = 120\n",
    );

    let config = with_xdg_env(&test_dir, || {
        std::env::set_var("RECLAIM__RECOVERY__ORPHAN_AFTER_SECS", "30");
        let loaded = ConfigLoader::load(None);
        std::env::remove_var("RECLAIM__RECOVERY__ORPHAN_AFTER_SECS");
        loaded.unwrap()
    });

    assert_eq!(config.recovery.orphan_after_secs, 30);
}

#[test]
fn invalid_config_is_rejected_before_opening_state() {
    let test_dir = TempDir::new().unwrap();
    write_global_config(&test_dir, "[recovery]\norphan_after_secs = 0\n");
    let base = test_dir.path().join("never-created");

    let result = with_xdg_env(&test_dir, || RunContext::new(Some(base.clone()), None));

    assert!(matches!(result, Err(RollbackError::Config(_))));
    assert!(!base.exists());
}
