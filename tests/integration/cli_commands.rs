//! End-to-end runs of the `reclaim` binary: exit codes and output shape

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn reclaim(home: &Path, base: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_reclaim"))
        .arg("--base-dir")
        .arg(base)
        .arg("--quiet")
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("RECLAIM_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run reclaim binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("files")).unwrap();
        Self { dir }
    }

    fn base(&self) -> std::path::PathBuf {
        self.dir.path().join("state")
    }

    fn run(&self, args: &[&str]) -> Output {
        reclaim(self.dir.path(), &self.base(), args)
    }

    fn file(&self, name: &str, contents: &str) -> std::path::PathBuf {
        let path = self.dir.path().join("files").join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn create(&self, path: &Path) -> String {
        let out = self.run(&[
            "rollback",
            "create",
            path.to_str().unwrap(),
            "--format",
            "json",
        ]);
        assert!(out.status.success(), "create failed: {}", stderr(&out));
        let parsed: Value = serde_json::from_str(&stdout(&out)).unwrap();
        parsed["snapshot_id"].as_str().unwrap().to_string()
    }
}

#[test]
fn list_on_fresh_state_succeeds() {
    let env = Env::new();
    let out = env.run(&["rollback", "list"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("No snapshots."));
    assert!(text.contains("No transactions."));
}

#[test]
fn create_then_restore_round_trips() {
    let env = Env::new();
    let file = env.file("notes.txt", "before");
    let id = env.create(&file);
    assert!(id.starts_with("snap-"));

    fs::write(&file, "after").unwrap();
    let out = env.run(&["rollback", "restore", &id]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("Restored 1 file(s)"));
    assert_eq!(fs::read_to_string(&file).unwrap(), "before");

    let listed = env.run(&["rollback", "list", "--snapshots", "--format", "json"]);
    let parsed: Value = serde_json::from_str(&stdout(&listed)).unwrap();
    assert_eq!(parsed["snapshots"][0]["snapshot_id"], Value::String(id));
    assert!(parsed.get("transactions").is_none());
}

#[test]
fn create_expands_directories() {
    let env = Env::new();
    env.file("one.txt", "1");
    env.file("two.txt", "2");
    let dir = env.dir.path().join("files");
    let out = env.run(&[
        "rollback",
        "create",
        dir.to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert!(out.status.success(), "{}", stderr(&out));
    let parsed: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(parsed["file_count"], Value::from(2));
}

#[test]
fn create_of_missing_file_fails() {
    let env = Env::new();
    let missing = env.dir.path().join("files").join("absent.txt");
    let out = env.run(&["rollback", "create", missing.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).starts_with("Error:"));
}

#[test]
fn delete_reports_unknown_and_removes_known() {
    let env = Env::new();
    let out = env.run(&["rollback", "delete", "snap-unknown", "--yes"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("snap-unknown"));

    let file = env.file("doomed.txt", "x");
    let id = env.create(&file);
    let out = env.run(&["rollback", "delete", &id, "--yes"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let out = env.run(&["rollback", "show", &id]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn restore_of_unknown_snapshot_fails() {
    let env = Env::new();
    let out = env.run(&["rollback", "restore", "snap-nope"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Snapshot not found"));
}

#[test]
fn undo_with_empty_ledger_fails() {
    let env = Env::new();
    let out = env.run(&["rollback", "undo"]);
    assert_eq!(out.status.code(), Some(1));
    let out = env.run(&["rollback", "undo", "--restore"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn verify_detects_corrupt_blob() {
    let env = Env::new();
    let file = env.file("precious.txt", "precious");
    let id = env.create(&file);

    let out = env.run(&["rollback", "verify", &id]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("intact"));

    let shown = env.run(&["rollback", "show", &id, "--format", "json"]);
    let parsed: Value = serde_json::from_str(&stdout(&shown)).unwrap();
    let blob = parsed["files"][0]["backup_path"].as_str().unwrap().to_string();
    fs::write(&blob, "tampered").unwrap();

    let out = env.run(&["rollback", "verify", &id]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("failed verification"));
    assert!(err.contains("blake3"));
}

#[test]
fn pending_reports_no_orphans() {
    let env = Env::new();
    let out = env.run(&["rollback", "pending"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("No orphaned transactions"));
}

#[test]
fn config_show_includes_base_dir() {
    let env = Env::new();
    let out = env.run(&["config", "show"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("[storage]"));
    assert!(text.contains("hash_algorithm = \"blake3\""));
    assert!(text.contains(&env.base().display().to_string()));
}
