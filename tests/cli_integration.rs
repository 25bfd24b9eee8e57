//! CLI Integration Tests
//!
//! These tests verify that the CLI commands work correctly end-to-end.
//! They drive the actual binary, not just the library.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use std::path::Path;
use std::collections::HashSet;
use std::process::{Command, Stdio};
use tempfile::tempdir;

/// Run docvault against `root` and return (stdout, stderr, success)
fn run_docvault(args: &[&str], root: &Path) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_docvault"))
        .args(["-r", root.to_str().unwrap(), "-f", "json"])
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute docvault");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("stdout should be JSON")
}

/// Upload `content` as a file named `name` and return the new id
fn upload(root: &Path, name: &str, content: &[u8], extra: &[&str]) -> String {
    let src_dir = tempdir().unwrap();
    let src = src_dir.path().join(name);
    std::fs::write(&src, content).unwrap();

    let mut args = vec!["upload", src.to_str().unwrap()];
    args.extend_from_slice(extra);
    let (stdout, stderr, success) = run_docvault(&args, root);
    assert!(success, "upload should succeed: {}", stderr);

    let value = json(&stdout);
    assert_eq!(value["message"], "File uploaded");
    value["id"].as_str().unwrap().to_string()
}

// ============================================================================
// Vault Initialization
// ============================================================================

#[test]
fn test_cli_init_creates_layout() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("vault");

    let (stdout, _stderr, success) = run_docvault(&["init"], &root);

    assert!(success, "init should succeed");
    assert_eq!(json(&stdout)["status"], "ok");
    assert!(root.join("data.json").is_file());
    assert!(root.join("uploads").is_dir());
    assert!(!root.join("docvault.json").exists());
}

#[test]
fn test_cli_init_write_config() {
    let dir = tempdir().unwrap();

    let (_stdout, _stderr, success) = run_docvault(&["init", "--write-config"], dir.path());

    assert!(success);
    let config = json(&std::fs::read_to_string(dir.path().join("docvault.json")).unwrap());
    assert_eq!(config["upload_dir"], "uploads");
    assert_eq!(config["download_prefix"], "/files");
}

#[test]
fn test_cli_health() {
    let dir = tempdir().unwrap();
    let (stdout, _stderr, success) = run_docvault(&["health"], dir.path());
    assert!(success);
    assert_eq!(json(&stdout), serde_json::json!({ "status": "ok" }));
}

// ============================================================================
// Document Operations
// ============================================================================

#[test]
fn test_cli_upload_and_list() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    run_docvault(&["init"], root);

    let id = upload(root, "report.pdf", b"%PDF-1.4...", &["-t", "application/pdf"]);

    let (stdout, _stderr, success) = run_docvault(&["list"], root);
    assert!(success);
    let list = json(&stdout);
    let docs = list.as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["id"], id.as_str());
    assert_eq!(docs[0]["filename"], "report.pdf");
    assert_eq!(docs[0]["content_type"], "application/pdf");
    assert_eq!(docs[0]["download_url"], format!("/files/{}", id));
}

#[test]
fn test_cli_upload_without_init() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("fresh");

    let id = upload(&root, "notes.txt", b"hello", &[]);

    assert!(root.join("uploads").join(format!("{}_notes.txt", id)).is_file());
    let (stdout, _stderr, _success) = run_docvault(&["list"], &root);
    assert_eq!(json(&stdout)[0]["content_type"], serde_json::Value::Null);
}

#[test]
fn test_cli_upload_custom_name() {
    let dir = tempdir().unwrap();
    let root = dir.path();

    upload(root, "tmp123.bin", b"x", &["--name", "renamed.txt"]);

    let (stdout, _stderr, _success) = run_docvault(&["list"], root);
    assert_eq!(json(&stdout)[0]["filename"], "renamed.txt");
}

#[test]
fn test_cli_list_limit() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let first = upload(root, "a.txt", b"a", &[]);
    upload(root, "b.txt", b"b", &[]);
    upload(root, "c.txt", b"c", &[]);

    let (stdout, _stderr, success) = run_docvault(&["list", "--limit", "1"], root);
    assert!(success);
    let list = json(&stdout);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], first.as_str());
}

#[test]
fn test_cli_download_to_stdout() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let id = upload(root, "hello.txt", b"Hello, world!", &[]);

    let (stdout, _stderr, success) = run_docvault(&["download", &id], root);

    assert!(success);
    assert_eq!(stdout, "Hello, world!");
}

#[test]
fn test_cli_download_to_file() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("vault");
    let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let id = upload(&root, "data.bin", &content, &["-t", "application/octet-stream"]);

    let dest = dir.path().join("out.bin");
    let (stdout, _stderr, success) =
        run_docvault(&["download", &id, "-o", dest.to_str().unwrap()], &root);

    assert!(success);
    let value = json(&stdout);
    assert_eq!(value["filename"], "data.bin");
    assert_eq!(value["size"], 4096);
    assert_eq!(std::fs::read(&dest).unwrap(), content);
}

#[test]
fn test_cli_download_unknown() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    run_docvault(&["init"], root);

    let (stdout, _stderr, success) = run_docvault(&["download", "missing-id"], root);

    assert!(!success, "download of unknown id should fail");
    assert_eq!(json(&stdout)["error"], "Not found");
}

#[test]
fn test_cli_download_missing_blob() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let id = upload(root, "gone.txt", b"soon gone", &[]);
    std::fs::remove_file(root.join("uploads").join(format!("{}_gone.txt", id))).unwrap();

    let (stdout, _stderr, success) = run_docvault(&["download", &id], root);

    assert!(!success);
    assert_eq!(json(&stdout)["error"], "File missing");
}

#[test]
fn test_cli_delete() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let id = upload(root, "doomed.txt", b"bye", &[]);

    let (stdout, _stderr, success) = run_docvault(&["delete", &id], root);
    assert!(success);
    assert_eq!(json(&stdout)["message"], "File deleted");

    let (stdout, _stderr, _success) = run_docvault(&["list"], root);
    assert_eq!(json(&stdout), serde_json::json!([]));

    let (stdout, _stderr, success) = run_docvault(&["delete", &id], root);
    assert!(!success, "second delete should fail");
    assert_eq!(json(&stdout)["error"], "Not found");
}

// ============================================================================
// Maintenance
// ============================================================================

#[test]
fn test_cli_status() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    upload(root, "a.txt", b"12345", &[]);
    upload(root, "b.txt", b"67", &[]);

    let (stdout, _stderr, success) = run_docvault(&["status"], root);

    assert!(success);
    let value = json(&stdout);
    assert_eq!(value["documents"], 2);
    assert_eq!(value["total_bytes"], 7);
}

#[test]
fn test_cli_check_and_prune() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    upload(root, "a.txt", b"a", &[]);
    std::fs::write(root.join("uploads").join("stray"), b"?").unwrap();

    let (stdout, _stderr, success) = run_docvault(&["check"], root);
    assert!(success);
    let value = json(&stdout);
    assert_eq!(value["clean"], false);
    assert_eq!(value["report"]["orphan_blobs"], serde_json::json!(["stray"]));
    assert!(root.join("uploads").join("stray").exists());

    let (stdout, _stderr, success) = run_docvault(&["check", "--prune-orphans"], root);
    assert!(success);
    assert_eq!(json(&stdout)["pruned"], serde_json::json!(["stray"]));
    assert!(!root.join("uploads").join("stray").exists());

    let (stdout, _stderr, _success) = run_docvault(&["check"], root);
    assert_eq!(json(&stdout)["clean"], true);
}

#[test]
fn test_cli_corrupt_index_fails() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("data.json"), b"{{{").unwrap();

    let (_stdout, stderr, success) = run_docvault(&["list"], root);

    assert!(!success, "corrupt index should abort");
    assert!(stderr.contains("Corrupt index"), "stderr: {}", stderr);
}

// ============================================================================
// Multiple Processes
// ============================================================================

/// Start `docvault` without waiting for it
fn spawn_docvault(args: &[&str], root: &Path) -> std::process::Child {
    Command::new(env!("CARGO_BIN_EXE_docvault"))
        .args(["-r", root.to_str().unwrap(), "-f", "json"])
        .args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn docvault")
}

fn listed_ids(root: &Path) -> HashSet<String> {
    let (stdout, _stderr, success) = run_docvault(&["list"], root);
    assert!(success);
    json(&stdout)
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_cli_concurrent_uploads_all_listed() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("vault");
    let src_dir = tempdir().unwrap();
    let (_stdout, _stderr, success) = run_docvault(&["init"], &root);
    assert!(success);

    let children: Vec<_> = (0..16)
        .map(|i| {
            let src = src_dir.path().join(format!("doc-{}.txt", i));
            std::fs::write(&src, format!("process {}", i)).unwrap();
            spawn_docvault(&["upload", src.to_str().unwrap()], &root)
        })
        .collect();

    let mut reported = HashSet::new();
    for child in children {
        let output = child.wait_with_output().unwrap();
        assert!(
            output.status.success(),
            "upload should succeed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let value = json(&String::from_utf8_lossy(&output.stdout));
        reported.insert(value["id"].as_str().unwrap().to_string());
    }

    assert_eq!(reported.len(), 16);
    assert_eq!(listed_ids(&root), reported);

    let (stdout, _stderr, _success) = run_docvault(&["check"], &root);
    assert_eq!(json(&stdout)["clean"], true, "check: {}", stdout);
}

#[test]
fn test_cli_concurrent_deletes_keep_survivors() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let ids: Vec<_> = (0..12)
        .map(|i| upload(root, &format!("{}.txt", i), b"x", &[]))
        .collect();
    let (doomed, kept) = ids.split_at(8);

    let children: Vec<_> = doomed
        .iter()
        .map(|id| spawn_docvault(&["delete", id], root))
        .collect();
    for child in children {
        let output = child.wait_with_output().unwrap();
        assert!(output.status.success());
        assert_eq!(
            json(&String::from_utf8_lossy(&output.stdout))["message"],
            "File deleted"
        );
    }

    let expected: HashSet<_> = kept.iter().cloned().collect();
    assert_eq!(listed_ids(root), expected);

    let (stdout, _stderr, _success) = run_docvault(&["check"], root);
    assert_eq!(json(&stdout)["clean"], true, "check: {}", stdout);
}
