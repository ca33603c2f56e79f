//! Binary-level smoke test: confirms the compiled `forge-mcp` binary parses
//! its CLI flags and reports itself correctly, without spawning a full MCP
//! stdio session (the tool-handler behavior itself is covered in-process by
//! `tests/integration.rs`).

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_help_without_opening_a_store() {
    let mut cmd = Command::cargo_bin("forge-mcp").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("forge-mcp"))
        .stdout(predicate::str::contains("--project-dir"));
}

#[test]
fn errors_cleanly_when_no_forge_dir_is_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("forge-mcp").unwrap();
    cmd.arg("--project-dir").arg(dir.path());
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(".forge"));
}
