//! CLI integration tests for the `strike` binary.
//!
//! Uses `assert_cmd` to spawn the binary and verify exit codes, stdout
//! content, and stderr content. Tests run from the workspace root so the
//! sample session under `demos/` resolves.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `strike` binary, rooted at workspace.
fn strike() -> Command {
    let mut cmd = cargo_bin_cmd!("strike");
    cmd.current_dir(workspace_root());
    cmd
}

fn write_session(dir: &TempDir, body: serde_json::Value) -> PathBuf {
    let path = dir.path().join("session.json");
    fs::write(&path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    path
}

fn table(steps: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "principals": [
            {"id": "player-one", "name": "Ada", "role": "requester", "character": "hero-talia"}
        ],
        "entities": [
            {
                "id": "hero-talia", "name": "Talia", "class": "hero",
                "stamina": {"permanent": 20, "max": 20, "min": -10},
                "owners": ["player-one"]
            },
            {
                "id": "goblin-1", "name": "Goblin", "class": "non_hero",
                "stamina": {"permanent": 5, "max": 10}
            }
        ],
        "steps": steps
    })
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    strike()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Arbiter relay"));
}

#[test]
fn version_exits_0() {
    strike()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("strike"));
}

// ──────────────────────────────────────────────
// 2. run
// ──────────────────────────────────────────────

#[test]
fn run_demo_session_reports_each_target() {
    strike()
        .args(["run", "demos/skirmish.json", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-> goblin-1: ok (relay) damage 5"))
        .stdout(predicate::str::contains("-> ghost-9: failed EntityNotFound"))
        .stdout(predicate::str::contains("-> ogre-1: ok (relay) damage 3"))
        .stdout(predicate::str::contains("Ogre (ogre-1): stamina 27/30 [Slowed]"));
}

#[test]
fn run_json_output_is_structured() {
    let output = strike()
        .args(["--output", "json", "run", "demos/skirmish.json", "--yes"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps[0]["step"], "action");
    assert_eq!(steps[0]["outcome"]["status"], "completed");
    let targets = steps[0]["outcome"]["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 3);
    assert_eq!(targets[1]["result"]["error"], "EntityNotFound");
    assert_eq!(steps[4]["step"], "undo");
    assert_eq!(steps[4]["result"]["success"], true);
}

#[test]
fn run_declined_self_target_cancels_batch() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        table(serde_json::json!([
            {"as": "player-one", "action": {"kind": "damage", "targets": ["goblin-1", "hero-talia"], "amount": 3}}
        ])),
    );
    strike()
        .arg("run")
        .arg(&path)
        .arg("--no")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled (self-target on Talia)"))
        .stdout(predicate::str::contains("Goblin (goblin-1): stamina 5/10"));
}

#[test]
fn run_self_target_prompt_reads_stdin() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        table(serde_json::json!([
            {"as": "player-one", "action": {"kind": "damage", "targets": ["hero-talia"], "amount": 3}}
        ])),
    );
    strike()
        .arg("run")
        .arg(&path)
        .write_stdin("y\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Apply to your own character?"))
        .stdout(predicate::str::contains("-> hero-talia: ok (direct) damage 3"));
}

#[test]
fn run_invalid_amount_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        table(serde_json::json!([
            {"as": "player-one", "action": {"kind": "damage", "targets": ["goblin-1"], "amount": "lots"}}
        ])),
    );
    strike()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("failed InvalidAmount"));
}

#[test]
fn run_offline_arbiter_reports_peer_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        table(serde_json::json!([
            {"arbiterOnline": false},
            {"as": "player-one", "action": {"kind": "damage", "targets": ["goblin-1"], "amount": 2}}
        ])),
    );
    strike()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("arbiter offline"))
        .stdout(predicate::str::contains("failed PeerUnavailable"));
}

#[test]
fn run_requester_undo_unauthorized() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        table(serde_json::json!([
            {"as": "gm", "action": {"kind": "damage", "targets": ["goblin-1"], "amount": 2}},
            {"as": "player-one", "undo": "last"}
        ])),
    );
    strike()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("failed Unauthorized"))
        .stdout(predicate::str::contains("Goblin (goblin-1): stamina 3/10"));
}

#[test]
fn run_undo_of_unknown_entries_is_reported_per_step() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        table(serde_json::json!([
            {"undo": "last"},
            {"undo": "damage-0-missing"},
            {"as": "gm", "action": {"kind": "damage", "targets": ["goblin-1"], "amount": 2}}
        ])),
    );
    strike()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[1] gm undo : failed EntryNotFound"))
        .stdout(predicate::str::contains(
            "[2] gm undo damage-0-missing: failed EntryNotFound",
        ))
        .stdout(predicate::str::contains("Goblin (goblin-1): stamina 3/10"));
}

#[test]
fn run_config_file_overrides_script() {
    let dir = TempDir::new().unwrap();
    let path = write_session(&dir, table(serde_json::json!([])));
    let config = dir.path().join("relay.toml");
    fs::write(&config, "relay_timeout_ms = 100\npublic_log = true\n").unwrap();
    strike()
        .arg("run")
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();
}

#[test]
fn run_missing_session_fails() {
    strike()
        .args(["run", "demos/does-not-exist.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("session file not found"));
}

#[test]
fn run_unknown_principal_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_session(
        &dir,
        table(serde_json::json!([
            {"as": "stranger", "action": {"kind": "heal", "targets": ["goblin-1"], "amount": 1}}
        ])),
    );
    strike()
        .arg("run")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown principal 'stranger'"));
}

#[test]
fn run_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_session(&dir, table(serde_json::json!([])));
    let config = dir.path().join("relay.toml");
    fs::write(&config, "relay_timeout_ms = \"soon\"\n").unwrap();
    strike()
        .arg("run")
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid config"));
}

// ──────────────────────────────────────────────
// 3. history
// ──────────────────────────────────────────────

#[test]
fn history_lists_entries_with_undo_marker() {
    strike()
        .args(["history", "demos/skirmish.json", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Goblin Sniper 5 -> 0 via Relayed by Ada"))
        .stdout(predicate::str::contains("(undone)"));
}

#[test]
fn history_active_hides_undone() {
    strike()
        .args(["history", "demos/skirmish.json", "--yes", "--active"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(undone)").not());
}

#[test]
fn history_json_filters_by_target() {
    let output = strike()
        .args([
            "--output",
            "json",
            "history",
            "demos/skirmish.json",
            "--yes",
            "--target",
            "ogre-1",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["targetEntityId"] == "ogre-1"));
    assert_eq!(entries[0]["detail"]["kind"], "damage");
    assert_eq!(entries[0]["detail"]["applied"], 3);
    assert_eq!(entries[1]["detail"]["kind"], "apply_status");
}

#[test]
fn history_empty_session() {
    let dir = TempDir::new().unwrap();
    let path = write_session(&dir, table(serde_json::json!([])));
    strike()
        .arg("history")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("no mutations recorded"));
}
