//! End-to-end integration tests driving the `mt` binary.
//!
//! Tests the full pipeline: users → medications → intake → dashboard →
//! clinician views, each step a separate process against one database.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{NamedTempFile, TempDir};

fn mt_binary() -> String {
    env!("CARGO_BIN_EXE_mt").to_string()
}

/// A temporary database plus a config file pointing at it.
struct Env {
    _dir: TempDir,
    config: NamedTempFile,
}

impl Env {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("mt.db");
        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, r#"database_path = "{}""#, db_path.display()).unwrap();
        config.flush().unwrap();
        Self { _dir: dir, config }
    }

    fn config_path(&self) -> &Path {
        self.config.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(mt_binary())
            .env_remove("MT_USER")
            .env_remove("MT_DATABASE_PATH")
            .env_remove("MT_ACTIVE_ONLY")
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .output()
            .expect("failed to run mt")
    }

    fn ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "mt {args:?} should succeed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        serde_json::from_str(&self.ok(args)).expect("valid JSON output")
    }

    fn add_medication(&self, user: &str, name: &str) -> String {
        self.ok(&[
            "--user",
            user,
            "med",
            "add",
            name,
            "--dosage",
            "10mg",
            "--frequency",
            "Once daily",
            "--start",
            "2025-03-01",
        ]);
        let meds = self.json(&["--user", user, "med", "list", "--json"]);
        meds.as_array()
            .unwrap()
            .iter()
            .find(|m| m["name"] == name)
            .and_then(|m| m["id"].as_str())
            .expect("medication in list")
            .to_string()
    }
}

/// Test the patient flow from registration to dashboard.
#[test]
fn test_patient_flow_to_dashboard() {
    let env = Env::new();
    env.ok(&["user", "add", "alice"]);
    let aspirin = env.add_medication("alice", "Aspirin");

    for (date, status) in [
        ("2025-03-06", "missed"),
        ("2025-03-07", "taken"),
        ("2025-03-08", "missed"),
        ("2025-03-09", "missed"),
        ("2025-03-10", "taken"),
    ] {
        env.ok(&[
            "--user", "alice", "intake", "log", &aspirin, status, "--date", date,
        ]);
    }

    let summary = env.json(&[
        "--user",
        "alice",
        "dashboard",
        "--today",
        "2025-03-10",
        "--json",
    ]);
    assert_eq!(summary["adherenceScore"], 40);
    assert_eq!(summary["missedDoseStreak"], 2);
    assert_eq!(summary["mostMissedMedication"]["name"], "Aspirin");
    assert_eq!(summary["mostMissedMedication"]["missCount"], 3);
    assert_eq!(summary["weeklyTrend"].as_array().unwrap().len(), 7);
    assert_eq!(summary["weeklyTrend"][6]["label"], "Mon, Mar 10");
}

/// Test that logging the same day twice keeps only the latest status.
#[test]
fn test_relogging_replaces_entry() {
    let env = Env::new();
    env.ok(&["user", "add", "alice"]);
    let aspirin = env.add_medication("alice", "Aspirin");

    env.ok(&[
        "--user", "alice", "intake", "log", &aspirin, "missed", "--date", "2025-03-10",
    ]);
    env.ok(&[
        "--user", "alice", "intake", "log", &aspirin, "late", "--date", "2025-03-10",
    ]);

    let entries = env.json(&[
        "--user", "alice", "intake", "list", "--date", "2025-03-10", "--json",
    ]);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status"], "late");
    assert_eq!(entries[0]["medicationName"], "Aspirin");
}

/// Test that a user cannot log intake against another user's medication.
#[test]
fn test_foreign_medication_is_rejected() {
    let env = Env::new();
    env.ok(&["user", "add", "alice"]);
    env.ok(&["user", "add", "bob"]);
    let aspirin = env.add_medication("alice", "Aspirin");

    let output = env.run(&["--user", "bob", "intake", "log", &aspirin, "taken"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("medication not found"), "stderr: {stderr}");
}

/// Test the clinician views over an assigned patient.
#[test]
fn test_clinician_sees_assigned_patient() {
    let env = Env::new();
    env.ok(&["user", "add", "alice"]);
    env.ok(&["user", "add", "carol"]);
    env.ok(&["user", "add", "drsmith", "--role", "clinician"]);
    env.ok(&["user", "assign", "alice", "drsmith"]);
    let aspirin = env.add_medication("alice", "Aspirin");
    env.ok(&[
        "--user", "alice", "intake", "log", &aspirin, "taken", "--date", "2025-03-10",
    ]);
    env.ok(&[
        "--user",
        "alice",
        "side-effect",
        "add",
        &aspirin,
        "Headache",
        "--severity",
        "2",
        "--start",
        "2025-03-10",
    ]);

    let patients = env.ok(&["--user", "drsmith", "patients"]);
    assert!(patients.contains("alice"));
    assert!(!patients.contains("carol"));

    let detail = env.json(&["--user", "drsmith", "patient", "alice", "--json"]);
    assert_eq!(detail["patient"]["username"], "alice");
    assert_eq!(detail["adherenceScore"], 100);
    assert_eq!(detail["recentEvents"].as_array().unwrap().len(), 1);
    assert_eq!(detail["sideEffects"][0]["severity"], 2);

    let output = env.run(&["--user", "drsmith", "patient", "carol"]);
    assert!(!output.status.success());

    let output = env.run(&["--user", "alice", "patients"]);
    assert!(!output.status.success());
}

/// Test that commands needing a user fail clearly without one.
#[test]
fn test_missing_user_fails() {
    let env = Env::new();
    let output = env.run(&["med", "list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No user selected"), "stderr: {stderr}");
}

/// Test that deactivated medications drop out of the default list but keep history.
#[test]
fn test_deactivate_keeps_history() {
    let env = Env::new();
    env.ok(&["user", "add", "alice"]);
    let aspirin = env.add_medication("alice", "Aspirin");
    env.ok(&[
        "--user", "alice", "intake", "log", &aspirin, "taken", "--date", "2025-03-10",
    ]);
    env.ok(&["--user", "alice", "med", "deactivate", &aspirin]);

    let active = env.json(&["--user", "alice", "med", "list", "--json"]);
    assert!(active.as_array().unwrap().is_empty());

    let summary = env.json(&[
        "--user",
        "alice",
        "dashboard",
        "--today",
        "2025-03-10",
        "--json",
    ]);
    assert_eq!(summary["adherenceScore"], 100);
    assert_eq!(summary["activeMedicationCount"], 0);
    assert_eq!(summary["totalMedicationCount"], 1);

    let scoped = env.json(&[
        "--user",
        "alice",
        "dashboard",
        "--today",
        "2025-03-10",
        "--active-only",
        "--json",
    ]);
    assert_eq!(scoped["adherenceScore"], serde_json::Value::Null);
}

/// Test that the short ids printed by list commands are accepted back.
#[test]
fn test_listed_short_id_round_trips() {
    let env = Env::new();
    env.ok(&["user", "add", "alice"]);
    let aspirin = env.add_medication("alice", "Aspirin");

    let listed = env.ok(&["--user", "alice", "med", "list"]);
    let short = listed.split_whitespace().next().unwrap();
    assert!(aspirin.starts_with(short));
    assert!(short.len() < aspirin.len());

    let shown = env.ok(&["--user", "alice", "med", "show", short]);
    assert!(shown.contains(&aspirin));

    env.ok(&[
        "--user", "alice", "intake", "log", short, "taken", "--date", "2025-03-10",
    ]);
    let entries = env.json(&[
        "--user", "alice", "intake", "list", "--date", "2025-03-10", "--json",
    ]);
    assert_eq!(entries[0]["medicationId"], aspirin.as_str());
}
