//! Integration tests for the impactlens CLI
//!
//! These tests run the actual binary against the JSON fixtures to verify:
//! - Offline scoring over an events file produces a valid report
//! - Repositories come from the command line, the projects file or the events file
//! - The projects file can be maintained from the CLI
//! - A run that cannot publish anything exits non-zero
//!
//! Each test runs in its own temp directory so no config or projects file leaks in.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Fixture timestamps are in 2024; this window reaches back far enough
const WIDE_WINDOW: &str = "100000";

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn events_file() -> String {
    fixtures_path().join("events.json").display().to_string()
}

fn workspace() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Run impactlens in `dir` and return (stdout, stderr, exit_code)
fn run_in(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> (String, String, i32) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_impactlens"));
    cmd.args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("IMPACTLENS_STORE_URL")
        .env_remove("IMPACTLENS_PROJECTS_FILE");
    for (key, value) in env {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("Failed to execute impactlens");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn score_json(dir: &Path, extra: &[&str]) -> serde_json::Value {
    let events = events_file();
    let mut args = vec![
        "score",
        "--events",
        events.as_str(),
        "--since-days",
        WIDE_WINDOW,
        "--dry-run",
        "--format",
        "json",
    ];
    args.extend(extra);
    let (stdout, stderr, code) = run_in(dir, &args, &[]);
    assert_eq!(code, 0, "score failed: {}", stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("Invalid JSON ({}): {}", e, stdout))
}

#[test]
fn test_dry_run_scores_every_repository_in_events() {
    let dir = workspace();
    let report = score_json(dir.path(), &[]);

    assert_eq!(report["status"], "success");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["summary"]["repositories_total"], 2);
    assert_eq!(report["summary"]["repositories_scored"], 2);
    assert_eq!(report["summary"]["scores_computed"], 3);
    assert_eq!(report["summary"]["scores_published"], 0);

    let app = &report["repositories"][0];
    assert_eq!(app["repository"], "https://github.com/org/app");
    let authors = app["authors"].as_array().expect("authors array");
    assert_eq!(authors.len(), 2);

    let alice = authors
        .iter()
        .find(|a| a["identifier"] == "alice@example.com")
        .expect("alice scored");
    assert_eq!(alice["canonical_name"], "Alice");
    assert_eq!(alice["commit_count"], 3);
    assert_eq!(alice["lines_changed"], 239);

    for author in authors {
        let score = author["score"].as_f64().expect("numeric score");
        assert!((0.0..=1.0).contains(&score), "score out of range: {}", score);
    }
}

#[test]
fn test_explicit_repository_limits_the_run() {
    let dir = workspace();
    let report = score_json(dir.path(), &["https://github.com/org/lib"]);
    assert_eq!(report["summary"]["repositories_total"], 1);
    assert_eq!(report["repositories"][0]["authors"][0]["canonical_name"], "Carol");
}

#[test]
fn test_projects_file_selects_repositories() {
    let dir = workspace();
    std::fs::copy(
        fixtures_path().join("projects.json"),
        dir.path().join("projects.json"),
    )
    .expect("copy projects fixture");

    let report = score_json(dir.path(), &[]);
    assert_eq!(report["summary"]["repositories_total"], 1);
    assert_eq!(report["repositories"][0]["repository"], "https://github.com/org/app");
}

#[test]
fn test_unknown_repository_is_empty() {
    let dir = workspace();
    let report = score_json(dir.path(), &["https://github.com/org/missing"]);
    assert_eq!(report["repositories"][0]["status"]["state"], "empty");
    assert_eq!(report["status"], "success");
}

#[test]
fn test_text_output_lists_authors() {
    let dir = workspace();
    let events = events_file();
    let (stdout, stderr, code) = run_in(
        dir.path(),
        &["score", "--events", &events, "--since-days", WIDE_WINDOW, "--dry-run"],
        &[],
    );
    assert_eq!(code, 0, "score failed: {}", stderr);
    assert!(stdout.contains("Impactlens Scoring Run"));
    assert!(stdout.contains("Alice"));
    assert!(stdout.contains("Carol"));
}

#[test]
fn test_report_written_to_file() {
    let dir = workspace();
    let events = events_file();
    let (_, stderr, code) = run_in(
        dir.path(),
        &[
            "score", "--events", &events, "--since-days", WIDE_WINDOW, "--dry-run", "-f", "json",
            "-o", "report.json",
        ],
        &[],
    );
    assert_eq!(code, 0, "score failed: {}", stderr);
    let content = std::fs::read_to_string(dir.path().join("report.json")).expect("report file");
    let report: serde_json::Value = serde_json::from_str(&content).expect("valid JSON");
    assert_eq!(report["summary"]["repositories_total"], 2);
}

#[test]
fn test_unreachable_store_fails_the_run() {
    let dir = workspace();
    std::fs::write(dir.path().join("impactlens.toml"), "[store]\ntimeout_secs = 5\n")
        .expect("write config");
    let events = events_file();
    let (stdout, _, code) = run_in(
        dir.path(),
        &[
            "score",
            "--events",
            &events,
            "--since-days",
            WIDE_WINDOW,
            "--format",
            "json",
        ],
        &[("IMPACTLENS_STORE_URL", "http://127.0.0.1:1")],
    );
    assert_eq!(code, 1);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("report still printed");
    assert_eq!(report["status"], "failed");
    assert_eq!(report["summary"]["scores_published"], 0);
    assert_eq!(report["summary"]["publish_failures"], 3);
}

#[test]
fn test_projects_add_and_list() {
    let dir = workspace();
    let submission = dir.path().join("submission.json");
    std::fs::write(
        &submission,
        r#"{"meta": {"title": "My Service"}, "git": ["https://github.com/org/service.git"]}"#,
    )
    .expect("write submission");

    let projects = dir.path().join("registry.json").display().to_string();
    let env = [("IMPACTLENS_PROJECTS_FILE", projects.as_str())];

    let (stdout, stderr, code) = run_in(
        dir.path(),
        &["projects", "add", submission.to_str().unwrap()],
        &env,
    );
    assert_eq!(code, 0, "projects add failed: {}", stderr);
    assert!(stdout.contains("my-service"));

    let (stdout, _, code) = run_in(dir.path(), &["projects", "list"], &env);
    assert_eq!(code, 0);
    assert!(stdout.contains("my-service"));
    assert!(stdout.contains("https://github.com/org/service.git"));
}

#[test]
fn test_projects_add_rejects_invalid_data() {
    let dir = workspace();
    let submission = dir.path().join("bad.json");
    std::fs::write(&submission, r#"{"p": {"git": []}}"#).expect("write submission");
    let (_, stderr, code) = run_in(
        dir.path(),
        &["projects", "add", submission.to_str().unwrap()],
        &[],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid project data format"));
    assert!(!dir.path().join("projects.json").exists());
}

#[test]
fn test_init_writes_config() {
    let dir = workspace();
    let (_, stderr, code) = run_in(dir.path(), &["init"], &[]);
    assert_eq!(code, 0, "init failed: {}", stderr);
    let content =
        std::fs::read_to_string(dir.path().join("impactlens.toml")).expect("config written");
    assert!(content.contains("[scoring.file_weights]"));
}

#[test]
fn test_version() {
    let dir = workspace();
    let (stdout, _, code) = run_in(dir.path(), &["version"], &[]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("impactlens "));
}
