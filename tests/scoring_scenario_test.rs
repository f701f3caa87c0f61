//! End-to-end scoring over the in-memory store
//!
//! Author A makes ten commits to `a.py` and `b.py`, signing seven of them as
//! "Alice" and three as "A. Smith". Author B makes one commit to `c.py`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use impactlens::config::ImpactConfig;
use impactlens::identity::NoLookup;
use impactlens::models::{CommitEvent, FileChange};
use impactlens::pipeline::{RepositoryStatus, RunStatus, ScoringRun};
use impactlens::store::MemoryStore;

const REPO: &str = "https://github.com/org/scenario";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

fn scenario() -> Vec<CommitEvent> {
    let mut commits: Vec<CommitEvent> = (0..10)
        .map(|i| CommitEvent {
            repository: REPO.into(),
            author_identifier: "a@example.com".into(),
            author_display_name: if i < 7 { "Alice" } else { "A. Smith" }.into(),
            commit_hash: format!("a{i}"),
            timestamp: now() - Duration::days(20 - i),
            files: vec![FileChange::new("a.py", 5, 1), FileChange::new("b.py", 3, 1)],
            message: "Improve parser".into(),
        })
        .collect();
    commits.push(CommitEvent {
        repository: REPO.into(),
        author_identifier: "b@example.com".into(),
        author_display_name: "Bea".into(),
        commit_hash: "b0".into(),
        timestamp: now() - Duration::days(3),
        files: vec![FileChange::new("c.py", 8, 2)],
        message: "Add helper".into(),
    });
    commits
}

#[test]
fn test_scenario_scores_and_names() {
    let store = MemoryStore::new(scenario());
    let config = ImpactConfig::default();
    let report = ScoringRun::new(&config, &store, &NoLookup)
        .with_sink(&store)
        .execute_at(&[REPO.to_string()], now());

    assert_eq!(report.status, RunStatus::Success);
    let outcome = &report.repositories[0];
    assert_eq!(outcome.status, RepositoryStatus::Scored);
    assert_eq!(outcome.commits, 11);
    assert_eq!(outcome.authors.len(), 2);

    let a = outcome
        .authors
        .iter()
        .find(|s| s.identifier == "a@example.com")
        .expect("author A scored");
    let b = outcome
        .authors
        .iter()
        .find(|s| s.identifier == "b@example.com")
        .expect("author B scored");

    assert_eq!(a.canonical_name, "Alice");
    assert_eq!(a.lines_changed, 100);
    assert_eq!(b.lines_changed, 10);

    // Lines changed relative to the most active author
    assert!((a.breakdown.lines_changed.value - 1.0).abs() < 1e-9);
    assert!((b.breakdown.lines_changed.value - 0.1).abs() < 1e-9);

    for author in &outcome.authors {
        assert!((0.0..=1.0).contains(&author.score));
        assert!((0.0..=1.0).contains(&author.raw));
    }

    // Only A touches files of the co-change graph
    assert!(a.importance > 0.0);
    assert_eq!(b.importance, 0.0);
}

#[test]
fn test_scenario_publish_is_idempotent() {
    let store = MemoryStore::new(scenario());
    let config = ImpactConfig::default();
    let run = ScoringRun::new(&config, &store, &NoLookup).with_sink(&store);

    let first = run.execute_at(&[REPO.to_string()], now());
    let second = run.execute_at(&[REPO.to_string()], now());
    assert_eq!(first.summary.scores_published, 2);
    assert_eq!(second.summary.scores_published, 2);

    let documents = store.documents();
    assert_eq!(documents.len(), 2);
    let alice = &documents["https___github.com_org_scenario_Alice"];
    assert_eq!(alice.author_identifier, "a@example.com");
    assert!(documents.contains_key("https___github.com_org_scenario_Bea"));

    // Same input, same scores
    assert_eq!(first.repositories[0].authors, second.repositories[0].authors);
}

#[test]
fn test_scenario_dry_run_writes_nothing() {
    let store = MemoryStore::new(scenario());
    let config = ImpactConfig::default();
    let report = ScoringRun::new(&config, &store, &NoLookup).execute_at(&[REPO.to_string()], now());
    assert!(report.dry_run);
    assert_eq!(report.summary.scores_computed, 2);
    assert!(store.documents().is_empty());
}
