//! Scoring run across repositories
//!
//! A run walks the configured repositories one after another:
//!
//! 1. fetch the commits of the lookback window
//! 2. resolve author identities
//! 3. score every author
//! 4. publish the scores (skipped in dry-run mode)
//!
//! A repository whose commits cannot be fetched is logged and skipped; the
//! run always continues with the next one.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ImpactConfig;
use crate::identity::{IdentityLookup, IdentityResolver};
use crate::publish::{PublishReport, ResultPublisher};
use crate::scoring::{AuthorScore, ImpactEngine};
use crate::store::{BulkFailure, EventSource, ScoreSink};

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// A repository failed or some documents were not written
    CompletedWithWarnings,
    /// Publishing was attempted and not a single document was written
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::CompletedWithWarnings => "completed with warnings",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RepositoryStatus {
    Scored,
    Failed { reason: String },
    /// No commits in the window
    Empty,
}

/// Per-repository section of a [`RunReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryOutcome {
    pub repository: String,
    pub status: RepositoryStatus,
    pub commits: usize,
    pub authors: Vec<AuthorScore>,
    pub published: usize,
    pub publish_failures: Vec<BulkFailure>,
    pub collisions: Vec<String>,
}

impl RepositoryOutcome {
    fn new(repository: &str, status: RepositoryStatus) -> Self {
        Self {
            repository: repository.to_string(),
            status,
            commits: 0,
            authors: Vec::new(),
            published: 0,
            publish_failures: Vec::new(),
            collisions: Vec::new(),
        }
    }

    fn record_publish(&mut self, report: PublishReport) {
        self.published = report.written.len();
        self.publish_failures = report.failed;
        self.collisions = report.collisions;
    }
}

/// Counts per stage of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub repositories_total: usize,
    pub repositories_scored: usize,
    pub repositories_failed: usize,
    pub scores_computed: usize,
    pub scores_published: usize,
    pub publish_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub dry_run: bool,
    pub status: RunStatus,
    pub summary: StageSummary,
    pub repositories: Vec<RepositoryOutcome>,
}

impl RunReport {
    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }
}

fn summarize(repositories: &[RepositoryOutcome]) -> StageSummary {
    let mut summary = StageSummary {
        repositories_total: repositories.len(),
        ..Default::default()
    };
    for outcome in repositories {
        match outcome.status {
            RepositoryStatus::Scored => summary.repositories_scored += 1,
            RepositoryStatus::Failed { .. } => summary.repositories_failed += 1,
            RepositoryStatus::Empty => {}
        }
        summary.scores_computed += outcome.authors.len();
        summary.scores_published += outcome.published;
        summary.publish_failures += outcome.publish_failures.len();
    }
    summary
}

fn overall_status(summary: &StageSummary, published_anything: bool) -> RunStatus {
    let attempted = summary.scores_published + summary.publish_failures;
    if published_anything && attempted > 0 && summary.scores_published == 0 {
        RunStatus::Failed
    } else if summary.repositories_failed > 0 || summary.publish_failures > 0 {
        RunStatus::CompletedWithWarnings
    } else {
        RunStatus::Success
    }
}

/// Start of the lookback window; windows reaching past the earliest
/// representable instant start there.
fn window_start(now: DateTime<Utc>, lookback_days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(lookback_days))
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .unwrap_or_else(|| {
            warn!(
                "Lookback of {} days reaches past the earliest date, scoring all history",
                lookback_days
            );
            DateTime::<Utc>::MIN_UTC
        })
}

/// One scoring pass over a list of repositories
pub struct ScoringRun<'a> {
    source: &'a dyn EventSource,
    lookup: &'a dyn IdentityLookup,
    sink: Option<&'a dyn ScoreSink>,
    engine: ImpactEngine,
    lookback_days: u32,
    batch_size: usize,
}

impl<'a> ScoringRun<'a> {
    /// A dry run until a sink is attached with [`ScoringRun::with_sink`]
    pub fn new(
        config: &ImpactConfig,
        source: &'a dyn EventSource,
        lookup: &'a dyn IdentityLookup,
    ) -> Self {
        Self {
            source,
            lookup,
            sink: None,
            engine: ImpactEngine::new(&config.scoring, config.pagerank),
            lookback_days: config.window.lookback_days,
            batch_size: config.store.batch_size,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn ScoreSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn execute(&self, repositories: &[String]) -> RunReport {
        self.execute_at(repositories, Utc::now())
    }

    /// Run with an explicit "now"; the window ends at `now`
    pub fn execute_at(&self, repositories: &[String], now: DateTime<Utc>) -> RunReport {
        let window_start = window_start(now, self.lookback_days);

        let mut seen: Vec<&str> = Vec::new();
        let mut outcomes = Vec::new();
        for repository in repositories {
            let repository = repository.trim();
            if repository.is_empty() || seen.contains(&repository) {
                continue;
            }
            seen.push(repository);
            outcomes.push(self.run_repository(repository, window_start, now));
        }

        let summary = summarize(&outcomes);
        let status = overall_status(&summary, self.sink.is_some());
        info!(
            "Scoring run {}: {} scored, {} failed, {} scores computed, {} published",
            status,
            summary.repositories_scored,
            summary.repositories_failed,
            summary.scores_computed,
            summary.scores_published
        );

        RunReport {
            started_at: now,
            finished_at: Utc::now().max(now),
            window_start,
            dry_run: self.sink.is_none(),
            status,
            summary,
            repositories: outcomes,
        }
    }

    fn run_repository(
        &self,
        repository: &str,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RepositoryOutcome {
        info!("Scoring {}", repository);

        let commits = match self.source.fetch_commits(repository, window_start) {
            Ok(commits) => commits,
            Err(e) => {
                warn!("Skipping {}: {}", repository, e);
                return RepositoryOutcome::new(
                    repository,
                    RepositoryStatus::Failed {
                        reason: e.to_string(),
                    },
                );
            }
        };
        let commits: Vec<_> = commits
            .into_iter()
            .filter(|c| c.timestamp >= window_start && c.timestamp <= now)
            .collect();

        let identities = IdentityResolver::new(self.lookup).resolve(&commits);
        let scores = self.engine.score_repository(repository, &commits, &identities, |path| {
            self.source.file_structure(repository, path)
        });

        if scores.is_empty() {
            info!("No commits in the window for {}", repository);
            let mut outcome = RepositoryOutcome::new(repository, RepositoryStatus::Empty);
            outcome.commits = commits.len();
            return outcome;
        }

        let mut outcome = RepositoryOutcome::new(repository, RepositoryStatus::Scored);
        outcome.commits = commits.len();
        if let Some(sink) = self.sink {
            let report = ResultPublisher::new(sink, self.batch_size).publish(&scores, now);
            outcome.record_publish(report);
        }
        outcome.authors = scores.authors;
        outcome
    }
}
