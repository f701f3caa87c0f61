//! Per-repository scoring

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::composite::{AuthorFactors, CompositeScorer, FileFactors};
use crate::config::{PageRankConfig, ScoringConfig};
use crate::graph::FileGraph;
use crate::identity::IdentityMap;
use crate::metrics::calculators;
use crate::metrics::{
    ActivityMaxima, AggregationRules, AuthorMetrics, MetricValue, Normalizer, RepositoryStats,
};
use crate::models::{CommitEvent, FileStructure};

/// Files whose PageRank is above this share of the top file's count as critical
const CRITICAL_IMPORTANCE: f64 = 0.5;

/// Every factor behind one author's score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub complexity: MetricValue,
    pub changes: MetricValue,
    pub lifespan: MetricValue,
    pub coupling: MetricValue,
    pub lines_changed: MetricValue,
    pub commit_frequency: MetricValue,
    pub code_quality: MetricValue,
    pub review_participation: MetricValue,
}

impl ScoreBreakdown {
    fn new(file: &FileFactors, author: &AuthorFactors) -> Self {
        Self {
            complexity: file.complexity,
            changes: file.changes,
            lifespan: file.lifespan,
            coupling: file.coupling,
            lines_changed: author.lines_changed,
            commit_frequency: author.commit_frequency,
            code_quality: author.code_quality,
            review_participation: author.review_participation,
        }
    }

    /// Names of the factors that fell back to the neutral value
    pub fn estimated_factors(&self) -> Vec<&'static str> {
        [
            ("complexity", self.complexity),
            ("changes", self.changes),
            ("lifespan", self.lifespan),
            ("coupling", self.coupling),
            ("lines_changed", self.lines_changed),
            ("commit_frequency", self.commit_frequency),
            ("code_quality", self.code_quality),
            ("review_participation", self.review_participation),
        ]
        .into_iter()
        .filter(|(_, m)| m.estimated)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Impact score of one author in one repository
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorScore {
    pub identifier: String,
    pub canonical_name: String,
    pub score: f64,
    pub raw: f64,
    pub estimated: bool,
    pub breakdown: ScoreBreakdown,
    pub commit_count: u64,
    pub lines_changed: u64,
    /// Sum of the PageRank of the distinct files touched
    pub importance: f64,
    /// Commits touching files ranked above half the top file's importance
    pub critical_file_changes: u64,
}

/// All author scores of one repository, best first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepositoryScores {
    pub repository: String,
    pub commits: usize,
    pub files: usize,
    pub authors: Vec<AuthorScore>,
}

impl RepositoryScores {
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    pub fn author(&self, identifier: &str) -> Option<&AuthorScore> {
        self.authors.iter().find(|a| a.identifier == identifier)
    }
}

/// Turns one repository's commits into author scores.
///
/// Stateless between repositories; every call rebuilds aggregates and the
/// file graph from the commits it is given.
#[derive(Debug, Clone)]
pub struct ImpactEngine {
    scoring: ScoringConfig,
    pagerank: PageRankConfig,
    rules: AggregationRules,
    normalizer: Normalizer,
    scorer: CompositeScorer,
}

impl ImpactEngine {
    pub fn new(scoring: &ScoringConfig, pagerank: PageRankConfig) -> Self {
        Self {
            scoring: scoring.clone(),
            pagerank,
            rules: AggregationRules::from_config(scoring),
            normalizer: Normalizer::new(scoring.normalization_fallback),
            scorer: CompositeScorer::from_config(scoring),
        }
    }

    /// Score every author of `repository`.
    ///
    /// `structure` supplies import / definition counts per file path when the
    /// source can inspect file contents.
    pub fn score_repository(
        &self,
        repository: &str,
        commits: &[CommitEvent],
        identities: &IdentityMap,
        structure: impl FnMut(&str) -> Option<FileStructure>,
    ) -> RepositoryScores {
        let mut stats = RepositoryStats::aggregate(repository, commits, &self.rules);
        stats.attach_structure(structure);

        let importance = FileGraph::from_commits(commits).importance(&self.pagerank);
        let file_factors = self.file_factors(&stats);
        let touches = file_touches(commits);

        let mut authors: Vec<AuthorScore> = stats
            .authors
            .values()
            .map(|author| {
                let empty = BTreeMap::new();
                let touched = touches.get(author.identifier.as_str()).unwrap_or(&empty);
                self.score_author(author, &stats, &file_factors, &importance, touched, identities)
            })
            .collect();

        authors.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        debug!(
            "Scored {} authors over {} files in {}",
            authors.len(),
            stats.files.len(),
            repository
        );

        RepositoryScores {
            repository: repository.to_string(),
            commits: commits.len(),
            files: stats.files.len(),
            authors,
        }
    }

    fn file_factors(&self, stats: &RepositoryStats) -> BTreeMap<String, FileFactors> {
        let maxima = &stats.maxima;
        let activity_max = ActivityMaxima::for_files(maxima);
        let file_count = stats.files.len();

        stats
            .files
            .iter()
            .map(|(path, file)| {
                let factors = FileFactors {
                    complexity: calculators::complexity(
                        file,
                        maxima,
                        &self.scoring.complexity,
                        &self.normalizer,
                    ),
                    changes: calculators::changes(file.size(), maxima.file_size),
                    lifespan: calculators::lifespan(
                        &file.activity(),
                        &activity_max,
                        &self.scoring.lifespan,
                        &self.normalizer,
                    ),
                    coupling: calculators::coupling(file, file_count),
                };
                (path.clone(), factors)
            })
            .collect()
    }

    fn score_author(
        &self,
        author: &AuthorMetrics,
        stats: &RepositoryStats,
        file_factors: &BTreeMap<String, FileFactors>,
        importance: &BTreeMap<String, f64>,
        touched: &BTreeMap<&str, u64>,
        identities: &IdentityMap,
    ) -> AuthorScore {
        let maxima = &stats.maxima;

        let weighted: Vec<(FileFactors, f64)> = author
            .files
            .iter()
            .filter_map(|path| {
                let factors = file_factors.get(path)?;
                Some((*factors, importance.get(path).copied().unwrap_or(0.0)))
            })
            .collect();
        let file = FileFactors::weighted_mean(&weighted);

        let review = calculators::review_participation(author, maxima, &self.normalizer);
        let author_factors = AuthorFactors {
            lines_changed: calculators::changes(author.lines_changed(), maxima.author_lines_changed),
            commit_frequency: calculators::commit_frequency(author, maxima, &self.normalizer),
            code_quality: calculators::code_quality(
                author,
                review,
                maxima,
                &self.scoring.quality,
                &self.normalizer,
            ),
            review_participation: review,
        };

        let composite = self.scorer.score(&file, &author_factors);

        let author_importance: f64 = author
            .files
            .iter()
            .filter_map(|path| importance.get(path))
            .sum();
        let top = importance.values().copied().fold(0.0_f64, f64::max);
        let critical_file_changes = touched
            .iter()
            .filter(|(path, _)| {
                top > 0.0
                    && importance
                        .get(**path)
                        .is_some_and(|v| v / top > CRITICAL_IMPORTANCE)
            })
            .map(|(_, count)| *count)
            .sum();

        AuthorScore {
            identifier: author.identifier.clone(),
            canonical_name: identities.name_or_identifier(&author.identifier).to_string(),
            score: composite.score,
            raw: composite.raw,
            estimated: composite.estimated,
            breakdown: ScoreBreakdown::new(&file, &author_factors),
            commit_count: author.commit_count,
            lines_changed: author.lines_changed(),
            importance: author_importance,
            critical_file_changes,
        }
    }
}

/// identifier -> path -> number of commits touching the path
fn file_touches(commits: &[CommitEvent]) -> BTreeMap<&str, BTreeMap<&str, u64>> {
    let mut touches: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    for commit in commits {
        let identifier = commit.author_identifier.trim();
        if identifier.is_empty() {
            continue;
        }
        let per_author = touches.entry(identifier).or_default();
        for path in commit.touched_paths() {
            *per_author.entry(path).or_insert(0) += 1;
        }
    }
    touches
}
