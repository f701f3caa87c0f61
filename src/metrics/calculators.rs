//! Sub-score calculators
//!
//! Each calculator is a pure function of aggregated statistics and the
//! repository maxima, returning a [`MetricValue`] in [0, 1]. None of them can
//! fail: undefined inputs produce the neutral, estimated 0.5 so one missing
//! metric never stops an author or a repository from being scored.

use super::aggregate::{Activity, AuthorMetrics, FileStats, RepositoryMaxima};
use super::normalize::{MetricValue, Normalizer};
use crate::config::{ComplexityWeights, LifespanWeights, QualityWeights};

/// Complexity of a file from its churn and its structure.
///
/// `line_delta × w₁ + imports × w₂ + definitions × w₃`, every component
/// normalized by the repository maximum. Neutral when the file's structure is
/// unknown or the repository has no signal at all.
pub fn complexity(
    file: &FileStats,
    maxima: &RepositoryMaxima,
    weights: &ComplexityWeights,
    normalizer: &Normalizer,
) -> MetricValue {
    let Some(structure) = file.structure else {
        return MetricValue::neutral();
    };
    if maxima.file_size == 0 && maxima.file_imports == 0 && maxima.file_definitions == 0 {
        return MetricValue::neutral();
    }

    MetricValue::weighted(&[
        (
            normalizer.normalize(file.size() as f64, Some(maxima.file_size as f64)),
            weights.line_delta,
        ),
        (
            normalizer.normalize(structure.imports as f64, Some(maxima.file_imports as f64)),
            weights.imports,
        ),
        (
            normalizer.normalize(
                structure.definitions as f64,
                Some(maxima.file_definitions as f64),
            ),
            weights.definitions,
        ),
    ])
}

/// Lines changed relative to the largest contributor (or file).
///
/// Zero when nothing changed anywhere in the repository.
pub fn changes(lines_changed: u64, max_lines_changed: u64) -> MetricValue {
    if max_lines_changed == 0 {
        return MetricValue::computed(0.0);
    }
    MetricValue::computed(lines_changed as f64 / max_lines_changed as f64)
}

/// Maxima of the activity profiles being compared
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityMaxima {
    pub span_days: f64,
    pub frequency: f64,
    pub contributors: u64,
}

impl ActivityMaxima {
    pub fn for_files(maxima: &RepositoryMaxima) -> Self {
        Self {
            span_days: maxima.file_span_days,
            frequency: maxima.file_frequency,
            contributors: maxima.file_contributors,
        }
    }
}

/// Longevity and intensity of activity on a file (or by an author).
///
/// `span × w₁ + commit frequency × w₂ + distinct contributors × w₃`.
pub fn lifespan(
    activity: &Activity,
    maxima: &ActivityMaxima,
    weights: &LifespanWeights,
    normalizer: &Normalizer,
) -> MetricValue {
    MetricValue::weighted(&[
        (
            normalizer.normalize(activity.span_days, Some(maxima.span_days)),
            weights.span,
        ),
        (
            normalizer.normalize(activity.frequency(), Some(maxima.frequency)),
            weights.frequency,
        ),
        (
            normalizer.normalize(activity.contributors as f64, Some(maxima.contributors as f64)),
            weights.contributors,
        ),
    ])
}

/// Co-change density of a file: distinct co-changed partners over every
/// other file of the repository. Neutral with fewer than two files.
pub fn coupling(file: &FileStats, file_count: usize) -> MetricValue {
    if file_count < 2 {
        return MetricValue::neutral();
    }
    MetricValue::computed(file.partners.len() as f64 / (file_count - 1) as f64)
}

/// Commits per active day, normalized by the busiest author
pub fn commit_frequency(
    author: &AuthorMetrics,
    maxima: &RepositoryMaxima,
    normalizer: &Normalizer,
) -> MetricValue {
    if author.commit_count == 0 {
        return MetricValue::neutral();
    }
    normalizer.normalize(
        author.activity().frequency(),
        Some(maxima.author_commit_frequency),
    )
}

/// Review / co-authorship attributions, normalized by the most attributed
/// author. Zero when nobody in the repository was attributed.
pub fn review_participation(
    author: &AuthorMetrics,
    maxima: &RepositoryMaxima,
    normalizer: &Normalizer,
) -> MetricValue {
    normalizer.normalize(
        author.review_mentions as f64,
        Some(maxima.review_mentions as f64),
    )
}

/// `(1 − normalized bug-fix ratio) × w₁ + review × w₂ + test contribution × w₃`
pub fn code_quality(
    author: &AuthorMetrics,
    review: MetricValue,
    maxima: &RepositoryMaxima,
    weights: &QualityWeights,
    normalizer: &Normalizer,
) -> MetricValue {
    let bug_fix = match author.bug_fix_ratio() {
        Some(ratio) => {
            let normalized = normalizer.normalize(ratio, Some(maxima.bug_fix_ratio));
            MetricValue {
                value: 1.0 - normalized.value,
                estimated: normalized.estimated,
            }
        }
        None => MetricValue::neutral(),
    };
    let tests = author
        .test_file_ratio()
        .map_or_else(MetricValue::neutral, MetricValue::computed);

    MetricValue::weighted(&[
        (bug_fix, weights.bug_fix),
        (review, weights.review),
        (tests, weights.tests),
    ])
}
