//! Weighted composite and sigmoid compression

use serde::Serialize;

use crate::config::{AuthorWeights, FileWeights, ScoringConfig};
use crate::metrics::MetricValue;

/// Steepness of the output sigmoid; fixed for output compatibility
pub const SIGMOID_STEEPNESS: f64 = 5.0;
/// Midpoint of the output sigmoid; `sigmoid(0.5) == 0.5` exactly
pub const SIGMOID_MIDPOINT: f64 = 0.5;

/// `1 / (1 + e^(−5 × (x − 0.5)))`
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-SIGMOID_STEEPNESS * (x - SIGMOID_MIDPOINT)).exp())
}

/// File-derived factors of one author
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FileFactors {
    pub complexity: MetricValue,
    pub changes: MetricValue,
    pub lifespan: MetricValue,
    pub coupling: MetricValue,
}

impl FileFactors {
    pub fn neutral() -> Self {
        Self {
            complexity: MetricValue::neutral(),
            changes: MetricValue::neutral(),
            lifespan: MetricValue::neutral(),
            coupling: MetricValue::neutral(),
        }
    }

    fn values(&self) -> [f64; 4] {
        [
            self.complexity.value,
            self.changes.value,
            self.lifespan.value,
            self.coupling.value,
        ]
    }

    fn any_estimated(&self) -> bool {
        [self.complexity, self.changes, self.lifespan, self.coupling]
            .iter()
            .any(|m| m.estimated)
    }

    /// Weighted mean of several files' factors, factor by factor.
    ///
    /// Falls back to a uniform mean when every weight is zero, and to neutral
    /// factors when there are no files at all.
    pub fn weighted_mean(parts: &[(FileFactors, f64)]) -> Self {
        if parts.is_empty() {
            return Self::neutral();
        }
        let mass: f64 = parts.iter().map(|(_, w)| w.max(0.0)).sum();
        let weight_of = |w: f64| if mass > 0.0 { w.max(0.0) } else { 1.0 };

        let pick = |f: fn(&FileFactors) -> MetricValue| {
            let weighted: Vec<(MetricValue, f64)> =
                parts.iter().map(|(ff, w)| (f(ff), weight_of(*w))).collect();
            MetricValue::weighted(&weighted)
        };

        Self {
            complexity: pick(|f| f.complexity),
            changes: pick(|f| f.changes),
            lifespan: pick(|f| f.lifespan),
            coupling: pick(|f| f.coupling),
        }
    }
}

/// Author-level factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AuthorFactors {
    pub lines_changed: MetricValue,
    pub commit_frequency: MetricValue,
    pub code_quality: MetricValue,
    pub review_participation: MetricValue,
}

impl AuthorFactors {
    fn values(&self) -> [f64; 4] {
        [
            self.lines_changed.value,
            self.commit_frequency.value,
            self.code_quality.value,
            self.review_participation.value,
        ]
    }

    fn any_estimated(&self) -> bool {
        [
            self.lines_changed,
            self.commit_frequency,
            self.code_quality,
            self.review_participation,
        ]
        .iter()
        .any(|m| m.estimated)
    }
}

/// Result of combining the factors of one author
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositeScore {
    /// Weighted mean before the sigmoid
    pub raw: f64,
    /// Final impact score
    pub score: f64,
    /// At least one factor was a substituted neutral value
    pub estimated: bool,
}

/// Pure weighted-sum + sigmoid scorer
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    file_weights: FileWeights,
    author_weights: AuthorWeights,
}

impl CompositeScorer {
    pub fn new(file_weights: FileWeights, author_weights: AuthorWeights) -> Self {
        Self {
            file_weights,
            author_weights,
        }
    }

    pub fn from_config(scoring: &ScoringConfig) -> Self {
        Self::new(scoring.file_weights, scoring.author_weights)
    }

    /// Weighted mean of the factor values.
    ///
    /// Inputs are used as given, without clamping. Zero total weight gives 0.
    pub fn raw(&self, file: &FileFactors, author: &AuthorFactors) -> f64 {
        let file_w = self.file_weights.values();
        let author_w = self.author_weights.values();

        let total: f64 = file_w.iter().chain(author_w.iter()).sum();
        if total == 0.0 {
            return 0.0;
        }

        let sum: f64 = file
            .values()
            .iter()
            .zip(file_w.iter())
            .chain(author.values().iter().zip(author_w.iter()))
            .map(|(v, w)| v * w)
            .sum();
        sum / total
    }

    pub fn score(&self, file: &FileFactors, author: &AuthorFactors) -> CompositeScore {
        let raw = self.raw(file, author);
        CompositeScore {
            raw,
            score: sigmoid(raw),
            estimated: file.any_estimated() || author.any_estimated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computed(v: f64) -> MetricValue {
        MetricValue::computed(v)
    }

    fn uniform(v: f64) -> (FileFactors, AuthorFactors) {
        (
            FileFactors {
                complexity: computed(v),
                changes: computed(v),
                lifespan: computed(v),
                coupling: computed(v),
            },
            AuthorFactors {
                lines_changed: computed(v),
                commit_frequency: computed(v),
                code_quality: computed(v),
                review_participation: computed(v),
            },
        )
    }

    #[test]
    fn test_sigmoid_midpoint_is_exact() {
        assert_eq!(sigmoid(0.5), 0.5);
        let (file, author) = uniform(0.5);
        let score = CompositeScorer::default().score(&file, &author);
        assert_eq!(score.raw, 0.5);
        assert_eq!(score.score, 0.5);
        assert!(!score.estimated);
    }

    #[test]
    fn test_sigmoid_is_strictly_monotonic() {
        let mut previous = sigmoid(-1.0);
        for i in 1..=200 {
            let x = -1.0 + i as f64 * 0.015;
            let current = sigmoid(x);
            assert!(current > previous, "sigmoid not increasing at {x}");
            previous = current;
        }
    }

    #[test]
    fn test_known_values() {
        assert!((sigmoid(1.0) - 1.0 / (1.0 + (-2.5f64).exp())).abs() < 1e-15);
        assert!((sigmoid(0.0) - 0.075_858_180_021_243_55).abs() < 1e-12);
        let (file, author) = uniform(0.9);
        let score = CompositeScorer::default().score(&file, &author);
        assert!((score.raw - 0.9).abs() < 1e-12);
        assert!((score.score - 0.880_797_077_977_882_3).abs() < 1e-9);
    }

    #[test]
    fn test_weights_are_normalized() {
        // Doubling every weight leaves the raw score unchanged
        let (file, author) = uniform(0.3);
        let mut fw = FileWeights::default();
        let mut aw = AuthorWeights::default();
        let base = CompositeScorer::new(fw, aw).raw(&file, &author);
        fw.complexity *= 2.0;
        fw.changes *= 2.0;
        fw.lifespan *= 2.0;
        fw.coupling *= 2.0;
        aw.lines_changed *= 2.0;
        aw.commit_frequency *= 2.0;
        aw.code_quality *= 2.0;
        aw.review_participation *= 2.0;
        let doubled = CompositeScorer::new(fw, aw).raw(&file, &author);
        assert!((base - doubled).abs() < 1e-12);
    }

    #[test]
    fn test_single_factor_contribution() {
        let (mut file, author) = uniform(0.0);
        file.changes = computed(1.0);
        let raw = CompositeScorer::default().raw(&file, &author);
        assert!((raw - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weights_give_zero_raw() {
        let zero_file = FileWeights {
            complexity: 0.0,
            changes: 0.0,
            lifespan: 0.0,
            coupling: 0.0,
        };
        let zero_author = AuthorWeights {
            lines_changed: 0.0,
            commit_frequency: 0.0,
            code_quality: 0.0,
            review_participation: 0.0,
        };
        let (file, author) = uniform(0.8);
        let scorer = CompositeScorer::new(zero_file, zero_author);
        assert_eq!(scorer.raw(&file, &author), 0.0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let (mut file, author) = uniform(0.37);
        file.coupling = computed(0.91);
        let scorer = CompositeScorer::default();
        let a = scorer.score(&file, &author);
        let b = scorer.score(&file, &author);
        assert_eq!(a.score.to_bits(), b.score.to_bits());
    }

    #[test]
    fn test_weighted_mean_of_files() {
        let (hot, _) = uniform(1.0);
        let (cold, _) = uniform(0.0);

        let mean = FileFactors::weighted_mean(&[(hot, 3.0), (cold, 1.0)]);
        assert!((mean.changes.value - 0.75).abs() < 1e-12);

        let uniform_mean = FileFactors::weighted_mean(&[(hot, 0.0), (cold, 0.0)]);
        assert!((uniform_mean.changes.value - 0.5).abs() < 1e-12);
        assert!(!uniform_mean.changes.estimated);

        let none = FileFactors::weighted_mean(&[]);
        assert!(none.complexity.estimated);
    }
}
