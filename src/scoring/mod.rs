//! Contributor Impact Scoring
//!
//! Combines file-level and author-level sub-scores into one impact score per
//! (repository, author identifier).
//!
//! # Scoring Formula
//!
//! ```text
//! raw   = Σ(file_factor × w) + Σ(author_factor × w)
//!         ─────────────────────────────────────────
//!                        Σ w
//!
//! score = 1 / (1 + e^(−5 × (raw − 0.5)))
//! ```
//!
//! # Default weights
//!
//! - File factors: complexity 0.15, changes 0.25, lifespan 0.05, coupling 0.05
//! - Author factors: lines_changed 0.20, commit_frequency 0.15,
//!   code_quality 0.10, review_participation 0.05
//!
//! File factors of an author are the PageRank-weighted mean of the factors of
//! every file the author touched, so work on central files counts for more.
//!
//! # Example
//!
//! An author whose factors all sit at the neutral 0.5 gets raw 0.5 and a
//! final score of exactly 0.5; raw 0.9 maps to about 0.88.

mod composite;
mod engine;

pub use composite::{
    sigmoid, AuthorFactors, CompositeScore, CompositeScorer, FileFactors, SIGMOID_MIDPOINT,
    SIGMOID_STEEPNESS,
};
pub use engine::{AuthorScore, ImpactEngine, RepositoryScores, ScoreBreakdown};
