//! Contributor and file metrics
//!
//! Aggregates the commits of one repository and turns the aggregates into
//! normalized sub-scores:
//!
//! - **complexity**: churn, imports and definitions of a file
//! - **changes**: lines changed relative to the largest contributor
//! - **lifespan**: span, frequency and contributors of file activity
//! - **coupling**: co-change density of a file
//! - **commit frequency**: commits per active day of an author
//! - **code quality**: bug-fix ratio, review participation, test contribution
//! - **review participation**: review / co-author attributions
//!
//! Every value is a [`MetricValue`], which records whether the neutral 0.5
//! was substituted for missing data.

mod aggregate;
pub mod calculators;
mod normalize;

pub use aggregate::{
    Activity, AggregationRules, AuthorMetrics, FileStats, RepositoryMaxima, RepositoryStats,
};
pub use calculators::ActivityMaxima;
pub use normalize::{MetricValue, NormalizationFallback, Normalizer};
