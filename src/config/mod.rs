//! Configuration module for impactlens
//!
//! This module handles:
//! - Engine configuration (impactlens.toml)
//! - Scoring weight tables
//! - Store credentials from the user config and environment
//! - The GrimoireLab projects registry

mod impact_config;
pub mod projects;
mod user_config;

pub use impact_config::{
    load_config, weights_valid, AuthorWeights, ComplexityWeights, FileWeights, IdentityConfig,
    ImpactConfig, LifespanWeights, LookupKind, PageRankConfig, ProjectsConfig, QualityWeights,
    ScoringConfig, SourceConfig, SourceKind, StoreConfig, WindowConfig,
};
pub use projects::ProjectRegistry;
pub use user_config::UserConfig;
