//! Impactlens - contributor impact scoring for git activity
//!
//! Reads commit events for a set of repositories, builds a co-change graph
//! of their files, and combines complexity, change volume, lifespan,
//! coupling and code quality signals into one score per contributor.

pub mod cli;
pub mod config;
pub mod graph;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod reporters;
pub mod scoring;
pub mod store;
