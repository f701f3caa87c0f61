//! Event store adapters
//!
//! The engine reads commit events through [`EventSource`] and writes impact
//! scores through [`ScoreSink`]. Both are passed in explicitly, so the same
//! engine runs against Elasticsearch, local git clones or an in-memory store.
//!
//! # Adapters
//!
//! - [`ElasticStore`]: GrimoireLab-style git index in, `_bulk` upserts out
//! - [`GitEventSource`]: local clones read with libgit2
//! - [`MemoryStore`]: in-memory / JSON file, used by tests and offline runs

mod elastic;
mod git;
mod memory;
pub mod structure;

pub use elastic::ElasticStore;
pub use git::GitEventSource;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::{CommitEvent, FileStructure, ScoreDocument};

/// Errors raised by store adapters
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Transport(String),

    #[error("Store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode store response: {0}")]
    Decode(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

/// Read access to commit events
pub trait EventSource {
    /// Commits of `repository` with a timestamp at or after `since`
    fn fetch_commits(
        &self,
        repository: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitEvent>, StoreError>;

    /// Structural counts of a file's current content, when the source can see it
    fn file_structure(&self, _repository: &str, _path: &str) -> Option<FileStructure> {
        None
    }
}

/// A document the sink could not write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

/// Per-document result of a bulk upsert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub written: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

/// Write access for impact scores.
///
/// Upserts are last-write-wins: a document with an existing id replaces the
/// stored score and timestamp. Partial failure is reported per document and
/// never rolls back what was written.
pub trait ScoreSink {
    fn bulk_upsert(&self, documents: &[ScoreDocument]) -> Result<BulkOutcome, StoreError>;
}
