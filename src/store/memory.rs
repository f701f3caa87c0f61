//! In-memory event store

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use super::{BulkFailure, BulkOutcome, EventSource, ScoreSink, StoreError};
use crate::models::{CommitEvent, FileStructure, ImpactScore, ScoreDocument};

/// Commit events and score documents held in memory.
///
/// Doubles as the `json` source: [`MemoryStore::from_json_file`] loads a JSON
/// array of commit events.
#[derive(Debug, Default)]
pub struct MemoryStore {
    commits: Vec<CommitEvent>,
    structures: HashMap<(String, String), FileStructure>,
    documents: RwLock<BTreeMap<String, ImpactScore>>,
    rejected_ids: HashSet<String>,
    unreachable: HashSet<String>,
}

impl MemoryStore {
    pub fn new(commits: Vec<CommitEvent>) -> Self {
        Self {
            commits,
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read events file {}", path.display()))?;
        let commits: Vec<CommitEvent> = serde_json::from_str(&content)
            .with_context(|| format!("Events file {} is not a JSON array of commits", path.display()))?;
        Ok(Self::new(commits))
    }

    /// Known structure for a file
    pub fn with_structure(mut self, repository: &str, path: &str, structure: FileStructure) -> Self {
        self.structures
            .insert((repository.to_string(), path.to_string()), structure);
        self
    }

    /// Make `bulk_upsert` reject this document id
    pub fn reject_id(mut self, id: impl Into<String>) -> Self {
        self.rejected_ids.insert(id.into());
        self
    }

    /// Make `fetch_commits` fail for this repository
    pub fn fail_repository(mut self, repository: impl Into<String>) -> Self {
        self.unreachable.insert(repository.into());
        self
    }

    /// Snapshot of the stored score documents, keyed by id
    pub fn documents(&self) -> BTreeMap<String, ImpactScore> {
        self.documents
            .read()
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }

    /// Distinct repositories present in the loaded commits, in first-seen order
    pub fn repositories(&self) -> Vec<String> {
        let mut repos: Vec<String> = Vec::new();
        for commit in &self.commits {
            if !repos.contains(&commit.repository) {
                repos.push(commit.repository.clone());
            }
        }
        repos
    }
}

impl EventSource for MemoryStore {
    fn fetch_commits(
        &self,
        repository: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitEvent>, StoreError> {
        if self.unreachable.contains(repository) {
            return Err(StoreError::Transport(format!(
                "repository {repository} is unreachable"
            )));
        }
        Ok(self
            .commits
            .iter()
            .filter(|c| c.repository == repository && c.timestamp >= since)
            .cloned()
            .collect())
    }

    fn file_structure(&self, repository: &str, path: &str) -> Option<FileStructure> {
        self.structures
            .get(&(repository.to_string(), path.to_string()))
            .copied()
    }
}

impl ScoreSink for MemoryStore {
    fn bulk_upsert(&self, documents: &[ScoreDocument]) -> Result<BulkOutcome, StoreError> {
        let mut stored = self
            .documents
            .write()
            .map_err(|_| StoreError::Transport("document lock poisoned".to_string()))?;

        let mut outcome = BulkOutcome::default();
        for doc in documents {
            if self.rejected_ids.contains(&doc.id) {
                outcome.failed.push(BulkFailure {
                    id: doc.id.clone(),
                    reason: "rejected by store".to_string(),
                });
                continue;
            }
            stored.insert(doc.id.clone(), doc.body.clone());
            outcome.written.push(doc.id.clone());
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn score(repo: &str, author: &str, value: f64) -> ScoreDocument {
        ScoreDocument {
            id: crate::models::document_id(repo, author),
            body: ImpactScore {
                repository: repo.into(),
                author_identifier: author.to_lowercase(),
                author_name: author.into(),
                score: value,
                computed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
        }
    }

    #[test]
    fn test_upsert_overwrites_same_id() {
        let store = MemoryStore::default();
        store.bulk_upsert(&[score("r", "Alice", 0.2)]).unwrap();
        store.bulk_upsert(&[score("r", "Alice", 0.9)]).unwrap();
        let docs = store.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs["r_Alice"].score, 0.9);
    }

    #[test]
    fn test_rejected_ids_are_reported() {
        let store = MemoryStore::default().reject_id("r_Bob");
        let outcome = store
            .bulk_upsert(&[score("r", "Alice", 0.2), score("r", "Bob", 0.3)])
            .unwrap();
        assert_eq!(outcome.written, vec!["r_Alice".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(store.documents().len(), 1);
    }

    #[test]
    fn test_fetch_filters_repository_and_window() {
        let at = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let mk = |repo: &str, day| CommitEvent {
            repository: repo.into(),
            author_identifier: "a".into(),
            author_display_name: "A".into(),
            commit_hash: String::new(),
            timestamp: at(day),
            files: vec![],
            message: String::new(),
        };
        let store = MemoryStore::new(vec![mk("r1", 1), mk("r1", 10), mk("r2", 10)]);
        assert_eq!(store.fetch_commits("r1", at(5)).unwrap().len(), 1);
        assert_eq!(store.repositories(), vec!["r1".to_string(), "r2".to_string()]);

        let failing = MemoryStore::new(vec![]).fail_repository("r1");
        assert!(failing.fetch_commits("r1", at(1)).is_err());
    }
}
