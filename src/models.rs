//! Core data models for impactlens
//!
//! These models are shared by the event sources, the scoring engine and the
//! publisher. Commit events are read-only inputs; impact scores are the only
//! thing the engine writes back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build the deterministic document id for a (repository, author name) pair.
///
/// The id is stable across runs so that re-publishing overwrites the previous
/// document instead of creating a new one. Path separators and colons are not
/// accepted by every store in ids, so both become `_`.
pub fn document_id(repository: &str, author_name: &str) -> String {
    format!("{repository}_{author_name}")
        .chars()
        .map(|c| if c == '/' || c == ':' { '_' } else { c })
        .collect()
}

/// Line delta for a single file within a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_removed: u64,
}

impl FileChange {
    pub fn new(path: impl Into<String>, lines_added: u64, lines_removed: u64) -> Self {
        Self {
            path: path.into(),
            lines_added,
            lines_removed,
        }
    }

    /// Additions plus deletions
    pub fn lines_changed(&self) -> u64 {
        self.lines_added + self.lines_removed
    }
}

/// A single commit as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitEvent {
    /// Repository origin (URL or path) the commit belongs to
    #[serde(alias = "origin")]
    pub repository: String,
    /// Stable contributor identifier (uuid, email...)
    pub author_identifier: String,
    /// Display name as written on this commit; may differ between commits
    #[serde(default)]
    pub author_display_name: String,
    #[serde(default)]
    pub commit_hash: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<FileChange>,
    #[serde(default)]
    pub message: String,
}

impl CommitEvent {
    /// Total lines changed over every file of the commit
    pub fn lines_changed(&self) -> u64 {
        self.files.iter().map(FileChange::lines_changed).sum()
    }

    /// Distinct paths touched by this commit, in first-seen order.
    pub fn touched_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::with_capacity(self.files.len());
        for file in &self.files {
            if !paths.contains(&file.path.as_str()) {
                paths.push(&file.path);
            }
        }
        paths
    }
}

/// Structural counts of a file's current content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStructure {
    /// Import / include / use statements
    pub imports: u64,
    /// Function, method and type definitions
    pub definitions: u64,
}

/// The persisted output of a scoring run for one (repository, author) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactScore {
    pub repository: String,
    pub author_identifier: String,
    pub author_name: String,
    pub score: f64,
    pub computed_at: DateTime<Utc>,
}

/// An impact score ready to be upserted under a caller-chosen id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDocument {
    pub id: String,
    pub body: ImpactScore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_document_id_sanitizes_separators() {
        assert_eq!(
            document_id("https://github.com/org/repo", "Alice"),
            "https___github.com_org_repo_Alice"
        );
        assert_eq!(document_id("repo", "A. Smith"), "repo_A. Smith");
    }

    #[test]
    fn test_document_id_is_stable() {
        let a = document_id("git@host:org/repo.git", "Bob");
        let b = document_id("git@host:org/repo.git", "Bob");
        assert_eq!(a, b);
        assert!(!a.contains('/'));
        assert!(!a.contains(':'));
    }

    #[test]
    fn test_touched_paths_dedupes() {
        let commit = CommitEvent {
            repository: "r".into(),
            author_identifier: "a".into(),
            author_display_name: "A".into(),
            commit_hash: "h".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            files: vec![
                FileChange::new("a.py", 1, 2),
                FileChange::new("b.py", 3, 0),
                FileChange::new("a.py", 1, 0),
            ],
            message: String::new(),
        };
        assert_eq!(commit.touched_paths(), vec!["a.py", "b.py"]);
        assert_eq!(commit.lines_changed(), 7);
    }

    #[test]
    fn test_commit_event_accepts_origin_alias() {
        let json = r#"{
            "origin": "https://example.com/repo.git",
            "author_identifier": "u-1",
            "timestamp": "2024-03-01T10:00:00Z"
        }"#;
        let commit: CommitEvent = serde_json::from_str(json).unwrap();
        assert_eq!(commit.repository, "https://example.com/repo.git");
        assert!(commit.files.is_empty());
        assert_eq!(commit.author_display_name, "");
    }
}
