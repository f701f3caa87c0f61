//! Commit events from local git clones using libgit2

use chrono::{DateTime, TimeZone, Utc};
use git2::{Commit, Diff, ErrorCode, Patch, Repository, Sort};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::structure;
use super::{EventSource, StoreError};
use crate::models::{CommitEvent, FileChange, FileStructure};

/// Reads commits straight from git repositories on disk.
///
/// A repository origin that is an existing directory is opened as is. Any
/// other origin (usually a clone URL) is looked up under `clone_root` by its
/// last path segment, without a trailing `.git`.
#[derive(Debug, Clone, Default)]
pub struct GitEventSource {
    clone_root: Option<PathBuf>,
}

impl GitEventSource {
    pub fn new(clone_root: Option<PathBuf>) -> Self {
        Self { clone_root }
    }

    /// Local path for a repository origin
    pub fn resolve(&self, repository: &str) -> PathBuf {
        let direct = Path::new(repository);
        if direct.is_dir() {
            return direct.to_path_buf();
        }
        let name = repository
            .trim_end_matches('/')
            .rsplit(['/', ':'])
            .next()
            .unwrap_or(repository);
        let name = name.strip_suffix(".git").unwrap_or(name);
        match &self.clone_root {
            Some(root) => root.join(name),
            None => PathBuf::from(name),
        }
    }

    fn open(&self, repository: &str) -> Result<Repository, StoreError> {
        let path = self.resolve(repository);
        if !path.exists() {
            return Err(StoreError::RepositoryNotFound(path.display().to_string()));
        }
        let repo = Repository::open(&path)?;
        debug!("Opened git repository at {:?}", repo.path());
        Ok(repo)
    }
}

impl EventSource for GitEventSource {
    fn fetch_commits(
        &self,
        repository: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitEvent>, StoreError> {
        let repo = self.open(repository)?;

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        match revwalk.push_head() {
            Ok(()) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                debug!("{} has no commits yet", repository);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let mut events = Vec::new();
        for oid_result in revwalk {
            let commit = repo.find_commit(oid_result?)?;
            let Some(timestamp) = commit_time(&commit) else {
                continue;
            };
            if timestamp < since {
                break; // Commits are sorted by time, so we can stop
            }

            let parent = commit.parent(0).ok();
            let tree = commit.tree()?;
            let parent_tree = parent.as_ref().map(|p| p.tree()).transpose()?;
            let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

            let author = commit.author();
            let name = author.name().unwrap_or("").trim().to_string();
            let email = author.email().unwrap_or("").trim().to_lowercase();
            let identifier = if email.is_empty() { name.clone() } else { email };

            events.push(CommitEvent {
                repository: repository.to_string(),
                author_identifier: identifier,
                author_display_name: name,
                commit_hash: commit.id().to_string(),
                timestamp,
                files: file_changes(&diff)?,
                message: commit.message().unwrap_or("").to_string(),
            });
        }

        events.reverse();
        debug!("Read {} commits from {}", events.len(), repository);
        Ok(events)
    }

    fn file_structure(&self, repository: &str, path: &str) -> Option<FileStructure> {
        if !structure::is_source_path(path) {
            return None;
        }
        let repo = self.open(repository).ok()?;
        let tree = repo.head().ok()?.peel_to_tree().ok()?;
        let entry = tree.get_path(Path::new(path)).ok()?;
        let blob = entry.to_object(&repo).ok()?.peel_to_blob().ok()?;
        if blob.is_binary() {
            return None;
        }
        let content = std::str::from_utf8(blob.content()).ok()?;
        Some(structure::inspect(content))
    }
}

/// Per-file additions and deletions of a diff
fn file_changes(diff: &Diff<'_>) -> Result<Vec<FileChange>, StoreError> {
    let mut changes = Vec::new();
    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };
        let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) else {
            continue;
        };
        let (added, removed) = match Patch::from_diff(diff, idx)? {
            Some(patch) => {
                let (_, additions, deletions) = patch.line_stats()?;
                (additions as u64, deletions as u64)
            }
            None => (0, 0),
        };
        changes.push(FileChange::new(
            path.to_string_lossy().to_string(),
            added,
            removed,
        ));
    }
    Ok(changes)
}

fn commit_time(commit: &Commit<'_>) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(commit.time().seconds(), 0).single()
}
