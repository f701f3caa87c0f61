//! Per-repository aggregation of commit events
//!
//! Turns the raw commit list of one repository into per-author and per-file
//! statistics plus the repository-wide maxima the calculators normalize by.
//! Everything is keyed with ordered maps so that two runs over the same
//! commits sum floats in the same order.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ScoringConfig;
use crate::models::{CommitEvent, FileStructure};

/// Keyword and path rules used while aggregating
#[derive(Debug, Clone)]
pub struct AggregationRules {
    bug_fix_keywords: Vec<String>,
    review_markers: Vec<String>,
    test_path_markers: Vec<String>,
}

impl AggregationRules {
    pub fn new(
        bug_fix_keywords: &[String],
        review_markers: &[String],
        test_path_markers: &[String],
    ) -> Self {
        let lower = |v: &[String]| -> Vec<String> {
            v.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            bug_fix_keywords: lower(bug_fix_keywords),
            review_markers: lower(review_markers),
            test_path_markers: lower(test_path_markers),
        }
    }

    pub fn from_config(scoring: &ScoringConfig) -> Self {
        Self::new(
            &scoring.bug_fix_keywords,
            &scoring.review_markers,
            &scoring.test_path_markers,
        )
    }

    /// Case-insensitive keyword match on the commit message
    pub fn is_bug_fix(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.bug_fix_keywords.iter().any(|k| message.contains(k))
    }

    /// Lower-cased remainders of every review/co-author trailer line
    pub fn review_attributions(&self, message: &str) -> Vec<String> {
        message
            .lines()
            .filter_map(|line| {
                let line = line.trim().to_lowercase();
                self.review_markers
                    .iter()
                    .find(|m| line.starts_with(m.as_str()))
                    .map(|m| line[m.len()..].trim().to_string())
            })
            .collect()
    }

    /// A path is a test when one of its words is a marker.
    ///
    /// Words are split on `/`, `.`, `_` and `-`, so `tests/a.py`,
    /// `test_a.py`, `a_test.go` and `a.spec.ts` match while `latest.py` does
    /// not. CamelCase words match on a capitalized marker prefix or suffix
    /// (`FooTest.java`, `TestFoo.cs`).
    pub fn is_test_path(&self, path: &str) -> bool {
        path.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .any(|word| {
                let lower = word.to_lowercase();
                self.test_path_markers.iter().any(|m| {
                    lower == *m
                        || lower.strip_suffix('s') == Some(m.as_str())
                        || is_camel_marker(word, m)
                })
            })
    }
}

/// `FooTest` / `FooTests` / `TestFoo` for marker `test`
fn is_camel_marker(word: &str, marker: &str) -> bool {
    let mut chars = marker.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let capitalized: String = first.to_uppercase().chain(chars).collect();
    word.len() > capitalized.len()
        && (word.starts_with(&capitalized)
            || word.ends_with(&capitalized)
            || word
                .strip_suffix('s')
                .is_some_and(|w| w.ends_with(&capitalized)))
}

impl Default for AggregationRules {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

/// Activity profile of a file or an author
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Activity {
    /// Days between first and last activity (fractional)
    pub span_days: f64,
    /// Number of commits
    pub activity_count: u64,
    /// Distinct contributors involved
    pub contributors: u64,
}

impl Activity {
    /// Commits per day; spans shorter than a day count as one day
    pub fn frequency(&self) -> f64 {
        self.activity_count as f64 / self.span_days.max(1.0)
    }
}

fn span_days(first: Option<DateTime<Utc>>, last: Option<DateTime<Utc>>) -> f64 {
    match (first, last) {
        (Some(first), Some(last)) => ((last - first).num_seconds().max(0) as f64) / 86_400.0,
        _ => 0.0,
    }
}

/// Whether a trailer remainder such as `bob <bob@x.io>` names `identifier`.
///
/// The whole remainder or one of its whitespace / angle-bracket separated
/// tokens must equal the identifier.
fn names_identifier(attribution: &str, identifier: &str) -> bool {
    if identifier.is_empty() {
        return false;
    }
    attribution == identifier
        || attribution
            .split(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | ',' | ';' | '(' | ')'))
            .any(|token| token == identifier)
}

/// Aggregated counts for one author identifier in one repository
#[derive(Debug, Clone, Default)]
pub struct AuthorMetrics {
    pub identifier: String,
    pub commit_count: u64,
    /// File-change entries over all commits
    pub files_changed: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    /// Commits per calendar day
    pub commit_dates: BTreeMap<NaiveDate, u64>,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    pub bug_fix_commits: u64,
    /// Commits (by anyone) attributing review or co-authorship to this author
    pub review_mentions: u64,
    /// Distinct files touched
    pub files: BTreeSet<String>,
    /// Distinct test files touched
    pub test_files: BTreeSet<String>,
}

impl AuthorMetrics {
    pub fn lines_changed(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }

    pub fn activity(&self) -> Activity {
        Activity {
            span_days: span_days(self.first_commit, self.last_commit),
            activity_count: self.commit_count,
            contributors: 1,
        }
    }

    /// Share of commits flagged as bug fixes; `None` without commits
    pub fn bug_fix_ratio(&self) -> Option<f64> {
        (self.commit_count > 0).then(|| self.bug_fix_commits as f64 / self.commit_count as f64)
    }

    /// Share of touched files that are tests; `None` without files
    pub fn test_file_ratio(&self) -> Option<f64> {
        (!self.files.is_empty()).then(|| self.test_files.len() as f64 / self.files.len() as f64)
    }
}

/// Aggregated history of one file in one repository
#[derive(Debug, Clone)]
pub struct FileStats {
    pub path: String,
    /// Commits touching the file
    pub commit_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Author identifiers that touched the file
    pub contributors: BTreeSet<String>,
    /// Files co-changed with this one
    pub partners: BTreeSet<String>,
    pub structure: Option<FileStructure>,
}

impl FileStats {
    fn new(path: &str, at: DateTime<Utc>) -> Self {
        Self {
            path: path.to_string(),
            commit_count: 0,
            lines_added: 0,
            lines_removed: 0,
            first_seen: at,
            last_seen: at,
            contributors: BTreeSet::new(),
            partners: BTreeSet::new(),
            structure: None,
        }
    }

    /// Cumulative additions plus deletions over the window
    pub fn size(&self) -> u64 {
        self.lines_added + self.lines_removed
    }

    pub fn activity(&self) -> Activity {
        Activity {
            span_days: span_days(Some(self.first_seen), Some(self.last_seen)),
            activity_count: self.commit_count,
            contributors: self.contributors.len() as u64,
        }
    }
}

/// Repository-wide maxima used for normalization
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RepositoryMaxima {
    pub author_lines_changed: u64,
    pub author_commit_frequency: f64,
    pub bug_fix_ratio: f64,
    pub review_mentions: u64,
    pub file_size: u64,
    pub file_imports: u64,
    pub file_definitions: u64,
    pub file_span_days: f64,
    pub file_frequency: f64,
    pub file_contributors: u64,
}

/// Everything the calculators need about one repository
#[derive(Debug, Clone, Default)]
pub struct RepositoryStats {
    pub repository: String,
    pub authors: BTreeMap<String, AuthorMetrics>,
    pub files: BTreeMap<String, FileStats>,
    pub maxima: RepositoryMaxima,
}

impl RepositoryStats {
    /// Aggregate the commits of `repository`.
    ///
    /// Commits with an empty author identifier are ignored.
    pub fn aggregate(repository: &str, commits: &[CommitEvent], rules: &AggregationRules) -> Self {
        let mut stats = Self {
            repository: repository.to_string(),
            ..Default::default()
        };

        for commit in commits {
            let identifier = commit.author_identifier.trim();
            if identifier.is_empty() {
                continue;
            }

            let author = stats
                .authors
                .entry(identifier.to_string())
                .or_insert_with(|| AuthorMetrics {
                    identifier: identifier.to_string(),
                    ..Default::default()
                });
            author.commit_count += 1;
            author.files_changed += commit.files.len() as u64;
            *author
                .commit_dates
                .entry(commit.timestamp.date_naive())
                .or_insert(0) += 1;
            author.first_commit = Some(
                author
                    .first_commit
                    .map_or(commit.timestamp, |t| t.min(commit.timestamp)),
            );
            author.last_commit = Some(
                author
                    .last_commit
                    .map_or(commit.timestamp, |t| t.max(commit.timestamp)),
            );
            if rules.is_bug_fix(&commit.message) {
                author.bug_fix_commits += 1;
            }

            for change in &commit.files {
                author.lines_added += change.lines_added;
                author.lines_deleted += change.lines_removed;
                author.files.insert(change.path.clone());
                if rules.is_test_path(&change.path) {
                    author.test_files.insert(change.path.clone());
                }

                let file = stats
                    .files
                    .entry(change.path.clone())
                    .or_insert_with(|| FileStats::new(&change.path, commit.timestamp));
                file.lines_added += change.lines_added;
                file.lines_removed += change.lines_removed;
                file.first_seen = file.first_seen.min(commit.timestamp);
                file.last_seen = file.last_seen.max(commit.timestamp);
                file.contributors.insert(identifier.to_string());
            }

            let paths = commit.touched_paths();
            for path in &paths {
                if let Some(file) = stats.files.get_mut(*path) {
                    file.commit_count += 1;
                    file.partners
                        .extend(paths.iter().filter(|p| *p != path).map(|p| p.to_string()));
                }
            }
        }

        stats.count_review_mentions(commits, rules);
        stats.maxima = stats.compute_maxima();
        stats
    }

    fn count_review_mentions(&mut self, commits: &[CommitEvent], rules: &AggregationRules) {
        for commit in commits {
            let attributions = rules.review_attributions(&commit.message);
            if attributions.is_empty() {
                continue;
            }
            for author in self.authors.values_mut() {
                let needle = author.identifier.to_lowercase();
                if attributions.iter().any(|a| names_identifier(a, &needle)) {
                    author.review_mentions += 1;
                }
            }
        }
    }

    /// Attach structural counts to files and refresh the maxima
    pub fn attach_structure(&mut self, mut lookup: impl FnMut(&str) -> Option<FileStructure>) {
        for file in self.files.values_mut() {
            file.structure = lookup(&file.path);
        }
        self.maxima = self.compute_maxima();
    }

    fn compute_maxima(&self) -> RepositoryMaxima {
        let mut m = RepositoryMaxima::default();
        for author in self.authors.values() {
            m.author_lines_changed = m.author_lines_changed.max(author.lines_changed());
            m.author_commit_frequency = m.author_commit_frequency.max(author.activity().frequency());
            m.bug_fix_ratio = m.bug_fix_ratio.max(author.bug_fix_ratio().unwrap_or(0.0));
            m.review_mentions = m.review_mentions.max(author.review_mentions);
        }
        for file in self.files.values() {
            let activity = file.activity();
            m.file_size = m.file_size.max(file.size());
            m.file_span_days = m.file_span_days.max(activity.span_days);
            m.file_frequency = m.file_frequency.max(activity.frequency());
            m.file_contributors = m.file_contributors.max(activity.contributors);
            if let Some(s) = file.structure {
                m.file_imports = m.file_imports.max(s.imports);
                m.file_definitions = m.file_definitions.max(s.definitions);
            }
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileChange;
    use chrono::{Duration, TimeZone};

    fn commit(author: &str, day: i64, files: &[(&str, u64, u64)], message: &str) -> CommitEvent {
        CommitEvent {
            repository: "repo".into(),
            author_identifier: author.into(),
            author_display_name: author.to_uppercase(),
            commit_hash: format!("{author}-{day}"),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::days(day),
            files: files
                .iter()
                .map(|(p, a, r)| FileChange::new(*p, *a, *r))
                .collect(),
            message: message.into(),
        }
    }

    #[test]
    fn test_bug_fix_keywords_case_insensitive() {
        let rules = AggregationRules::default();
        assert!(rules.is_bug_fix("FIX crash on startup"));
        assert!(rules.is_bug_fix("Resolve Issue #12"));
        assert!(rules.is_bug_fix("Solved the race"));
        assert!(!rules.is_bug_fix("Add feature flag"));
    }

    #[test]
    fn test_test_paths_match_whole_words() {
        let rules = AggregationRules::default();
        for path in [
            "tests/test_core.py",
            "src/core_test.go",
            "web/app.spec.ts",
            "src/__tests__/app.js",
            "src/test/java/FooTest.java",
            "Tests/TestParser.cs",
            "spec/models/user_spec.rb",
        ] {
            assert!(rules.is_test_path(path), "{path} should be a test path");
        }
        for path in ["src/latest.py", "src/contest.rs", "tools/inspector.py", "src/Attestation.java"] {
            assert!(!rules.is_test_path(path), "{path} should not be a test path");
        }
    }

    #[test]
    fn test_review_attributions() {
        let rules = AggregationRules::default();
        let msg = "Add thing\n\nCo-authored-by: Bob <bob@x.io>\nREVIEWED-BY: carol@x.io\nSigned-off-by: dave";
        assert_eq!(
            rules.review_attributions(msg),
            vec!["bob <bob@x.io>".to_string(), "carol@x.io".to_string()]
        );
    }

    #[test]
    fn test_aggregate_authors_and_files() {
        let commits = vec![
            commit("alice", 0, &[("a.py", 10, 2), ("b.py", 5, 0)], "feat"),
            commit("alice", 2, &[("a.py", 1, 1)], "fix typo"),
            commit("bob", 1, &[("tests/test_a.py", 3, 0)], "add test"),
        ];
        let stats = RepositoryStats::aggregate("repo", &commits, &AggregationRules::default());

        let alice = &stats.authors["alice"];
        assert_eq!(alice.commit_count, 2);
        assert_eq!(alice.files_changed, 3);
        assert_eq!(alice.lines_changed(), 19);
        assert_eq!(alice.bug_fix_commits, 1);
        assert_eq!(alice.commit_dates.len(), 2);
        assert!((alice.activity().span_days - 2.0).abs() < 1e-9);

        let bob = &stats.authors["bob"];
        assert_eq!(bob.test_file_ratio(), Some(1.0));

        let a = &stats.files["a.py"];
        assert_eq!(a.commit_count, 2);
        assert_eq!(a.size(), 14);
        assert_eq!(a.partners.iter().collect::<Vec<_>>(), vec!["b.py"]);
        assert!(stats.files["tests/test_a.py"].partners.is_empty());

        assert_eq!(stats.maxima.author_lines_changed, 19);
        assert_eq!(stats.maxima.file_size, 14);
        assert_eq!(stats.maxima.bug_fix_ratio, 0.5);
    }

    #[test]
    fn test_review_mentions_counted_for_referenced_author() {
        let commits = vec![
            commit("alice", 0, &[("a.py", 1, 0)], "feat\n\nReviewed-by: Bob@Example.com"),
            commit("bob@example.com", 1, &[("b.py", 1, 0)], "feat"),
        ];
        let stats = RepositoryStats::aggregate("repo", &commits, &AggregationRules::default());
        assert_eq!(stats.authors["bob@example.com"].review_mentions, 1);
        assert_eq!(stats.authors["alice"].review_mentions, 0);
        assert_eq!(stats.maxima.review_mentions, 1);
    }

    #[test]
    fn test_review_mention_needs_whole_identifier() {
        let commits = vec![
            commit("bob@x.io", 0, &[("a.py", 1, 0)], "feat"),
            commit("carol", 1, &[("b.py", 1, 0)], "feat\n\nReviewed-by: Jimbob <jimbob@x.io>"),
            commit("jimbob@x.io", 2, &[("c.py", 1, 0)], "docs"),
        ];
        let stats = RepositoryStats::aggregate("repo", &commits, &AggregationRules::default());
        assert_eq!(stats.authors["bob@x.io"].review_mentions, 0);
        assert_eq!(stats.authors["jimbob@x.io"].review_mentions, 1);
    }

    #[test]
    fn test_names_identifier_tokens() {
        assert!(names_identifier("bob <bob@x.io>", "bob@x.io"));
        assert!(names_identifier("alice smith", "alice smith"));
        assert!(names_identifier("a", "a"));
        assert!(!names_identifier("jimbob <jimbob@x.io>", "bob@x.io"));
        assert!(!names_identifier("anna <anna@x.io>", "a"));
        assert!(!names_identifier("anything", ""));
    }

    #[test]
    fn test_blank_identifier_skipped() {
        let commits = vec![commit("  ", 0, &[("a.py", 1, 0)], "x")];
        let stats = RepositoryStats::aggregate("repo", &commits, &AggregationRules::default());
        assert!(stats.authors.is_empty());
        assert!(stats.files.is_empty());
    }

    #[test]
    fn test_attach_structure_updates_maxima() {
        let commits = vec![commit("alice", 0, &[("a.py", 1, 0), ("b.py", 1, 0)], "x")];
        let mut stats = RepositoryStats::aggregate("repo", &commits, &AggregationRules::default());
        stats.attach_structure(|path| {
            (path == "a.py").then_some(FileStructure {
                imports: 4,
                definitions: 9,
            })
        });
        assert_eq!(stats.maxima.file_imports, 4);
        assert_eq!(stats.maxima.file_definitions, 9);
        assert!(stats.files["b.py"].structure.is_none());
    }
}
