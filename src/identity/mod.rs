//! Author identity resolution
//!
//! Results are keyed by author identifier. The display name attached to a
//! score is resolved once per run:
//!
//! 1. the most frequent non-blank name observed for the identifier in the
//!    window (ties go to the name seen first in timestamp order);
//! 2. otherwise an [`IdentityLookup`] keyed by identifier;
//! 3. otherwise the identifier itself.
//!
//! Resolution never fails.

mod lookup;

pub use lookup::{lookup_from_config, HttpIdentityLookup, NoLookup};

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::models::CommitEvent;

/// Errors from an external identity lookup
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Identity lookup is not configured")]
    Disabled,

    #[error("Identity lookup request failed: {0}")]
    Transport(String),

    #[error("Identity lookup returned HTTP {0}")]
    Status(u16),

    #[error("No profile found for {0}")]
    NotFound(String),

    #[error("Failed to parse lookup response: {0}")]
    Decode(String),
}

pub type LookupResult<T> = Result<T, LookupError>;

/// Best-effort display name for an identifier
pub trait IdentityLookup {
    fn display_name(&self, identifier: &str) -> LookupResult<String>;
}

/// Where a canonical name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Observed,
    Lookup,
    Identifier,
}

/// identifier -> canonical display name for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    names: BTreeMap<String, (String, NameSource)>,
}

impl IdentityMap {
    pub fn name(&self, identifier: &str) -> Option<&str> {
        self.names.get(identifier).map(|(name, _)| name.as_str())
    }

    pub fn source(&self, identifier: &str) -> Option<NameSource> {
        self.names.get(identifier).map(|(_, source)| *source)
    }

    /// Canonical name, or the identifier when it was never resolved
    pub fn name_or_identifier<'a>(&'a self, identifier: &'a str) -> &'a str {
        self.name(identifier).unwrap_or(identifier)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Most frequent observed display name per identifier.
///
/// Commits are visited in timestamp order (input order among equal
/// timestamps); on equal counts the name encountered first wins. Blank
/// identifiers and blank names are ignored.
pub fn observed_names(commits: &[CommitEvent]) -> BTreeMap<String, String> {
    let mut order: Vec<&CommitEvent> = commits.iter().collect();
    order.sort_by_key(|c| c.timestamp);

    // Per identifier: (name, count) in first-seen order
    let mut tallies: BTreeMap<&str, Vec<(&str, u64)>> = BTreeMap::new();
    for commit in order {
        let identifier = commit.author_identifier.trim();
        let name = commit.author_display_name.trim();
        if identifier.is_empty() {
            continue;
        }
        let tally = tallies.entry(identifier).or_default();
        if name.is_empty() {
            continue;
        }
        match tally.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => tally.push((name, 1)),
        }
    }

    tallies
        .into_iter()
        .filter_map(|(identifier, tally)| {
            let mut best: Option<(&str, u64)> = None;
            for (name, count) in tally {
                match best {
                    Some((_, top)) if count <= top => {}
                    _ => best = Some((name, count)),
                }
            }
            best.map(|(name, _)| (identifier.to_string(), name.to_string()))
        })
        .collect()
}

/// Resolves canonical names, falling back to an external lookup
pub struct IdentityResolver<'a> {
    lookup: &'a dyn IdentityLookup,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(lookup: &'a dyn IdentityLookup) -> Self {
        Self { lookup }
    }

    /// Canonical name for every non-blank identifier in `commits`
    pub fn resolve(&self, commits: &[CommitEvent]) -> IdentityMap {
        let observed = observed_names(commits);
        let mut map = IdentityMap::default();

        for commit in commits {
            let identifier = commit.author_identifier.trim();
            if identifier.is_empty() || map.names.contains_key(identifier) {
                continue;
            }
            let resolved = match observed.get(identifier) {
                Some(name) => (name.clone(), NameSource::Observed),
                None => self.fallback(identifier),
            };
            map.names.insert(identifier.to_string(), resolved);
        }
        map
    }

    fn fallback(&self, identifier: &str) -> (String, NameSource) {
        match self.lookup.display_name(identifier) {
            Ok(name) if !name.trim().is_empty() => (name.trim().to_string(), NameSource::Lookup),
            Ok(_) => (identifier.to_string(), NameSource::Identifier),
            Err(e) => {
                debug!("No display name for {}: {}", identifier, e);
                (identifier.to_string(), NameSource::Identifier)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::cell::RefCell;

    fn commit(identifier: &str, name: &str, minute: i64) -> CommitEvent {
        CommitEvent {
            repository: "repo".into(),
            author_identifier: identifier.into(),
            author_display_name: name.into(),
            commit_hash: String::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
            files: vec![],
            message: String::new(),
        }
    }

    struct StubLookup {
        answer: Option<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl IdentityLookup for StubLookup {
        fn display_name(&self, identifier: &str) -> LookupResult<String> {
            self.calls.borrow_mut().push(identifier.to_string());
            self.answer
                .map(str::to_string)
                .ok_or_else(|| LookupError::NotFound(identifier.to_string()))
        }
    }

    #[test]
    fn test_most_frequent_name_wins() {
        let mut commits = Vec::new();
        for i in 0..3 {
            commits.push(commit("alice@x", "A. Smith", i));
        }
        for i in 3..10 {
            commits.push(commit("alice@x", "Alice", i));
        }
        let names = observed_names(&commits);
        assert_eq!(names["alice@x"], "Alice");
    }

    #[test]
    fn test_tie_goes_to_earliest_name() {
        // Input order differs from timestamp order
        let commits = vec![
            commit("id", "Later", 5),
            commit("id", "Earlier", 1),
            commit("id", "Later", 6),
            commit("id", "Earlier", 2),
        ];
        assert_eq!(observed_names(&commits)["id"], "Earlier");
    }

    #[test]
    fn test_resolution_is_idempotent_and_stable() {
        let mut commits = vec![
            commit("id", "Alice", 0),
            commit("id", "A. Smith", 1),
            commit("id", "Alice", 2),
        ];
        let resolver = IdentityResolver::new(&NoLookup);
        let first = resolver.resolve(&commits);
        assert_eq!(first, resolver.resolve(&commits));

        commits.push(commit("id", "Alice", 3));
        assert_eq!(resolver.resolve(&commits).name("id"), Some("Alice"));
    }

    #[test]
    fn test_fallback_chain() {
        let commits = vec![
            commit("seen", "Seen Name", 0),
            commit("ghost", "  ", 1),
            commit("", "Nobody", 2),
        ];

        let found = StubLookup {
            answer: Some("Looked Up"),
            calls: RefCell::new(vec![]),
        };
        let map = IdentityResolver::new(&found).resolve(&commits);
        assert_eq!(map.len(), 2);
        assert_eq!(map.name("seen"), Some("Seen Name"));
        assert_eq!(map.source("seen"), Some(NameSource::Observed));
        assert_eq!(map.name("ghost"), Some("Looked Up"));
        assert_eq!(map.source("ghost"), Some(NameSource::Lookup));
        assert_eq!(*found.calls.borrow(), vec!["ghost".to_string()]);

        let failing = StubLookup {
            answer: None,
            calls: RefCell::new(vec![]),
        };
        let map = IdentityResolver::new(&failing).resolve(&commits);
        assert_eq!(map.name("ghost"), Some("ghost"));
        assert_eq!(map.source("ghost"), Some(NameSource::Identifier));
    }

    #[test]
    fn test_identifiers_are_trimmed() {
        let commits = vec![commit(" bob ", "Bob", 0), commit("bob", "Bobby", 1), commit("bob", "Bobby", 2)];
        let map = IdentityResolver::new(&NoLookup).resolve(&commits);
        assert_eq!(map.len(), 1);
        assert_eq!(map.name("bob"), Some("Bobby"));
        assert_eq!(map.name_or_identifier("carol"), "carol");
    }
}
