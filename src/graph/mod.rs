//! File relevance graph
//!
//! Files are nodes; every pair of distinct files changed in the same commit
//! gets an undirected edge. Edges are never merged, so a pair co-changed in
//! three commits has three parallel edges. An edge weighs
//!
//! ```text
//! w(i, j) = (size(i) + size(j)) / (freq(i) × freq(j))
//! ```
//!
//! where `size` is the file's cumulative additions plus deletions over the
//! window and `freq` the number of commits touching it. Importance is the
//! weighted PageRank of each file. The graph is rebuilt from scratch on every
//! scoring run.

mod pagerank;

pub use pagerank::{weighted_pagerank, PageRank};

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::PageRankConfig;
use crate::models::CommitEvent;

/// Co-change multigraph over file paths
#[derive(Debug, Clone, Default)]
pub struct FileGraph {
    graph: UnGraph<String, f64>,
    index: HashMap<String, NodeIndex>,
}

impl FileGraph {
    /// Build the graph for one repository's commits.
    ///
    /// Commits touching fewer than two distinct files add no edges, and only
    /// files with at least one edge become nodes.
    pub fn from_commits(commits: &[CommitEvent]) -> Self {
        let mut size: HashMap<&str, u64> = HashMap::new();
        let mut freq: HashMap<&str, u64> = HashMap::new();
        for commit in commits {
            for change in &commit.files {
                *size.entry(change.path.as_str()).or_insert(0) += change.lines_changed();
            }
            for path in commit.touched_paths() {
                *freq.entry(path).or_insert(0) += 1;
            }
        }

        let mut file_graph = Self::default();
        for commit in commits {
            let paths = commit.touched_paths();
            for i in 0..paths.len() {
                for j in (i + 1)..paths.len() {
                    let (a, b) = (paths[i], paths[j]);
                    let size_ab = size.get(a).copied().unwrap_or(0) + size.get(b).copied().unwrap_or(0);
                    let freq_ab = freq.get(a).copied().unwrap_or(1).max(1)
                        * freq.get(b).copied().unwrap_or(1).max(1);
                    let weight = size_ab as f64 / freq_ab as f64;

                    let na = file_graph.node(a);
                    let nb = file_graph.node(b);
                    file_graph.graph.add_edge(na, nb, weight);
                }
            }
        }

        debug!(
            "File graph: {} files, {} co-change edges",
            file_graph.node_count(),
            file_graph.edge_count()
        );
        file_graph
    }

    fn node(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.index.insert(path.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Total weight of the edges between two files
    pub fn pair_weight(&self, a: &str, b: &str) -> f64 {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self
                .graph
                .edges_connecting(ia, ib)
                .map(|e| *e.weight())
                .sum(),
            _ => 0.0,
        }
    }

    /// PageRank importance per file path.
    ///
    /// Empty when the graph has fewer than two nodes.
    pub fn importance(&self, params: &PageRankConfig) -> BTreeMap<String, f64> {
        if self.graph.node_count() < 2 {
            return BTreeMap::new();
        }
        let rank = weighted_pagerank(&self.graph, params);
        self.graph
            .node_indices()
            .map(|idx| (self.graph[idx].clone(), rank.scores[idx.index()]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileChange;
    use chrono::{TimeZone, Utc};

    fn commit(files: &[(&str, u64, u64)]) -> CommitEvent {
        CommitEvent {
            repository: "repo".into(),
            author_identifier: "a".into(),
            author_display_name: "A".into(),
            commit_hash: String::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            files: files
                .iter()
                .map(|(p, a, r)| FileChange::new(*p, *a, *r))
                .collect(),
            message: String::new(),
        }
    }

    #[test]
    fn test_empty_commits_give_empty_importance() {
        let graph = FileGraph::from_commits(&[]);
        assert!(graph.is_empty());
        assert!(graph.importance(&PageRankConfig::default()).is_empty());
    }

    #[test]
    fn test_single_file_commits_give_empty_importance() {
        let graph = FileGraph::from_commits(&[commit(&[("a.py", 5, 1)]), commit(&[("b.py", 1, 1)])]);
        assert!(graph.is_empty());
        assert!(graph.importance(&PageRankConfig::default()).is_empty());
    }

    #[test]
    fn test_edge_weight_formula() {
        // size(a) = 10 + 2 = 12, size(b) = 4, size(c) = 6
        // freq(a) = 2, freq(b) = 1, freq(c) = 1
        let commits = vec![
            commit(&[("a", 8, 0), ("b", 4, 0)]),
            commit(&[("a", 2, 2), ("c", 6, 0)]),
        ];
        let graph = FileGraph::from_commits(&commits);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!((graph.pair_weight("a", "b") - 16.0 / 2.0).abs() < 1e-12);
        assert!((graph.pair_weight("a", "c") - 18.0 / 2.0).abs() < 1e-12);
        assert_eq!(graph.pair_weight("b", "c"), 0.0);
    }

    #[test]
    fn test_repeated_pairs_make_parallel_edges() {
        let commits = vec![
            commit(&[("a", 1, 0), ("b", 1, 0)]),
            commit(&[("a", 1, 0), ("b", 1, 0)]),
        ];
        let graph = FileGraph::from_commits(&commits);
        assert_eq!(graph.edge_count(), 2);
        // size 2 + 2, freq 2 × 2, two edges
        assert!((graph.pair_weight("a", "b") - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_hub_file_is_most_important() {
        let commits = vec![
            commit(&[("core.rs", 10, 0), ("a.rs", 1, 0)]),
            commit(&[("core.rs", 10, 0), ("b.rs", 1, 0)]),
            commit(&[("core.rs", 10, 0), ("c.rs", 1, 0)]),
        ];
        let importance = FileGraph::from_commits(&commits).importance(&PageRankConfig::default());
        assert_eq!(importance.len(), 4);
        let core = importance["core.rs"];
        assert!(importance.iter().all(|(p, v)| p == "core.rs" || *v < core));
    }

    #[test]
    fn test_importance_is_deterministic() {
        let commits = vec![
            commit(&[("x", 3, 1), ("y", 2, 0), ("z", 9, 9)]),
            commit(&[("y", 1, 0), ("z", 1, 0)]),
        ];
        let a = FileGraph::from_commits(&commits).importance(&PageRankConfig::default());
        let b = FileGraph::from_commits(&commits).importance(&PageRankConfig::default());
        assert_eq!(a, b);
    }
}
