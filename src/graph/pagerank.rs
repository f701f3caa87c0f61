// ============================================================================
// WEIGHTED PAGERANK
// ============================================================================
//
//   PR(v) = (1 - d) / N + d * Σ PR(u) * w(u, v) / strength(u)  +  dangling
//
// strength(u) is the total weight of u's incident edges, so parallel edges
// between the same pair of files simply add up. Nodes whose edges all weigh
// zero are dangling: their rank is spread uniformly over every node.
//
// Stops when Σ |PR_new - PR_old| < N * tolerance, or after max_iterations.
// ============================================================================

use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use tracing::{debug, warn};

use crate::config::PageRankConfig;

/// Result of a PageRank run
#[derive(Debug, Clone, PartialEq)]
pub struct PageRank {
    /// One score per node index; sums to 1 for a non-empty graph
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Weighted PageRank over an undirected multigraph.
///
/// An empty graph yields empty scores.
pub fn weighted_pagerank<N>(graph: &UnGraph<N, f64>, params: &PageRankConfig) -> PageRank {
    let n = graph.node_count();
    if n == 0 {
        return PageRank {
            scores: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let params = if params.is_valid() {
        *params
    } else {
        warn!("Invalid pagerank parameters {:?}, using defaults", params);
        PageRankConfig::default()
    };
    let damping = params.damping;

    let mut strength = vec![0.0_f64; n];
    for edge in graph.edge_references() {
        let w = sanitize(*edge.weight());
        strength[edge.source().index()] += w;
        strength[edge.target().index()] += w;
    }

    let uniform = 1.0 / n as f64;
    let mut scores = vec![uniform; n];

    for iteration in 1..=params.max_iterations {
        let last = scores.clone();
        let mut next = vec![0.0_f64; n];

        for edge in graph.edge_references() {
            let w = sanitize(*edge.weight());
            let (a, b) = (edge.source().index(), edge.target().index());
            if strength[a] > 0.0 {
                next[b] += damping * last[a] * w / strength[a];
            }
            if strength[b] > 0.0 {
                next[a] += damping * last[b] * w / strength[b];
            }
        }

        let dangling: f64 = (0..n)
            .filter(|&i| strength[i] <= 0.0)
            .map(|i| last[i])
            .sum();
        let base = (1.0 - damping) * uniform + damping * dangling * uniform;
        for value in next.iter_mut() {
            *value += base;
        }

        let diff: f64 = next
            .iter()
            .zip(last.iter())
            .map(|(new, old)| (new - old).abs())
            .sum();
        scores = next;

        if diff < n as f64 * params.tolerance {
            debug!("PageRank converged after {} iterations", iteration);
            return PageRank {
                scores,
                iterations: iteration,
                converged: true,
            };
        }
    }

    warn!(
        "PageRank did not converge within {} iterations, using last estimate",
        params.max_iterations
    );
    PageRank {
        scores,
        iterations: params.max_iterations,
        converged: false,
    }
}

/// Negative or non-finite weights carry no influence
fn sanitize(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
