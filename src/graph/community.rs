//! Modularity-based community detection.
//!
//! Multi-level Louvain with an optional Leiden refinement step:
//!
//! 1. **Local moving** — visit nodes in ascending slot order and move each to
//!    the neighboring community with the largest positive modularity gain.
//!    Repeat until a pass moves nothing, gains less than
//!    `min_modularity_gain`, or `max_iterations` passes have run. The pass
//!    budget is per level, so one call runs at most
//!    `MAX_LEVELS × max_iterations` passes.
//! 2. **Refinement** (Leiden only) — split communities whose induced subgraph
//!    is disconnected, see [`super::leiden`].
//! 3. **Aggregation** — collapse each community into a super-node and recurse.
//!
//! Modularity of every level is evaluated on the input graph and the best
//! partition seen is returned, so extra coarsening never makes the result
//! worse.
//!
//! The objective is `Q = Σ_c [ L_c/m − γ·(d_c/2m)² ]` with `L_c` the internal
//! edge weight, `d_c` the degree sum and `m` the total edge weight. Edges are
//! read as undirected; a self-loop adds its weight to `L_c` and twice its
//! weight to the degree.

use std::time::Instant;

use super::index::GraphIndex;
use super::leiden;
use super::models::{
    Community, CommunityAlgorithm, CommunityAssignment, CommunityConfig, IdIndex, NodeId, Progress,
    ProgressFn,
};
use crate::error::{AnalysisError, Result};

/// Hard ceiling on aggregation levels.
const MAX_LEVELS: usize = 32;

/// Minimum score improvement for a move to count.
const MOVE_EPSILON: f64 = 1e-12;

// ============================================================================
// Level graph
// ============================================================================

/// Undirected weighted graph for one aggregation level.
#[derive(Debug, Clone)]
pub(crate) struct LevelGraph {
    /// Symmetric adjacency, no self-loops, one entry per neighbor
    pub(crate) adj: Vec<Vec<(usize, f64)>>,
    /// Self-loop weight per node (internal weight of a super-node)
    pub(crate) self_loops: Vec<f64>,
    /// Weighted degree, self-loops counted twice
    pub(crate) strength: Vec<f64>,
    /// Total edge weight `m`
    pub(crate) total_weight: f64,
}

impl LevelGraph {
    /// Undirected view of the snapshot. Parallel edges and both directions of
    /// a reciprocal pair add up.
    pub(crate) fn from_index(index: &GraphIndex, weighted: bool) -> Self {
        let n = index.node_count();
        let mut self_loops = vec![0.0; n];
        let mut pairs: Vec<(usize, usize, f64)> = Vec::with_capacity(index.edge_count());

        for &(s, t, w) in index.edges() {
            let w = if weighted { w } else { 1.0 };
            if s == t {
                self_loops[s] += w;
            } else {
                pairs.push((s.min(t), s.max(t), w));
            }
        }
        Self::from_pairs(n, pairs, self_loops)
    }

    /// Merge `(a, b, w)` pairs with `a < b` and build the symmetric lists.
    fn from_pairs(n: usize, mut pairs: Vec<(usize, usize, f64)>, self_loops: Vec<f64>) -> Self {
        pairs.sort_unstable_by_key(|&(a, b, _)| (a, b));

        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut i = 0;
        while i < pairs.len() {
            let (a, b, mut w) = pairs[i];
            i += 1;
            while i < pairs.len() && pairs[i].0 == a && pairs[i].1 == b {
                w += pairs[i].2;
                i += 1;
            }
            adj[a].push((b, w));
            adj[b].push((a, w));
        }
        // Lower-slot neighbors were appended out of order
        for list in adj.iter_mut() {
            list.sort_unstable_by_key(|&(v, _)| v);
        }

        let strength: Vec<f64> = (0..n)
            .map(|i| adj[i].iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * self_loops[i])
            .collect();
        let total_weight = strength.iter().sum::<f64>() / 2.0;

        Self {
            adj,
            self_loops,
            strength,
            total_weight,
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Collapse each community (dense ids `0..count`) into one super-node.
    fn aggregate(&self, membership: &[usize], count: usize) -> Self {
        let mut self_loops = vec![0.0; count];
        let mut pairs = Vec::new();

        for (i, neighbors) in self.adj.iter().enumerate() {
            let ci = membership[i];
            self_loops[ci] += self.self_loops[i];
            for &(j, w) in neighbors {
                if i >= j {
                    continue;
                }
                let cj = membership[j];
                if ci == cj {
                    self_loops[ci] += w;
                } else {
                    pairs.push((ci.min(cj), ci.max(cj), w));
                }
            }
        }
        Self::from_pairs(count, pairs, self_loops)
    }
}

// ============================================================================
// Modularity
// ============================================================================

/// Per-community `(internal_weight, degree_sum, modularity term)`.
pub(crate) fn community_terms(
    graph: &LevelGraph,
    membership: &[usize],
    count: usize,
    resolution: f64,
) -> Vec<(f64, f64, f64)> {
    let mut internal = vec![0.0; count];
    let mut degree_sum = vec![0.0; count];

    for (i, neighbors) in graph.adj.iter().enumerate() {
        let c = membership[i];
        internal[c] += graph.self_loops[i];
        degree_sum[c] += graph.strength[i];
        for &(j, w) in neighbors {
            if i < j && membership[j] == c {
                internal[c] += w;
            }
        }
    }

    let m = graph.total_weight;
    internal
        .into_iter()
        .zip(degree_sum)
        .map(|(l, d)| {
            let q = if m > 0.0 {
                l / m - resolution * (d / (2.0 * m)).powi(2)
            } else {
                0.0
            };
            (l, d, q)
        })
        .collect()
}

fn modularity(graph: &LevelGraph, membership: &[usize], count: usize, resolution: f64) -> f64 {
    community_terms(graph, membership, count, resolution)
        .iter()
        .map(|&(_, _, q)| q)
        .sum()
}

/// Modularity of an arbitrary partition given as one community id per node
/// slot (ascending node id order).
///
/// Fails with `InvalidConfig` for a bad config and with `InvalidGraph` when
/// `community_ids` does not hold exactly one entry per node.
pub fn partition_modularity(
    index: &GraphIndex,
    community_ids: &[u32],
    config: &CommunityConfig,
) -> Result<f64> {
    config.validate()?;
    if community_ids.len() != index.node_count() {
        return Err(AnalysisError::InvalidGraph(format!(
            "partition has {} community ids for {} nodes",
            community_ids.len(),
            index.node_count()
        )));
    }
    let graph = LevelGraph::from_index(index, config.weighted);
    let (membership, count) = compact(community_ids.iter().map(|&c| c as usize));
    Ok(modularity(&graph, &membership, count, config.resolution))
}

/// Relabel to dense ids in first-appearance order.
pub(crate) fn compact(labels: impl IntoIterator<Item = usize>) -> (Vec<usize>, usize) {
    let mut remap: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let dense = labels
        .into_iter()
        .map(|label| {
            let next = remap.len();
            *remap.entry(label).or_insert(next)
        })
        .collect();
    (dense, remap.len())
}

// ============================================================================
// Progress
// ============================================================================

/// Monotone progress reporter over an optional callback.
struct Checkpoints<'a, 'b> {
    callback: Option<&'a mut ProgressFn<'b>>,
    last: f64,
}

impl<'a, 'b> Checkpoints<'a, 'b> {
    fn new(callback: Option<&'a mut ProgressFn<'b>>) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    fn emit(&mut self, phase: &str, fraction: f64, message: Option<String>) {
        let Some(callback) = self.callback.as_deref_mut() else {
            return;
        };
        self.last = fraction.clamp(0.0, 1.0).max(self.last);
        callback(&Progress {
            phase: phase.to_string(),
            progress: self.last,
            message,
        });
    }
}

/// Level `l` occupies `[1 − 2⁻ˡ, 1 − 2⁻⁽ˡ⁺¹⁾)` of the first 95%.
fn level_span(level: usize) -> (f64, f64) {
    let start = 1.0 - 0.5f64.powi(level as i32);
    let end = 1.0 - 0.5f64.powi(level as i32 + 1);
    (0.95 * start, 0.95 * end)
}

// ============================================================================
// Local moving
// ============================================================================

/// Phase 1. Returns the community label per node (labels are node slots of
/// this level) and whether any node moved. Runs at most
/// `config.max_iterations` passes.
fn local_moving<F>(graph: &LevelGraph, config: &CommunityConfig, mut on_pass: F) -> (Vec<usize>, bool)
where
    F: FnMut(usize, usize, f64),
{
    let n = graph.node_count();
    let m = graph.total_weight;
    let m2 = 2.0 * m;
    let resolution = config.resolution;

    let mut community: Vec<usize> = (0..n).collect();
    let mut sigma_tot = graph.strength.clone();
    let mut weight_to = vec![0.0f64; n];
    let mut seen = vec![false; n];
    let mut touched: Vec<usize> = Vec::new();
    let mut any_move = false;

    for pass in 0..config.max_iterations {
        let mut moves = 0usize;
        let mut pass_gain = 0.0f64;

        for node in 0..n {
            let current = community[node];
            let k_i = graph.strength[node];

            for &(neighbor, w) in &graph.adj[node] {
                let c = community[neighbor];
                if !seen[c] {
                    seen[c] = true;
                    touched.push(c);
                }
                weight_to[c] += w;
            }
            touched.sort_unstable();

            // Take the node out, then score every candidate as an insertion.
            // score / m is the modularity gain of inserting the isolated node.
            sigma_tot[current] -= k_i;
            let score = |c: usize| weight_to[c] - resolution * sigma_tot[c] * k_i / m2;

            let stay = score(current);
            let mut best = current;
            let mut best_score = stay;
            for &c in &touched {
                if c == current {
                    continue;
                }
                let s = score(c);
                if s > best_score + MOVE_EPSILON {
                    best = c;
                    best_score = s;
                }
            }

            sigma_tot[best] += k_i;
            community[node] = best;
            if best != current {
                moves += 1;
                pass_gain += (best_score - stay) / m;
            }

            for c in touched.drain(..) {
                weight_to[c] = 0.0;
                seen[c] = false;
            }
        }

        on_pass(pass, moves, pass_gain);
        if moves == 0 {
            break;
        }
        any_move = true;
        if pass_gain < config.min_modularity_gain {
            break;
        }
    }

    (community, any_move)
}

// ============================================================================
// Entry point
// ============================================================================

/// Partition the graph into communities.
///
/// Deterministic for a given snapshot and config. The optional `progress`
/// callback fires once per local-moving pass and once per aggregation level.
pub fn detect_communities(
    index: &GraphIndex,
    config: &CommunityConfig,
    progress: Option<&mut ProgressFn<'_>>,
) -> Result<CommunityAssignment> {
    config.validate()?;
    let start = Instant::now();
    let mut checkpoints = Checkpoints::new(progress);

    let base = LevelGraph::from_index(index, config.weighted);
    let n = base.node_count();

    // Singleton partition is the baseline
    let mut best: Vec<usize> = (0..n).collect();
    let mut best_q = modularity(&base, &best, n, config.resolution);
    let mut best_levels = 0usize;

    if base.total_weight > 0.0 {
        let mut graph = base.clone();
        // Input slot -> super-node of the current level
        let mut mapping: Vec<usize> = (0..n).collect();

        for level in 0..MAX_LEVELS {
            let (span_start, span_end) = level_span(level);
            let max_passes = config.max_iterations as f64;

            let (membership, moved) = local_moving(&graph, config, |pass, moves, gain| {
                let fraction = span_start + (span_end - span_start) * 0.9 * ((pass + 1) as f64 / max_passes);
                checkpoints.emit(
                    "local_moving",
                    fraction,
                    Some(format!("level {level} pass {pass}: {moves} moves, gain {gain:.6}")),
                );
            });
            if !moved {
                break;
            }

            let membership = match config.algorithm {
                CommunityAlgorithm::Louvain => membership,
                CommunityAlgorithm::Leiden => leiden::refine(&graph, &membership),
            };
            let (membership, count) = compact(membership);
            for m in mapping.iter_mut() {
                *m = membership[*m];
            }

            let q = modularity(&base, &mapping, count, config.resolution);
            tracing::debug!(
                level,
                communities = count,
                modularity = q,
                algorithm = %config.algorithm,
                "community level complete"
            );
            checkpoints.emit(
                "aggregation",
                span_end,
                Some(format!("level {level}: {count} communities, Q = {q:.6}")),
            );

            if q > best_q + MOVE_EPSILON {
                best.clone_from(&mapping);
                best_q = q;
                best_levels = level + 1;
            }

            if count <= 1 || count == graph.node_count() {
                break;
            }
            graph = graph.aggregate(&membership, count);
        }
    }

    let assignment = build_assignment(index, &base, &best, config, best_levels);
    checkpoints.emit(
        "complete",
        1.0,
        Some(format!("{} communities", assignment.communities.len())),
    );

    tracing::info!(
        algorithm = %config.algorithm,
        nodes = n,
        communities = assignment.communities.len(),
        modularity = assignment.total_modularity,
        levels = best_levels,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "community detection complete"
    );
    Ok(assignment)
}

fn build_assignment(
    index: &GraphIndex,
    base: &LevelGraph,
    membership: &[usize],
    config: &CommunityConfig,
    levels: usize,
) -> CommunityAssignment {
    // Scanning slots in order numbers communities by their lowest member id
    let (dense, count) = compact(membership.iter().copied());
    let terms = community_terms(base, &dense, count, config.resolution);

    let mut members: Vec<Vec<NodeId>> = vec![Vec::new(); count];
    for (slot, &c) in dense.iter().enumerate() {
        members[c].push(index.node_id(slot));
    }

    let communities: Vec<Community> = members
        .into_iter()
        .zip(terms)
        .enumerate()
        .map(|(id, (members, (internal_weight, degree_sum, modularity)))| Community {
            id: id as u32,
            size: members.len(),
            members,
            internal_weight,
            degree_sum,
            modularity,
        })
        .collect();
    let total_modularity = communities.iter().map(|c| c.modularity).sum();

    CommunityAssignment {
        node_ids: index.node_ids().to_vec(),
        community_ids: dense.into_iter().map(|c| c as u32).collect(),
        communities,
        total_modularity,
        algorithm: config.algorithm,
        levels,
        index: IdIndex::default(),
    }
}

// ============================================================================
// Tests
// ============================================================================
