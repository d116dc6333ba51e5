//! Node importance rankings.
//!
//! Implements six centrality measures on a [`GraphIndex`]:
//! - **Degree** — distinct in/out/total neighbor counts
//! - **PageRank** — power iteration with uniform dangling redistribution
//! - **Eigenvector** — power iteration on `A + I` (same principal vector as
//!   `A`, but converges on bipartite graphs), unit L2 norm per step
//! - **Katz** — `x ← α·Aᵀx + 1`, unit L2 norm per step
//! - **Closeness** — BFS / Dijkstra from every node, Wasserman–Faust scaled
//! - **Betweenness** — Brandes; unweighted via
//!   `rustworkx_core::centrality::betweenness_centrality`, weighted via a
//!   Dijkstra-based accumulation
//!
//! The iterative measures share one convergence harness: stop when the
//! relative change of the score vector drops below `tolerance` or after
//! `max_iterations` steps, returning the last vector either way.
//!
//! Per-source shortest-path passes run on rayon. Partial sums are combined in
//! a fixed source order, so results do not depend on thread scheduling.

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use super::index::{GraphIndex, Topology};
use super::models::{
    CentralityBulk, CentralityConfig, CentralityResult, CentralityType, DegreeMode, IdIndex,
};
use crate::error::Result;

/// Upper bound on the number of partial-sum buffers for betweenness.
const MAX_BETWEENNESS_CHUNKS: usize = 64;

/// Raw output of one measure before it is attached to node ids.
#[derive(Debug, Clone)]
struct Scores {
    values: Vec<f64>,
    iterations: usize,
    converged: bool,
}

impl Scores {
    fn exact(values: Vec<f64>) -> Self {
        Self {
            values,
            iterations: 0,
            converged: true,
        }
    }
}

/// Compute one centrality measure for every node.
pub fn compute_centrality(index: &GraphIndex, config: &CentralityConfig) -> Result<CentralityResult> {
    config.validate()?;
    let start = std::time::Instant::now();

    let mut scores = match config.centrality_type {
        CentralityType::Degree => degree(index, config),
        CentralityType::PageRank => pagerank(index, config),
        CentralityType::Eigenvector => eigenvector(index, config),
        CentralityType::Katz => katz(index, config),
        CentralityType::Closeness => closeness(index, config),
        CentralityType::Betweenness => betweenness(index, config),
    };
    sanitize(&mut scores.values, config.centrality_type);

    tracing::info!(
        centrality = %config.centrality_type,
        nodes = index.node_count(),
        iterations = scores.iterations,
        converged = scores.converged,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "centrality computed"
    );

    Ok(CentralityResult {
        centrality_type: config.centrality_type,
        normalized: config.normalized,
        node_ids: index.node_ids().to_vec(),
        scores: scores.values,
        iterations: scores.iterations,
        converged: scores.converged,
        index: IdIndex::default(),
    })
}

/// Same as [`compute_centrality`], flattened into raw parallel arrays.
pub fn compute_centrality_bulk(index: &GraphIndex, config: &CentralityConfig) -> Result<CentralityBulk> {
    compute_centrality(index, config).map(CentralityResult::into_bulk)
}

// ============================================================================
// Convergence harness
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Norm {
    L1,
    L2,
}

impl Norm {
    fn length(self, v: &[f64]) -> f64 {
        match self {
            Norm::L1 => v.iter().map(|x| x.abs()).sum(),
            Norm::L2 => v.iter().map(|x| x * x).sum::<f64>().sqrt(),
        }
    }

    fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Norm::L1 => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            Norm::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
        }
    }
}

/// Apply `step(current, next)` until the relative change is below
/// `tolerance` or `max_iterations` steps have run.
fn power_iterate<F>(
    initial: Vec<f64>,
    max_iterations: usize,
    tolerance: f64,
    norm: Norm,
    mut step: F,
) -> Scores
where
    F: FnMut(&[f64], &mut [f64]),
{
    let mut current = initial;
    let mut next = vec![0.0; current.len()];

    for iteration in 1..=max_iterations {
        step(&current, &mut next);
        let change = norm.distance(&current, &next) / norm.length(&next).max(f64::MIN_POSITIVE);
        std::mem::swap(&mut current, &mut next);
        if change < tolerance {
            return Scores {
                values: current,
                iterations: iteration,
                converged: true,
            };
        }
    }

    tracing::warn!(
        max_iterations,
        tolerance,
        "power iteration hit the iteration cap; returning best-effort scores"
    );
    Scores {
        values: current,
        iterations: max_iterations,
        converged: false,
    }
}

fn normalize_l2(v: &mut [f64]) {
    let norm = Norm::L2.length(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn rescale_by_max(v: &mut [f64]) {
    let max = v.iter().copied().fold(0.0f64, f64::max);
    if max > 0.0 {
        for x in v.iter_mut() {
            *x /= max;
        }
    }
}

fn sanitize(values: &mut [f64], centrality: CentralityType) {
    let mut replaced = 0usize;
    for x in values.iter_mut() {
        if !x.is_finite() {
            *x = 0.0;
            replaced += 1;
        }
    }
    if replaced > 0 {
        tracing::warn!(%centrality, replaced, "non-finite centrality scores replaced with 0");
    }
}

/// Incoming transitions `(source, weight)` per node.
fn incoming(index: &GraphIndex, weighted: bool) -> Vec<Vec<(usize, f64)>> {
    (0..index.node_count())
        .map(|slot| {
            index
                .in_neighbors(slot)
                .iter()
                .map(|&(src, w)| (src, if weighted { w } else { 1.0 }))
                .collect()
        })
        .collect()
}

// ============================================================================
// Degree
// ============================================================================

fn degree(index: &GraphIndex, config: &CentralityConfig) -> Scores {
    let n = index.node_count();
    let directed_count = |slot: usize, direction: Direction| -> usize {
        match index.topology() {
            Topology::Directed(g) => g.neighbors_directed(NodeIndex::new(slot), direction).count(),
            Topology::Undirected(_) => index.degree(slot),
        }
    };

    let values: Vec<f64> = (0..n)
        .map(|slot| match (config.degree_mode, index.is_directed()) {
            (_, false) => index.degree(slot) as f64,
            (DegreeMode::In, true) => directed_count(slot, Direction::Incoming) as f64,
            (DegreeMode::Out, true) => directed_count(slot, Direction::Outgoing) as f64,
            (DegreeMode::Total, true) => {
                (directed_count(slot, Direction::Incoming) + directed_count(slot, Direction::Outgoing))
                    as f64
            }
        })
        .collect();

    if !config.normalized {
        return Scores::exact(values);
    }
    let max_possible = match (config.degree_mode, index.is_directed()) {
        (DegreeMode::Total, true) => 2.0 * n.saturating_sub(1) as f64,
        _ => n.saturating_sub(1) as f64,
    };
    if max_possible == 0.0 {
        return Scores::exact(vec![0.0; n]);
    }
    Scores::exact(values.into_iter().map(|d| d / max_possible).collect())
}

// ============================================================================
// PageRank (power iteration)
// ============================================================================

fn pagerank(index: &GraphIndex, config: &CentralityConfig) -> Scores {
    let n = index.node_count();
    if n == 0 {
        return Scores::exact(Vec::new());
    }

    let damping = config.damping;
    let nf = n as f64;

    // Outgoing transition mass per node; zero means dangling
    let out_mass: Vec<f64> = (0..n)
        .map(|slot| {
            index
                .out_neighbors(slot)
                .iter()
                .map(|&(_, w)| if config.weighted { w } else { 1.0 })
                .sum()
        })
        .collect();
    let transitions = incoming(index, config.weighted);

    let mut scores = power_iterate(
        vec![1.0 / nf; n],
        config.max_iterations,
        config.tolerance,
        Norm::L1,
        |current, next| {
            let dangling: f64 = (0..n)
                .filter(|&j| out_mass[j] <= 0.0)
                .map(|j| current[j])
                .sum();
            let base = (1.0 - damping) / nf + damping * dangling / nf;
            for (i, slot) in next.iter_mut().enumerate() {
                let inflow: f64 = transitions[i]
                    .iter()
                    .filter(|&&(j, _)| out_mass[j] > 0.0)
                    .map(|&(j, w)| current[j] * w / out_mass[j])
                    .sum();
                *slot = base + damping * inflow;
            }
        },
    );

    // Normalize to sum = 1.0
    let total: f64 = scores.values.iter().sum();
    if total > 0.0 {
        for s in scores.values.iter_mut() {
            *s /= total;
        }
    }
    scores
}

// ============================================================================
// Eigenvector / Katz
// ============================================================================

fn eigenvector(index: &GraphIndex, config: &CentralityConfig) -> Scores {
    let n = index.node_count();
    if n == 0 {
        return Scores::exact(Vec::new());
    }
    let transitions = incoming(index, config.weighted);

    let mut scores = power_iterate(
        vec![1.0 / (n as f64).sqrt(); n],
        config.max_iterations,
        config.tolerance,
        Norm::L2,
        |current, next| {
            for (i, slot) in next.iter_mut().enumerate() {
                *slot = current[i] + transitions[i].iter().map(|&(j, w)| w * current[j]).sum::<f64>();
            }
            normalize_l2(next);
        },
    );

    if config.normalized {
        rescale_by_max(&mut scores.values);
    }
    scores
}

fn katz(index: &GraphIndex, config: &CentralityConfig) -> Scores {
    let n = index.node_count();
    if n == 0 {
        return Scores::exact(Vec::new());
    }
    let alpha = config.attenuation;
    let transitions = incoming(index, config.weighted);

    let mut scores = power_iterate(
        vec![1.0 / (n as f64).sqrt(); n],
        config.max_iterations,
        config.tolerance,
        Norm::L2,
        |current, next| {
            for (i, slot) in next.iter_mut().enumerate() {
                *slot = alpha * transitions[i].iter().map(|&(j, w)| w * current[j]).sum::<f64>() + 1.0;
            }
            normalize_l2(next);
        },
    );

    if config.normalized {
        rescale_by_max(&mut scores.values);
    }
    scores
}

// ============================================================================
// Shortest-path measures
// ============================================================================

/// Outgoing adjacency without self-loops, parallel edges collapsed to the
/// cheapest one. Unweighted mode uses unit lengths.
fn path_adjacency(index: &GraphIndex, weighted: bool) -> Vec<Vec<(usize, f64)>> {
    (0..index.node_count())
        .map(|slot| {
            let mut list: Vec<(usize, f64)> = index
                .out_neighbors(slot)
                .iter()
                .filter(|&&(t, _)| t != slot)
                .map(|&(t, w)| (t, if weighted { w } else { 1.0 }))
                .collect();
            list.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
            list.dedup_by_key(|&mut (t, _)| t);
            list
        })
        .collect()
}

/// Min-heap entry for Dijkstra, ordered by (distance, node).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    dist: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Distances from `source`; `f64::INFINITY` for unreachable nodes.
fn single_source_distances(adj: &[Vec<(usize, f64)>], source: usize, weighted: bool) -> Vec<f64> {
    let n = adj.len();
    let mut dist = vec![f64::INFINITY; n];
    dist[source] = 0.0;

    if !weighted {
        let mut queue = VecDeque::new();
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            for &(w, _) in &adj[v] {
                if dist[w].is_infinite() {
                    dist[w] = dist[v] + 1.0;
                    queue.push_back(w);
                }
            }
        }
        return dist;
    }

    let mut heap = BinaryHeap::new();
    heap.push(Frontier { dist: 0.0, node: source });
    while let Some(Frontier { dist: d, node: v }) = heap.pop() {
        if d > dist[v] {
            continue;
        }
        for &(w, len) in &adj[v] {
            let candidate = d + len;
            if candidate < dist[w] {
                dist[w] = candidate;
                heap.push(Frontier { dist: candidate, node: w });
            }
        }
    }
    dist
}

fn closeness(index: &GraphIndex, config: &CentralityConfig) -> Scores {
    let n = index.node_count();
    if n < 2 {
        return Scores::exact(vec![0.0; n]);
    }
    let adj = path_adjacency(index, config.weighted);

    let mut values: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|source| {
            let dist = single_source_distances(&adj, source, config.weighted);
            let (reachable, total) = dist
                .iter()
                .filter(|d| d.is_finite())
                .fold((0usize, 0.0f64), |(count, sum), &d| (count + 1, sum + d));
            if reachable <= 1 {
                return 0.0;
            }
            let others = (reachable - 1) as f64;
            if total <= 0.0 {
                // Everything reached sits at distance zero
                return f64::INFINITY;
            }
            (others / total) * (others / (n - 1) as f64)
        })
        .collect();

    // Zero-distance reach ties with the closest finite score, or with its
    // reach share when no finite score is positive
    let closest = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f64, f64::max);
    if values.iter().any(|v| v.is_infinite()) {
        for (source, value) in values.iter_mut().enumerate() {
            if value.is_infinite() {
                *value = if closest > 0.0 {
                    closest
                } else {
                    reach_share(&adj, source, n)
                };
            }
        }
    }

    if config.normalized && config.weighted {
        rescale_by_max(&mut values);
    }
    Scores::exact(values)
}

/// Fraction of the other nodes reachable from `source`.
fn reach_share(adj: &[Vec<(usize, f64)>], source: usize, n: usize) -> f64 {
    let reachable = single_source_distances(adj, source, false)
        .iter()
        .filter(|d| d.is_finite())
        .count();
    (reachable - 1) as f64 / (n - 1) as f64
}

fn betweenness(index: &GraphIndex, config: &CentralityConfig) -> Scores {
    let n = index.node_count();
    if n == 0 {
        return Scores::exact(Vec::new());
    }

    let mut values: Vec<f64> = if config.weighted {
        weighted_betweenness(index, config.normalized)
    } else {
        // Sequential pass (threshold above any node count) keeps summation order fixed
        let raw = match index.topology() {
            Topology::Directed(g) => rustworkx_core::centrality::betweenness_centrality(
                g,
                false, // include_endpoints
                config.normalized,
                usize::MAX,
            ),
            Topology::Undirected(g) => rustworkx_core::centrality::betweenness_centrality(
                g,
                false,
                config.normalized,
                usize::MAX,
            ),
        };
        raw.into_iter().map(|s| s.unwrap_or(0.0)).collect()
    };

    if config.normalized {
        for v in values.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
    }
    Scores::exact(values)
}

/// Brandes' accumulation with Dijkstra, parallel over fixed source chunks.
fn weighted_betweenness(index: &GraphIndex, normalized: bool) -> Vec<f64> {
    let n = index.node_count();
    let adj = path_adjacency(index, true);
    let chunk_size = n.div_ceil(MAX_BETWEENNESS_CHUNKS).max(1);
    let sources: Vec<usize> = (0..n).collect();

    let partials: Vec<Vec<f64>> = sources
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut partial = vec![0.0; n];
            for &source in chunk {
                accumulate_dependencies(&adj, source, &mut partial);
            }
            partial
        })
        .collect();

    let mut totals = vec![0.0; n];
    for partial in &partials {
        for (total, value) in totals.iter_mut().zip(partial) {
            *total += value;
        }
    }

    let scale = if normalized {
        if n <= 2 {
            1.0
        } else {
            1.0 / ((n - 1) * (n - 2)) as f64
        }
    } else if !index.is_directed() {
        0.5
    } else {
        1.0
    };
    totals.iter_mut().for_each(|v| *v *= scale);
    totals
}

/// One source's pair dependencies, added into `totals`.
///
/// Shortest-path predecessors come from the settled distances, so ties
/// through zero-length edges count as separate paths. Nodes are visited in
/// a topological order of that predecessor graph.
fn accumulate_dependencies(adj: &[Vec<(usize, f64)>], source: usize, totals: &mut [f64]) {
    let n = adj.len();
    let dist = single_source_distances(adj, source, true);

    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); n];
    for v in (0..n).filter(|&v| dist[v].is_finite()) {
        for &(w, len) in &adj[v] {
            if w == source {
                continue;
            }
            let candidate = dist[v] + len;
            if (candidate - dist[w]).abs() <= 1e-12 * dist[w].abs().max(1.0) {
                preds[w].push(v);
                succs[v].push(w);
            }
        }
    }

    let order = predecessor_order(&dist, &preds, &succs, source);
    let mut position = vec![usize::MAX; n];
    for (i, &v) in order.iter().enumerate() {
        position[v] = i;
    }

    let mut sigma = vec![0.0f64; n];
    sigma[source] = 1.0;
    for &w in &order {
        if w != source {
            sigma[w] = preds[w]
                .iter()
                .filter(|&&v| position[v] < position[w])
                .map(|&v| sigma[v])
                .sum();
        }
    }

    let mut delta = vec![0.0f64; n];
    for &w in order.iter().rev() {
        if sigma[w] > 0.0 {
            for &v in preds[w].iter().filter(|&&v| position[v] < position[w]) {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
        }
        if w != source {
            totals[w] += delta[w];
        }
    }
}

/// Reachable nodes with every predecessor ahead of its successors, closest first.
///
/// A zero-length cycle has no such order; it is broken at its closest
/// (then lowest) node and the edges pointing back into it are dropped.
fn predecessor_order(
    dist: &[f64],
    preds: &[Vec<usize>],
    succs: &[Vec<usize>],
    source: usize,
) -> Vec<usize> {
    let n = dist.len();
    let reachable: Vec<usize> = (0..n).filter(|&v| dist[v].is_finite()).collect();
    let mut pending: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut done = vec![false; n];
    let mut ready = BinaryHeap::new();
    ready.push(Frontier { dist: 0.0, node: source });
    for &v in &reachable {
        if v != source && pending[v] == 0 {
            ready.push(Frontier { dist: dist[v], node: v });
        }
    }

    let mut order = Vec::with_capacity(reachable.len());
    while order.len() < reachable.len() {
        let next = match ready.pop() {
            Some(Frontier { node, .. }) => node,
            None => match reachable
                .iter()
                .copied()
                .filter(|&v| !done[v])
                .min_by(|&a, &b| dist[a].total_cmp(&dist[b]).then(a.cmp(&b)))
            {
                Some(v) => v,
                None => break,
            },
        };
        if done[next] {
            continue;
        }
        done[next] = true;
        order.push(next);
        for &w in &succs[next] {
            pending[w] = pending[w].saturating_sub(1);
            if pending[w] == 0 && !done[w] {
                ready.push(Frontier { dist: dist[w], node: w });
            }
        }
    }
    order
}

// ============================================================================
// Tests
// ============================================================================
