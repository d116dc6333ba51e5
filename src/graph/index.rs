//! Immutable adjacency view over one graph snapshot.
//!
//! `GraphIndex` is the intermediate representation between the external
//! snapshot and every algorithm. Nodes are stored in ascending id order, so a
//! node's dense *slot* (`0..n`) doubles as its deterministic tie-break rank.
//!
//! Three adjacency views are kept:
//! - **out / in**: every edge as supplied (parallel edges and self-loops kept);
//!   in undirected mode each edge appears in both directions
//! - **undirected**: union of both directions, deduplicated, weights summed,
//!   self-loops tracked separately
//!
//! A petgraph graph over the deduplicated topology backs the algorithms
//! delegated to `rustworkx-core`.

use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use std::collections::HashMap;

use super::models::{GraphSnapshot, NodeId};
use crate::error::{AnalysisError, Result};

/// Deduplicated petgraph topology, in the snapshot's direction mode.
#[derive(Debug, Clone)]
pub enum Topology {
    Directed(DiGraph<NodeId, f64>),
    Undirected(UnGraph<NodeId, f64>),
}

/// Read-only adjacency index. `Send + Sync`; never mutated after construction.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    node_ids: Vec<NodeId>,
    id_to_slot: HashMap<NodeId, usize>,
    directed: bool,
    /// Edges as supplied, in slot space
    edges: Vec<(usize, usize, f64)>,
    out_adj: Vec<Vec<(usize, f64)>>,
    in_adj: Vec<Vec<(usize, f64)>>,
    undirected: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    topology: Topology,
}

impl GraphIndex {
    /// Build the index from a snapshot.
    ///
    /// Fails with `InvalidGraph` on duplicate node ids, edges referencing
    /// undeclared nodes, or negative / non-finite weights.
    pub fn build(snapshot: &GraphSnapshot) -> Result<Self> {
        let ids: Vec<NodeId> = snapshot.nodes.iter().map(|n| n.id).collect();
        let edges: Vec<(NodeId, NodeId, f64)> = snapshot
            .edges
            .iter()
            .map(|e| (e.source, e.target, e.weight_or_default()))
            .collect();
        Self::from_parts(ids, &edges, snapshot.directed)
    }

    /// Build from a node list and `(source, target, weight)` triples.
    pub fn from_parts(
        mut node_ids: Vec<NodeId>,
        edges: &[(NodeId, NodeId, f64)],
        directed: bool,
    ) -> Result<Self> {
        node_ids.sort_unstable();
        if let Some(pair) = node_ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(AnalysisError::InvalidGraph(format!(
                "duplicate node id {}",
                pair[0]
            )));
        }

        let n = node_ids.len();
        let id_to_slot: HashMap<NodeId, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot))
            .collect();

        let mut slot_edges = Vec::with_capacity(edges.len());
        for (i, &(source, target, weight)) in edges.iter().enumerate() {
            let s = *id_to_slot.get(&source).ok_or_else(|| {
                AnalysisError::InvalidGraph(format!(
                    "edge {i} ({source} -> {target}) references undeclared node {source}"
                ))
            })?;
            let t = *id_to_slot.get(&target).ok_or_else(|| {
                AnalysisError::InvalidGraph(format!(
                    "edge {i} ({source} -> {target}) references undeclared node {target}"
                ))
            })?;
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(AnalysisError::InvalidGraph(format!(
                    "edge {i} ({source} -> {target}) has invalid weight {weight}"
                )));
            }
            slot_edges.push((s, t, weight));
        }

        let mut out_adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut in_adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut self_loops = vec![0.0; n];
        // Undirected view: accumulate per node, sort afterwards
        let mut merged: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];

        for &(s, t, w) in &slot_edges {
            out_adj[s].push((t, w));
            in_adj[t].push((s, w));
            if !directed && s != t {
                out_adj[t].push((s, w));
                in_adj[s].push((t, w));
            }
            if s == t {
                self_loops[s] += w;
            } else {
                *merged[s].entry(t).or_insert(0.0) += w;
                *merged[t].entry(s).or_insert(0.0) += w;
            }
        }

        let undirected: Vec<Vec<(usize, f64)>> = merged
            .into_iter()
            .map(|m| {
                let mut list: Vec<(usize, f64)> = m.into_iter().collect();
                list.sort_unstable_by_key(|&(v, _)| v);
                list
            })
            .collect();

        let topology = build_topology(&node_ids, &out_adj, &undirected, directed);

        Ok(Self {
            node_ids,
            id_to_slot,
            directed,
            edges: slot_edges,
            out_adj,
            in_adj,
            undirected,
            self_loops,
            topology,
        })
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Number of edges as supplied (parallel edges and self-loops included).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Node ids in ascending order; index = slot.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    #[inline]
    pub fn node_id(&self, slot: usize) -> NodeId {
        self.node_ids[slot]
    }

    pub fn slot(&self, id: NodeId) -> Option<usize> {
        self.id_to_slot.get(&id).copied()
    }

    pub fn require_slot(&self, id: NodeId) -> Result<usize> {
        self.slot(id).ok_or(AnalysisError::NodeNotFound(id))
    }

    // =========================================================================
    // Degree / neighbor queries
    // =========================================================================

    /// Outgoing edge count (each direction counted in undirected mode).
    #[inline]
    pub fn out_degree(&self, slot: usize) -> usize {
        self.out_adj[slot].len()
    }

    #[inline]
    pub fn in_degree(&self, slot: usize) -> usize {
        self.in_adj[slot].len()
    }

    /// Distinct neighbors in the undirected view (self excluded).
    #[inline]
    pub fn degree(&self, slot: usize) -> usize {
        self.undirected[slot].len()
    }

    #[inline]
    pub fn out_neighbors(&self, slot: usize) -> &[(usize, f64)] {
        &self.out_adj[slot]
    }

    #[inline]
    pub fn in_neighbors(&self, slot: usize) -> &[(usize, f64)] {
        &self.in_adj[slot]
    }

    /// Deduplicated undirected neighbors, ascending by slot, weights summed.
    #[inline]
    pub fn neighbors(&self, slot: usize) -> &[(usize, f64)] {
        &self.undirected[slot]
    }

    #[inline]
    pub fn self_loop_weight(&self, slot: usize) -> f64 {
        self.self_loops[slot]
    }

    /// Edges as supplied, in slot space.
    pub fn edges(&self) -> &[(usize, usize, f64)] {
        &self.edges
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    // =========================================================================
    // Bulk exports
    // =========================================================================

    /// Outgoing adjacency in CSR form: `(offsets, targets)` with
    /// `offsets.len() == node_count + 1`.
    ///
    /// Rows and `targets` are dense slot indices, not node ids. Map them back
    /// with [`node_ids`](Self::node_ids) or [`node_id`](Self::node_id).
    pub fn to_csr(&self) -> (Vec<u32>, Vec<u32>) {
        let mut offsets = Vec::with_capacity(self.node_count() + 1);
        let mut targets = Vec::new();
        offsets.push(0u32);
        for list in &self.out_adj {
            targets.extend(list.iter().map(|&(t, _)| t as u32));
            offsets.push(targets.len() as u32);
        }
        (offsets, targets)
    }

    /// Flat `[out_0, in_0, out_1, in_1, ...]` degree array.
    pub fn degrees(&self) -> Vec<u32> {
        let mut flat = Vec::with_capacity(self.node_count() * 2);
        for slot in 0..self.node_count() {
            flat.push(self.out_degree(slot) as u32);
            flat.push(self.in_degree(slot) as u32);
        }
        flat
    }

    // =========================================================================
    // Local structure
    // =========================================================================

    /// Local clustering coefficient per slot on the undirected view:
    /// closed neighbor pairs / possible pairs.
    pub fn clustering_coefficients(&self) -> Vec<f64> {
        (0..self.node_count())
            .map(|slot| {
                let neighbors = &self.undirected[slot];
                let k = neighbors.len();
                if k < 2 {
                    return 0.0;
                }
                let mut triangles = 0usize;
                for (i, &(a, _)) in neighbors.iter().enumerate() {
                    for &(b, _) in &neighbors[i + 1..] {
                        if self.undirected[a]
                            .binary_search_by_key(&b, |&(v, _)| v)
                            .is_ok()
                        {
                            triangles += 1;
                        }
                    }
                }
                triangles as f64 / (k * (k - 1) / 2) as f64
            })
            .collect()
    }
}

fn build_topology(
    node_ids: &[NodeId],
    out_adj: &[Vec<(usize, f64)>],
    undirected: &[Vec<(usize, f64)>],
    directed: bool,
) -> Topology {
    let n = node_ids.len();
    if directed {
        let mut g = DiGraph::with_capacity(n, 0);
        for &id in node_ids {
            g.add_node(id);
        }
        for (s, list) in out_adj.iter().enumerate() {
            let mut merged: Vec<(usize, f64)> = Vec::with_capacity(list.len());
            let mut sorted = list.clone();
            sorted.sort_by_key(|&(t, _)| t);
            for (t, w) in sorted {
                if t == s {
                    continue;
                }
                match merged.last_mut() {
                    Some(last) if last.0 == t => last.1 += w,
                    _ => merged.push((t, w)),
                }
            }
            for (t, w) in merged {
                g.add_edge(NodeIndex::new(s), NodeIndex::new(t), w);
            }
        }
        Topology::Directed(g)
    } else {
        let mut g = UnGraph::with_capacity(n, 0);
        for &id in node_ids {
            g.add_node(id);
        }
        for (s, list) in undirected.iter().enumerate() {
            for &(t, w) in list {
                if s < t {
                    g.add_edge(NodeIndex::new(s), NodeIndex::new(t), w);
                }
            }
        }
        Topology::Undirected(g)
    }
}

// ============================================================================
// Tests
// ============================================================================
