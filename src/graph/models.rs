//! Graph analytics data models.
//!
//! Defines the complete type system for the engine:
//!
//! ## Input types (snapshot)
//! - [`NodeId`] — stable node identifier
//! - [`NodeInput`] / [`EdgeInput`] / [`GraphSnapshot`] — read-only graph snapshot
//! - [`NodePositions`] — externally supplied node coordinates
//!
//! ## Output types (analytics)
//! - [`CommunityAssignment`] / [`Community`] — modularity partition
//! - [`CentralityResult`] / [`CentralityBulk`] — node rankings
//! - [`ComponentResult`] / [`ComponentInfo`] — connectivity partitions
//! - [`NodeMetrics`] / [`AnalysisReport`] — aggregated result of a full run
//!
//! ## Configuration
//! - [`CommunityConfig`], [`CentralityConfig`] — tuning for the graph algorithms
//!
//! Id→value results are stored as parallel arrays sorted by node id. Lookups by
//! id go through an index that is built on first use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{AnalysisError, Result};

// ============================================================================
// Input types — graph snapshot
// ============================================================================

/// Stable node identifier, unique within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A node as supplied by the external graph store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    pub id: NodeId,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// An edge between two declared nodes. A missing weight means 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeInput {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl EdgeInput {
    pub fn new(source: u32, target: u32) -> Self {
        Self {
            source: NodeId(source),
            target: NodeId(target),
            weight: None,
        }
    }

    pub fn weighted(source: u32, target: u32, weight: f64) -> Self {
        Self {
            source: NodeId(source),
            target: NodeId(target),
            weight: Some(weight),
        }
    }

    /// Effective weight (1.0 when absent).
    #[inline]
    pub fn weight_or_default(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

fn default_directed() -> bool {
    true
}

/// Read-only snapshot handed to the engine for one analysis call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeInput>,
    pub edges: Vec<EdgeInput>,
    /// Edge direction mode (default: directed)
    #[serde(default = "default_directed")]
    pub directed: bool,
}

impl GraphSnapshot {
    /// Snapshot with nodes `0..n` at the origin and unweighted edges.
    pub fn from_pairs(node_count: u32, pairs: &[(u32, u32)], directed: bool) -> Self {
        Self {
            nodes: (0..node_count)
                .map(|i| NodeInput {
                    id: NodeId(i),
                    x: 0.0,
                    y: 0.0,
                })
                .collect(),
            edges: pairs.iter().map(|&(s, t)| EdgeInput::new(s, t)).collect(),
            directed,
        }
    }
}

/// Node coordinates supplied by the external position store.
#[derive(Debug, Clone, Default)]
pub struct NodePositions {
    ids: Vec<NodeId>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    index: HashMap<NodeId, usize>,
}

impl NodePositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut positions = Self::new();
        for node in &snapshot.nodes {
            positions.insert(node.id, node.x, node.y);
        }
        positions
    }

    /// Insert or overwrite a position.
    pub fn insert(&mut self, id: NodeId, x: f64, y: f64) {
        if let Some(&slot) = self.index.get(&id) {
            self.xs[slot] = x;
            self.ys[slot] = y;
            return;
        }
        self.index.insert(id, self.ids.len());
        self.ids.push(id);
        self.xs.push(x);
        self.ys.push(y);
    }

    pub fn get(&self, id: NodeId) -> Option<(f64, f64)> {
        self.index.get(&id).map(|&slot| (self.xs[slot], self.ys[slot]))
    }

    /// Apply a displacement batch as produced by the boundary simulator.
    pub fn apply_displacements(&mut self, ids: &[u32], dx: &[f64], dy: &[f64]) {
        for ((&id, &ddx), &ddy) in ids.iter().zip(dx).zip(dy) {
            if let Some(&slot) = self.index.get(&NodeId(id)) {
                self.xs[slot] += ddx;
                self.ys[slot] += ddy;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Progress checkpoint delivered to an optional callback between phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub phase: String,
    /// Fraction complete in [0,1], never decreasing within one call
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Progress callback signature. Invoked synchronously; no return value.
pub type ProgressFn<'a> = dyn FnMut(&Progress) + 'a;

// ============================================================================
// Lookup index for parallel-array results
// ============================================================================

/// Lazily built id → slot index over a result's `node_ids`.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdIndex(OnceLock<HashMap<NodeId, usize>>);

impl IdIndex {
    pub(crate) fn slot(&self, ids: &[NodeId], id: NodeId) -> Option<usize> {
        self.0
            .get_or_init(|| ids.iter().enumerate().map(|(i, &n)| (n, i)).collect())
            .get(&id)
            .copied()
    }
}

// ============================================================================
// Configuration — communities
// ============================================================================

/// Community detection variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityAlgorithm {
    #[default]
    Louvain,
    Leiden,
}

impl std::fmt::Display for CommunityAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Louvain => write!(f, "louvain"),
            Self::Leiden => write!(f, "leiden"),
        }
    }
}

impl std::str::FromStr for CommunityAlgorithm {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "louvain" => Ok(Self::Louvain),
            "leiden" => Ok(Self::Leiden),
            other => Err(AnalysisError::config(
                "algorithm",
                format!("unknown community algorithm '{other}'"),
            )),
        }
    }
}

/// Tuning parameters for community detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Louvain or Leiden (default: Louvain)
    pub algorithm: CommunityAlgorithm,
    /// Resolution γ (default: 1.0, higher = more, smaller communities)
    pub resolution: f64,
    /// Whether edge weights participate in gain/degree computations (default: true)
    pub weighted: bool,
    /// Maximum local-moving passes per aggregation level (default: 100).
    /// Each level starts with a fresh budget.
    pub max_iterations: usize,
    /// A pass gaining less than this ends local moving (default: 1e-7)
    pub min_modularity_gain: f64,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            algorithm: CommunityAlgorithm::Louvain,
            resolution: 1.0,
            weighted: true,
            max_iterations: 100,
            min_modularity_gain: 1e-7,
        }
    }
}

impl CommunityConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(AnalysisError::config(
                "resolution",
                format!("must be finite and > 0, got {}", self.resolution),
            ));
        }
        if self.max_iterations == 0 {
            return Err(AnalysisError::config("max_iterations", "must be >= 1"));
        }
        if !(self.min_modularity_gain.is_finite() && self.min_modularity_gain >= 0.0) {
            return Err(AnalysisError::config(
                "min_modularity_gain",
                format!("must be finite and >= 0, got {}", self.min_modularity_gain),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Configuration — centrality
// ============================================================================

/// Centrality measure to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityType {
    Degree,
    PageRank,
    Eigenvector,
    Katz,
    Closeness,
    Betweenness,
}

impl std::fmt::Display for CentralityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degree => write!(f, "degree"),
            Self::PageRank => write!(f, "pagerank"),
            Self::Eigenvector => write!(f, "eigenvector"),
            Self::Katz => write!(f, "katz"),
            Self::Closeness => write!(f, "closeness"),
            Self::Betweenness => write!(f, "betweenness"),
        }
    }
}

impl std::str::FromStr for CentralityType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "degree" => Ok(Self::Degree),
            "pagerank" => Ok(Self::PageRank),
            "eigenvector" => Ok(Self::Eigenvector),
            "katz" => Ok(Self::Katz),
            "closeness" => Ok(Self::Closeness),
            "betweenness" => Ok(Self::Betweenness),
            other => Err(AnalysisError::config(
                "type",
                format!("unknown centrality type '{other}'"),
            )),
        }
    }
}

/// Which edges count toward degree centrality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeMode {
    In,
    Out,
    #[default]
    Total,
}

fn default_true() -> bool {
    true
}
fn default_centrality_max_iterations() -> usize {
    100
}
fn default_tolerance() -> f64 {
    1e-6
}
fn default_damping() -> f64 {
    0.85
}
fn default_attenuation() -> f64 {
    0.1
}

/// Tuning parameters for centrality. `type` is required when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityConfig {
    #[serde(rename = "type")]
    pub centrality_type: CentralityType,
    /// Scale scores into [0,1] (default: true)
    #[serde(default = "default_true")]
    pub normalized: bool,
    /// Iteration cap for the power-iteration variants (default: 100)
    #[serde(default = "default_centrality_max_iterations")]
    pub max_iterations: usize,
    /// Relative-change convergence threshold (default: 1e-6)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// PageRank damping factor (default: 0.85)
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Katz attenuation factor α (default: 0.1)
    #[serde(default = "default_attenuation")]
    pub attenuation: f64,
    /// Degree direction (default: total)
    #[serde(default)]
    pub degree_mode: DegreeMode,
    /// Use edge weights as transition weights (PageRank) or distances
    /// (closeness, betweenness) (default: false)
    #[serde(default)]
    pub weighted: bool,
}

impl CentralityConfig {
    pub fn new(centrality_type: CentralityType) -> Self {
        Self {
            centrality_type,
            normalized: true,
            max_iterations: default_centrality_max_iterations(),
            tolerance: default_tolerance(),
            damping: default_damping(),
            attenuation: default_attenuation(),
            degree_mode: DegreeMode::Total,
            weighted: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AnalysisError::config("max_iterations", "must be >= 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(AnalysisError::config(
                "tolerance",
                format!("must be finite and > 0, got {}", self.tolerance),
            ));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(AnalysisError::config(
                "damping",
                format!("must lie in [0,1], got {}", self.damping),
            ));
        }
        if !(self.attenuation.is_finite() && self.attenuation > 0.0) {
            return Err(AnalysisError::config(
                "attenuation",
                format!("must be finite and > 0, got {}", self.attenuation),
            ));
        }
        Ok(())
    }
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self::new(CentralityType::PageRank)
    }
}

// ============================================================================
// Output types — communities
// ============================================================================

/// One community of a [`CommunityAssignment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Community identifier (dense, ordered by lowest member id)
    pub id: u32,
    /// Number of member nodes
    pub size: usize,
    /// Member node ids, ascending
    pub members: Vec<NodeId>,
    /// Total weight of edges with both endpoints inside (self-loops included)
    pub internal_weight: f64,
    /// Sum of member degrees (self-loops counted twice)
    pub degree_sum: f64,
    /// This community's term of the modularity sum
    pub modularity: f64,
}

/// Total node → community mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityAssignment {
    /// Node ids, ascending
    pub node_ids: Vec<NodeId>,
    /// Community id per entry of `node_ids`
    pub community_ids: Vec<u32>,
    pub communities: Vec<Community>,
    /// Σ of per-community contributions
    pub total_modularity: f64,
    /// Variant that produced this assignment
    pub algorithm: CommunityAlgorithm,
    /// Aggregation levels that contributed to the kept partition
    pub levels: usize,
    #[serde(skip)]
    pub(crate) index: IdIndex,
}

impl CommunityAssignment {
    /// Community id of `node`, if the node is part of the assignment.
    pub fn community_of(&self, node: NodeId) -> Option<u32> {
        self.index
            .slot(&self.node_ids, node)
            .map(|slot| self.community_ids[slot])
    }

    pub fn community_count(&self) -> usize {
        self.communities.len()
    }
}

// ============================================================================
// Output types — centrality
// ============================================================================

/// Node → score mapping for one centrality measure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralityResult {
    pub centrality_type: CentralityType,
    pub normalized: bool,
    /// Node ids, ascending
    pub node_ids: Vec<NodeId>,
    /// Score per entry of `node_ids`; always finite
    pub scores: Vec<f64>,
    /// Iterations used (0 for non-iterative measures)
    pub iterations: usize,
    /// False when an iterative measure hit `max_iterations` first
    pub converged: bool,
    #[serde(skip)]
    pub(crate) index: IdIndex,
}

impl CentralityResult {
    pub fn score(&self, node: NodeId) -> Option<f64> {
        self.index
            .slot(&self.node_ids, node)
            .map(|slot| self.scores[slot])
    }

    /// Flatten into raw parallel arrays for bulk consumers.
    pub fn into_bulk(self) -> CentralityBulk {
        CentralityBulk {
            node_ids: self.node_ids.into_iter().map(NodeId::raw).collect(),
            scores: self.scores,
            iterations: self.iterations,
            converged: self.converged,
        }
    }
}

/// Parallel id/score arrays for bulk numeric transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityBulk {
    pub node_ids: Vec<u32>,
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

// ============================================================================
// Output types — connectivity
// ============================================================================

/// Connectivity notion used for a [`ComponentResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    #[default]
    Weak,
    Strong,
}

/// Metadata about one connected component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component identifier (first-discovery order)
    pub id: u32,
    /// Number of nodes in this component
    pub size: usize,
    /// Member node ids, ascending
    pub members: Vec<NodeId>,
    /// Whether this is the largest (main) component
    pub is_main: bool,
}

/// Node → component partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentResult {
    pub kind: ComponentKind,
    /// Node ids, ascending
    pub node_ids: Vec<NodeId>,
    /// Component id per entry of `node_ids`
    pub component_ids: Vec<u32>,
    pub components: Vec<ComponentInfo>,
    #[serde(skip)]
    pub(crate) index: IdIndex,
}

impl ComponentResult {
    /// O(1) component lookup (after the first call builds the index).
    pub fn get_node_component(&self, node: NodeId) -> Result<u32> {
        self.index
            .slot(&self.node_ids, node)
            .map(|slot| self.component_ids[slot])
            .ok_or(AnalysisError::NodeNotFound(node))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

// ============================================================================
// Aggregated analytics result
// ============================================================================

/// Per-node metrics assembled by a full analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    /// PageRank score (0.0–1.0, higher = more important)
    pub pagerank: f64,
    /// Betweenness centrality (0.0–1.0, higher = more bridge-like)
    pub betweenness: f64,
    /// Community id from the configured detector
    pub community_id: u32,
    /// Weakly connected component id
    pub component_id: u32,
    /// Strongly connected component id
    pub strong_component_id: u32,
    /// Local clustering coefficient on the undirected view
    pub clustering_coefficient: f64,
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Complete result of [`crate::graph::engine::AnalyticsEngine::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Per-node metrics keyed by raw node id
    pub metrics: HashMap<u32, NodeMetrics>,
    pub communities: CommunityAssignment,
    pub components: ComponentResult,
    pub strong_components: ComponentResult,
    pub boundaries: Vec<crate::geometry::CommunityBoundary>,
    pub modularity: f64,
    pub node_count: usize,
    pub edge_count: usize,
    /// Computation time in milliseconds
    pub computation_ms: u64,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Tests
// ============================================================================
