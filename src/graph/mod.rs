//! Graph analytics engine.
//!
//! Provides in-process graph data science over a read-only snapshot using
//! petgraph and rustworkx-core: community detection (Louvain, Leiden),
//! centrality measures, and weak / strong connected components.
//!
//! ## Architecture
//!
//! ```text
//! GraphSnapshot ──► GraphIndex (slots, adjacency, petgraph topology)
//!                        │
//!          ┌─────────────┼──────────────┐
//!     community     centrality     components
//!          │             │              │
//!          └──── AnalyticsEngine (facade) ──► AnalysisReport
//! ```
//!
//! ## Modules
//!
//! - [`models`] — Inputs, configs and results (GraphSnapshot, CommunityAssignment, CentralityResult, ...)
//! - [`index`] — `GraphIndex`: dense slots, adjacency lists, CSR export, clustering
//! - [`community`] — Multi-level Louvain local moving, aggregation and modularity
//! - [`leiden`] — Connectivity refinement used by the Leiden variant
//! - [`centrality`] — Degree, PageRank, eigenvector, Katz, closeness, betweenness
//! - [`components`] — Weakly and strongly connected components
//! - [`engine`] — `AnalyticsEngine` trait and `GraphAnalyticsEngine`

pub mod centrality;
pub mod community;
pub mod components;
pub mod engine;
pub mod index;
pub(crate) mod leiden;
pub mod models;

// Re-export primary types for convenience
pub use centrality::{compute_centrality, compute_centrality_bulk};
pub use community::{detect_communities, partition_modularity};
pub use components::{strong_components, weak_components};
pub use engine::{AnalyticsEngine, GraphAnalyticsEngine};
pub use index::GraphIndex;
pub use models::{
    AnalysisReport, CentralityBulk, CentralityConfig, CentralityResult, CentralityType, Community,
    CommunityAlgorithm, CommunityAssignment, CommunityConfig, ComponentInfo, ComponentKind,
    ComponentResult, DegreeMode, EdgeInput, GraphSnapshot, NodeId, NodeInput, NodeMetrics,
    NodePositions, Progress, ProgressFn,
};
