//! Analytics engine — single entry point over the per-module algorithms.
//!
//! The `AnalyticsEngine` trait is what embedders hold on to. It covers:
//!
//! 1. **Communities**: Louvain / Leiden partitions with modularity
//! 2. **Centrality**: degree, PageRank, eigenvector, Katz, closeness, betweenness
//! 3. **Connectivity**: weak and strong components
//! 4. **Geometry**: community boundaries and the boundary simulator
//!
//! `analyze` runs everything on one snapshot and assembles an
//! [`AnalysisReport`]. The trait also enables mocking in consumer tests.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;

use super::centrality;
use super::community;
use super::components;
use super::index::GraphIndex;
use super::models::{
    AnalysisReport, CentralityBulk, CentralityConfig, CentralityResult, CentralityType,
    CommunityAssignment, ComponentKind, ComponentResult, GraphSnapshot, NodeId, NodeMetrics,
    NodePositions, ProgressFn,
};
use crate::error::Result;
use crate::geometry::{self, CommunityBoundary};
use crate::physics::{self, BoundaryPhysicsResult, BoundaryPhysicsState};
use crate::EngineConfig;

// ============================================================================
// Trait
// ============================================================================

/// Analytics engine trait — every public graph operation behind one seam.
///
/// Consumers use `Arc<dyn AnalyticsEngine>` or `&dyn AnalyticsEngine`.
/// Calls are independent: the engine keeps no state between them except the
/// configuration it was built with.
pub trait AnalyticsEngine: Send + Sync {
    /// Partition the graph into communities using the configured algorithm.
    fn detect_communities(
        &self,
        index: &GraphIndex,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<CommunityAssignment>;

    /// Score every node with one centrality measure.
    ///
    /// Uses the configured centrality parameters with `centrality_type`
    /// substituted.
    fn compute_centrality(
        &self,
        index: &GraphIndex,
        centrality_type: CentralityType,
    ) -> Result<CentralityResult>;

    /// Same as [`AnalyticsEngine::compute_centrality`] as raw parallel arrays.
    fn compute_centrality_bulk(
        &self,
        index: &GraphIndex,
        centrality_type: CentralityType,
    ) -> Result<CentralityBulk>;

    /// Weak or strong component partition.
    fn get_connected_components(&self, index: &GraphIndex, kind: ComponentKind) -> ComponentResult;

    /// Component id of `node`; `NodeNotFound` when absent.
    fn get_node_component(&self, components: &ComponentResult, node: NodeId) -> Result<u32>;

    /// Boundary polygon for one set of community members.
    fn compute_hull(
        &self,
        community_id: u32,
        members: &[NodeId],
        positions: &NodePositions,
    ) -> Result<CommunityBoundary>;

    /// Boundaries for every community of an assignment.
    fn compute_hulls(
        &self,
        assignment: &CommunityAssignment,
        positions: &NodePositions,
    ) -> Result<Vec<CommunityBoundary>>;

    /// Start a boundary simulation from a set of boundaries.
    fn init_boundary_physics(&self, boundaries: &[CommunityBoundary]) -> Result<BoundaryPhysicsState>;

    /// Advance a boundary simulation by one tick.
    fn update_boundary_physics(&self, state: &mut BoundaryPhysicsState) -> BoundaryPhysicsResult;

    /// Full analysis: communities, PageRank, betweenness, components,
    /// clustering and hulls for one snapshot.
    fn analyze(&self, snapshot: &GraphSnapshot) -> Result<AnalysisReport>;
}

// ============================================================================
// Concrete implementation
// ============================================================================

/// Engine that delegates to the pure algorithm modules.
#[derive(Debug, Clone, Default)]
pub struct GraphAnalyticsEngine {
    config: EngineConfig,
}

impl GraphAnalyticsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn centrality_config(&self, centrality_type: CentralityType) -> CentralityConfig {
        CentralityConfig {
            centrality_type,
            ..self.config.centrality.clone()
        }
    }
}

impl AnalyticsEngine for GraphAnalyticsEngine {
    fn detect_communities(
        &self,
        index: &GraphIndex,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<CommunityAssignment> {
        community::detect_communities(index, &self.config.community, progress)
    }

    fn compute_centrality(
        &self,
        index: &GraphIndex,
        centrality_type: CentralityType,
    ) -> Result<CentralityResult> {
        centrality::compute_centrality(index, &self.centrality_config(centrality_type))
    }

    fn compute_centrality_bulk(
        &self,
        index: &GraphIndex,
        centrality_type: CentralityType,
    ) -> Result<CentralityBulk> {
        centrality::compute_centrality_bulk(index, &self.centrality_config(centrality_type))
    }

    fn get_connected_components(&self, index: &GraphIndex, kind: ComponentKind) -> ComponentResult {
        match kind {
            ComponentKind::Weak => components::weak_components(index),
            ComponentKind::Strong => components::strong_components(index),
        }
    }

    fn get_node_component(&self, components: &ComponentResult, node: NodeId) -> Result<u32> {
        components.get_node_component(node)
    }

    fn compute_hull(
        &self,
        community_id: u32,
        members: &[NodeId],
        positions: &NodePositions,
    ) -> Result<CommunityBoundary> {
        geometry::compute_hull(community_id, members, positions, &self.config.hull)
    }

    fn compute_hulls(
        &self,
        assignment: &CommunityAssignment,
        positions: &NodePositions,
    ) -> Result<Vec<CommunityBoundary>> {
        geometry::compute_hulls(assignment, positions, &self.config.hull)
    }

    fn init_boundary_physics(&self, boundaries: &[CommunityBoundary]) -> Result<BoundaryPhysicsState> {
        physics::init_boundary_physics(boundaries, &self.config.physics)
    }

    fn update_boundary_physics(&self, state: &mut BoundaryPhysicsState) -> BoundaryPhysicsResult {
        physics::update_boundary_physics(state)
    }

    fn analyze(&self, snapshot: &GraphSnapshot) -> Result<AnalysisReport> {
        let start = Instant::now();

        // 1. Index
        let index = GraphIndex::build(snapshot)?;

        // 2. Communities
        let communities = self.detect_communities(&index, None)?;

        // 3. Centrality
        let pagerank = self.compute_centrality(&index, CentralityType::PageRank)?;
        let betweenness = self.compute_centrality(&index, CentralityType::Betweenness)?;

        // 4. Connectivity
        let weak = self.get_connected_components(&index, ComponentKind::Weak);
        let strong = self.get_connected_components(&index, ComponentKind::Strong);

        // 5. Clustering coefficient
        let clustering = index.clustering_coefficients();

        // 6. Boundaries from the snapshot coordinates
        let positions = NodePositions::from_snapshot(snapshot);
        let boundaries = self.compute_hulls(&communities, &positions)?;

        // 7. Assemble NodeMetrics per node; every result shares the index slot order
        let mut metrics: HashMap<u32, NodeMetrics> = HashMap::with_capacity(index.node_count());
        for (slot, &id) in index.node_ids().iter().enumerate() {
            metrics.insert(
                id.raw(),
                NodeMetrics {
                    pagerank: pagerank.scores[slot],
                    betweenness: betweenness.scores[slot],
                    community_id: communities.community_ids[slot],
                    component_id: weak.component_ids[slot],
                    strong_component_id: strong.component_ids[slot],
                    clustering_coefficient: clustering[slot],
                    in_degree: index.in_degree(slot),
                    out_degree: index.out_degree(slot),
                },
            );
        }

        let computation_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            nodes = index.node_count(),
            edges = index.edge_count(),
            communities = communities.community_count(),
            components = weak.component_count(),
            modularity = communities.total_modularity,
            computation_ms,
            "graph analysis complete"
        );

        Ok(AnalysisReport {
            metrics,
            modularity: communities.total_modularity,
            node_count: index.node_count(),
            edge_count: index.edge_count(),
            communities,
            components: weak,
            strong_components: strong,
            boundaries,
            computation_ms,
            computed_at: Utc::now(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::graph::models::{EdgeInput, NodeInput};
    use std::sync::Arc;

    /// Two triangles joined by a bridge, laid out left and right.
    fn make_barbell() -> GraphSnapshot {
        let coords = [
            (0.0, 0.0),
            (2.0, 0.0),
            (1.0, 2.0),
            (20.0, 0.0),
            (22.0, 0.0),
            (21.0, 2.0),
        ];
        GraphSnapshot {
            nodes: coords
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| NodeInput {
                    id: NodeId(i as u32),
                    x,
                    y,
                })
                .collect(),
            edges: [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)]
                .iter()
                .map(|&(s, t)| EdgeInput::new(s, t))
                .collect(),
            directed: false,
        }
    }

    #[test]
    fn test_analyze_barbell() {
        let engine = GraphAnalyticsEngine::default();
        let report = engine.analyze(&make_barbell()).unwrap();

        assert_eq!(report.node_count, 6);
        assert_eq!(report.edge_count, 7);
        assert_eq!(report.metrics.len(), 6);
        assert_eq!(report.communities.community_count(), 2);
        assert!((report.modularity - 5.0 / 14.0).abs() < 1e-9);
        assert_eq!(report.components.component_count(), 1);
        assert_eq!(report.boundaries.len(), 2);

        let bridge = &report.metrics[&2];
        let corner = &report.metrics[&0];
        assert!(bridge.betweenness > corner.betweenness);
        assert_ne!(
            report.metrics[&0].community_id,
            report.metrics[&5].community_id
        );
        assert!((corner.clustering_coefficient - 1.0).abs() < 1e-9);
        assert_eq!(bridge.in_degree, 3);
    }

    #[test]
    fn test_analyze_empty_graph() {
        let engine = GraphAnalyticsEngine::default();
        let report = engine.analyze(&GraphSnapshot::default()).unwrap();
        assert_eq!(report.node_count, 0);
        assert!(report.metrics.is_empty());
        assert!(report.boundaries.is_empty());
        assert_eq!(report.modularity, 0.0);
    }

    #[test]
    fn test_analyze_rejects_dangling_edge() {
        let engine = GraphAnalyticsEngine::default();
        let snapshot = GraphSnapshot::from_pairs(2, &[(0, 7)], true);
        assert!(matches!(
            engine.analyze(&snapshot),
            Err(AnalysisError::InvalidGraph(_))
        ));
    }

    #[test]
    fn test_centrality_uses_requested_type() {
        let engine = GraphAnalyticsEngine::default();
        let index = GraphIndex::build(&GraphSnapshot::from_pairs(3, &[(0, 1), (1, 2)], false)).unwrap();
        let result = engine.compute_centrality(&index, CentralityType::Degree).unwrap();
        assert_eq!(result.centrality_type, CentralityType::Degree);
        assert!((result.score(NodeId(1)).unwrap() - 1.0).abs() < 1e-9);

        let bulk = engine
            .compute_centrality_bulk(&index, CentralityType::Degree)
            .unwrap();
        assert_eq!(bulk.node_ids, vec![0, 1, 2]);
        assert_eq!(bulk.scores, result.scores);
    }

    #[test]
    fn test_component_lookup_through_engine() {
        let engine = GraphAnalyticsEngine::default();
        let index = GraphIndex::build(&GraphSnapshot::from_pairs(4, &[(0, 1), (2, 3)], true)).unwrap();
        let weak = engine.get_connected_components(&index, ComponentKind::Weak);
        let strong = engine.get_connected_components(&index, ComponentKind::Strong);
        assert_eq!(weak.component_count(), 2);
        assert_eq!(strong.component_count(), 4);
        assert_eq!(
            engine.get_node_component(&weak, NodeId(0)).unwrap(),
            engine.get_node_component(&weak, NodeId(1)).unwrap()
        );
        assert!(matches!(
            engine.get_node_component(&weak, NodeId(99)),
            Err(AnalysisError::NodeNotFound(NodeId(99)))
        ));
    }

    #[test]
    fn test_hulls_and_physics_through_engine() {
        let engine = GraphAnalyticsEngine::default();
        let snapshot = make_barbell();
        let index = GraphIndex::build(&snapshot).unwrap();
        let assignment = engine.detect_communities(&index, None).unwrap();
        let positions = NodePositions::from_snapshot(&snapshot);
        let boundaries = engine.compute_hulls(&assignment, &positions).unwrap();
        assert_eq!(boundaries.len(), 2);

        // Triangles twenty units apart never touch.
        let mut state = engine.init_boundary_physics(&boundaries).unwrap();
        assert!(!state.has_overlaps());
        let tick = engine.update_boundary_physics(&mut state);
        assert!(tick.is_empty());
        assert_eq!(tick.iteration, 1);
    }

    #[test]
    fn test_engine_is_object_safe() {
        let engine: Arc<dyn AnalyticsEngine> = Arc::new(GraphAnalyticsEngine::default());
        let index = GraphIndex::build(&GraphSnapshot::from_pairs(2, &[(0, 1)], false)).unwrap();
        let assignment = engine.detect_communities(&index, None).unwrap();
        assert_eq!(assignment.community_count(), 1);
    }
}
