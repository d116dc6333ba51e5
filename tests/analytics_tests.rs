//! Integration tests for graph-insight
//!
//! Exercise the public engine API end to end: snapshots in, analysis
//! results out. No external services needed.
//! Run with: cargo test --test analytics_tests

use graph_insight::geometry::polygon;
use graph_insight::graph::{partition_modularity, EdgeInput, NodeInput};
use graph_insight::{
    AnalyticsEngine, CentralityType, CommunityAlgorithm, CommunityBoundary, ComponentKind,
    EngineConfig, GraphAnalyticsEngine, GraphIndex, GraphSnapshot, HullType, NodeId,
    NodePositions, PhysicsConfig,
};

// ============================================================================
// Builders
// ============================================================================

fn snapshot(coords: &[(f64, f64)], pairs: &[(u32, u32)], directed: bool) -> GraphSnapshot {
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
        edges: pairs.iter().map(|&(s, t)| EdgeInput::new(s, t)).collect(),
        directed,
    }
}

fn make_two_triangles(with_bridge: bool) -> GraphSnapshot {
    let mut pairs = vec![(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)];
    if with_bridge {
        pairs.push((2, 3));
    }
    GraphSnapshot::from_pairs(6, &pairs, false)
}

/// Deterministic pseudo-random graph with scattered positions.
fn make_random_graph(n: u32, edges: usize, directed: bool, seed: u64) -> GraphSnapshot {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as u32
    };
    let coords: Vec<(f64, f64)> = (0..n)
        .map(|_| ((next() % 1000) as f64 / 10.0, (next() % 1000) as f64 / 10.0))
        .collect();
    let pairs: Vec<(u32, u32)> = (0..edges).map(|_| (next() % n, next() % n)).collect();
    snapshot(&coords, &pairs, directed)
}

fn engine_with(config: EngineConfig) -> GraphAnalyticsEngine {
    GraphAnalyticsEngine::new(config)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_pagerank_symmetric_two_cycle() {
    let engine = GraphAnalyticsEngine::default();
    let index = GraphIndex::build(&GraphSnapshot::from_pairs(2, &[(0, 1), (1, 0)], true)).unwrap();
    let result = engine
        .compute_centrality(&index, CentralityType::PageRank)
        .unwrap();
    assert!((result.score(NodeId(0)).unwrap() - 0.5).abs() < 1e-9);
    assert!((result.score(NodeId(1)).unwrap() - 0.5).abs() < 1e-9);
    assert!(result.converged);
}

#[test]
fn test_bridged_triangles_form_two_communities() {
    let engine = GraphAnalyticsEngine::default();
    let index = GraphIndex::build(&make_two_triangles(true)).unwrap();

    let assignment = engine.detect_communities(&index, None).unwrap();
    assert_eq!(assignment.community_count(), 2);
    let left = assignment.community_of(NodeId(0)).unwrap();
    let right = assignment.community_of(NodeId(3)).unwrap();
    assert_ne!(left, right);
    for id in [1, 2] {
        assert_eq!(assignment.community_of(NodeId(id)), Some(left));
    }
    for id in [4, 5] {
        assert_eq!(assignment.community_of(NodeId(id)), Some(right));
    }

    let weak = engine.get_connected_components(&index, ComponentKind::Weak);
    assert_eq!(weak.component_count(), 1);
    assert_eq!(weak.components[0].size, 6);
}

#[test]
fn test_removing_bridge_splits_components() {
    let engine = GraphAnalyticsEngine::default();
    let index = GraphIndex::build(&make_two_triangles(false)).unwrap();
    let weak = engine.get_connected_components(&index, ComponentKind::Weak);
    assert_eq!(weak.component_count(), 2);
    assert!(weak.components.iter().all(|c| c.size == 3));
    assert_ne!(
        weak.get_node_component(NodeId(0)).unwrap(),
        weak.get_node_component(NodeId(5)).unwrap()
    );
}

#[test]
fn test_square_hull_excludes_interior_point() {
    let engine = GraphAnalyticsEngine::default();
    let mut positions = NodePositions::new();
    let corners = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (5.0, 5.0)];
    for (i, &(x, y)) in corners.iter().enumerate() {
        positions.insert(NodeId(i as u32), x, y);
    }
    let members: Vec<NodeId> = (0..5).map(NodeId).collect();

    let boundary = engine.compute_hull(0, &members, &positions).unwrap();
    assert_eq!(boundary.polygon.len(), 4);
    assert!(!boundary
        .polygon
        .iter()
        .any(|p| (p.x - 5.0).abs() < 1e-9 && (p.y - 5.0).abs() < 1e-9));
    assert!((boundary.area() - 100.0).abs() < 1e-9);
    assert_eq!(boundary.members, members);
}

#[test]
fn test_overlapping_hulls_are_pushed_apart() {
    // Two side-2 squares of four members each, overlapping by 1 on x.
    let mut positions = NodePositions::new();
    let left = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)];
    let right = [(1.0, 0.0), (3.0, 0.0), (3.0, 2.0), (1.0, 2.0)];
    for (i, &(x, y)) in left.iter().chain(right.iter()).enumerate() {
        positions.insert(NodeId(i as u32), x, y);
    }
    let left_members: Vec<NodeId> = (0..4).map(NodeId).collect();
    let right_members: Vec<NodeId> = (4..8).map(NodeId).collect();

    let engine = engine_with(EngineConfig {
        physics: PhysicsConfig {
            repulsion_strength: 0.5,
            max_displacement: 10.0,
            ..Default::default()
        },
        ..Default::default()
    });
    let boundaries = vec![
        engine.compute_hull(0, &left_members, &positions).unwrap(),
        engine.compute_hull(1, &right_members, &positions).unwrap(),
    ];
    let mut state = engine.init_boundary_physics(&boundaries).unwrap();
    assert!(state.has_overlaps());

    let first = engine.update_boundary_physics(&mut state);
    assert!(first.has_overlaps);
    let dx = |id: u32| {
        let slot = first.node_ids.iter().position(|&n| n == id).unwrap();
        first.displacements_x[slot]
    };
    for id in 0..4 {
        assert!(dx(id) < 0.0);
    }
    for id in 4..8 {
        assert!(dx(id) > 0.0);
    }
    positions.apply_displacements(
        &first.node_ids,
        &first.displacements_x,
        &first.displacements_y,
    );

    let mut ticks = 1;
    while state.has_overlaps() && ticks < 100 {
        let result = engine.update_boundary_physics(&mut state);
        positions.apply_displacements(
            &result.node_ids,
            &result.displacements_x,
            &result.displacements_y,
        );
        ticks += 1;
    }
    assert!(!state.has_overlaps());

    // The position store followed the boundaries.
    let (left_edge, _) = positions.get(NodeId(1)).unwrap();
    let (right_edge, _) = positions.get(NodeId(4)).unwrap();
    assert!(right_edge >= left_edge - 1e-9);
}

#[test]
fn test_coincident_unit_squares_separate_along_x() {
    // Two unit squares overlapping by their full width
    let mut positions = NodePositions::new();
    let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
    for (i, &(x, y)) in corners.iter().chain(corners.iter()).enumerate() {
        positions.insert(NodeId(i as u32), x, y);
    }
    let engine = engine_with(EngineConfig {
        physics: PhysicsConfig {
            repulsion_strength: 0.5,
            max_displacement: 10.0,
            ..Default::default()
        },
        ..Default::default()
    });
    let left: Vec<NodeId> = (0..4).map(NodeId).collect();
    let right: Vec<NodeId> = (4..8).map(NodeId).collect();
    let boundaries = vec![
        engine.compute_hull(0, &left, &positions).unwrap(),
        engine.compute_hull(1, &right, &positions).unwrap(),
    ];
    let mut state = engine.init_boundary_physics(&boundaries).unwrap();

    let first = engine.update_boundary_physics(&mut state);
    assert!(first.has_overlaps);
    for (slot, &id) in first.node_ids.iter().enumerate() {
        let dx = first.displacements_x[slot];
        if id < 4 {
            assert!(dx < 0.0);
        } else {
            assert!(dx > 0.0);
        }
        assert!(first.displacements_y[slot].abs() < 1e-12);
    }
    assert_eq!(first.node_ids.len(), 8);

    let mut ticks = 1;
    while state.has_overlaps() && ticks < 100 {
        engine.update_boundary_physics(&mut state);
        ticks += 1;
    }
    assert!(!state.has_overlaps());
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_assignment_is_partition_with_matching_modularity() {
    for (seed, algorithm) in [
        (1, CommunityAlgorithm::Louvain),
        (2, CommunityAlgorithm::Leiden),
        (3, CommunityAlgorithm::Louvain),
    ] {
        let config = EngineConfig {
            community: graph_insight::CommunityConfig {
                algorithm,
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = engine_with(config.clone());
        let index = GraphIndex::build(&make_random_graph(40, 90, false, seed)).unwrap();
        let assignment = engine.detect_communities(&index, None).unwrap();

        assert_eq!(assignment.node_ids.len(), 40);
        let mut seen: Vec<NodeId> = assignment
            .communities
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .collect();
        seen.sort();
        assert_eq!(seen, (0..40).map(NodeId).collect::<Vec<_>>());

        let recomputed =
            partition_modularity(&index, &assignment.community_ids, &config.community).unwrap();
        assert!((recomputed - assignment.total_modularity).abs() < 1e-6);
    }
}

#[test]
fn test_community_detection_is_deterministic() {
    let engine = GraphAnalyticsEngine::default();
    let index = GraphIndex::build(&make_random_graph(60, 150, true, 7)).unwrap();
    let first = engine.detect_communities(&index, None).unwrap();
    let second = engine.detect_communities(&index, None).unwrap();
    assert_eq!(first.community_ids, second.community_ids);
    assert_eq!(first.total_modularity, second.total_modularity);
}

#[test]
fn test_pagerank_is_a_distribution() {
    let engine = GraphAnalyticsEngine::default();
    let index = GraphIndex::build(&make_random_graph(50, 120, true, 11)).unwrap();
    let result = engine
        .compute_centrality(&index, CentralityType::PageRank)
        .unwrap();
    assert!(result.scores.iter().all(|&s| s >= 0.0));
    assert!((result.scores.iter().sum::<f64>() - 1.0).abs() < 1e-6);
}

#[test]
fn test_all_centralities_finite_and_normalized() {
    let engine = GraphAnalyticsEngine::default();
    for directed in [true, false] {
        let index = GraphIndex::build(&make_random_graph(30, 70, directed, 5)).unwrap();
        for centrality_type in [
            CentralityType::Degree,
            CentralityType::PageRank,
            CentralityType::Eigenvector,
            CentralityType::Katz,
            CentralityType::Closeness,
            CentralityType::Betweenness,
        ] {
            let result = engine.compute_centrality(&index, centrality_type).unwrap();
            assert_eq!(result.scores.len(), 30);
            for &s in &result.scores {
                assert!(s.is_finite(), "{centrality_type} produced {s}");
                assert!(
                    (-1e-9..=1.0 + 1e-9).contains(&s),
                    "{centrality_type} out of range: {s}"
                );
            }
        }
    }
}

#[test]
fn test_components_partition_nodes() {
    let engine = GraphAnalyticsEngine::default();
    let index = GraphIndex::build(&make_random_graph(50, 40, true, 13)).unwrap();
    for kind in [ComponentKind::Weak, ComponentKind::Strong] {
        let result = engine.get_connected_components(&index, kind);
        let total: usize = result.components.iter().map(|c| c.size).sum();
        assert_eq!(total, 50);
        assert_eq!(result.components.iter().filter(|c| c.is_main).count(), 1);
        for component in &result.components {
            for &member in &component.members {
                assert_eq!(result.get_node_component(member).unwrap(), component.id);
            }
        }
    }

    let weak = engine.get_connected_components(&index, ComponentKind::Weak);
    let strong = engine.get_connected_components(&index, ComponentKind::Strong);
    assert!(strong.component_count() >= weak.component_count());
}

fn assert_members_enclosed(boundaries: &[CommunityBoundary], positions: &NodePositions) {
    for boundary in boundaries {
        for &member in &boundary.members {
            let (x, y) = positions.get(member).unwrap();
            let p = graph_insight::Point::new(x, y);
            assert!(
                polygon::contains_point(&boundary.polygon, p, 1e-6),
                "community {} ({:?}) does not enclose {member}",
                boundary.community_id,
                boundary.kind
            );
        }
    }
}

#[test]
fn test_hulls_enclose_members() {
    let snapshot = make_random_graph(60, 80, false, 17);
    let positions = NodePositions::from_snapshot(&snapshot);
    let index = GraphIndex::build(&snapshot).unwrap();

    for hull_type in [HullType::Convex, HullType::Concave] {
        let engine = engine_with(EngineConfig {
            hull: graph_insight::HullConfig {
                hull_type,
                ..Default::default()
            },
            ..Default::default()
        });
        let assignment = engine.detect_communities(&index, None).unwrap();
        let boundaries = engine.compute_hulls(&assignment, &positions).unwrap();
        assert_eq!(boundaries.len(), assignment.community_count());
        assert_members_enclosed(&boundaries, &positions);
    }
}

#[test]
fn test_tick_displacement_is_clamped() {
    let snapshot = make_random_graph(40, 60, false, 23);
    let positions = NodePositions::from_snapshot(&snapshot);
    let engine = engine_with(EngineConfig {
        physics: PhysicsConfig {
            repulsion_strength: 2.0,
            damping: 1.0,
            max_displacement: 0.5,
            ..Default::default()
        },
        ..Default::default()
    });
    let index = GraphIndex::build(&snapshot).unwrap();
    let assignment = engine.detect_communities(&index, None).unwrap();
    let boundaries = engine.compute_hulls(&assignment, &positions).unwrap();

    let mut state = engine.init_boundary_physics(&boundaries).unwrap();
    for _ in 0..25 {
        let result = engine.update_boundary_physics(&mut state);
        assert!(result.max_displacement() <= 0.5 + 1e-9);
    }
}

#[test]
fn test_analyze_snapshot_from_json() {
    let json = r#"{
        "nodes": [
            {"id": 0, "x": 0.0, "y": 0.0},
            {"id": 1, "x": 1.0, "y": 0.0},
            {"id": 2, "x": 0.0, "y": 1.0},
            {"id": 3}
        ],
        "edges": [
            {"source": 0, "target": 1},
            {"source": 1, "target": 2, "weight": 2.0},
            {"source": 2, "target": 0}
        ]
    }"#;
    let snapshot: GraphSnapshot = serde_json::from_str(json).unwrap();
    assert!(snapshot.directed);

    let report = GraphAnalyticsEngine::default().analyze(&snapshot).unwrap();
    assert_eq!(report.node_count, 4);
    assert_eq!(report.edge_count, 3);
    assert_eq!(report.components.component_count(), 2);
    assert_eq!(report.strong_components.component_count(), 2);
    assert_eq!(report.metrics[&3].in_degree, 0);
    assert_members_enclosed(&report.boundaries, &NodePositions::from_snapshot(&snapshot));

    let encoded = serde_json::to_value(&report).unwrap();
    assert!(encoded.get("computed_at").is_some());
    assert_eq!(encoded["node_count"], 4);
}
