//! Leiden refinement: connectivity repair between local moving and
//! aggregation.
//!
//! Louvain can leave a community internally disconnected, for example when a
//! bridging node moves away and the remaining members only touched each
//! other through it. Before aggregation every community is split into the
//! connected components of its induced subgraph. Splitting never lowers
//! modularity (the parts share no edges, so only the null-model term changes,
//! and it can only shrink).
//!
//! Each super-node of the next level therefore induces a connected subgraph
//! of the input graph, and so does every community of every level.

use std::collections::VecDeque;

use super::community::LevelGraph;

const UNASSIGNED: usize = usize::MAX;

/// Split every community whose induced subgraph is disconnected.
///
/// Returns fresh labels numbered in first-discovery order by node slot.
pub(crate) fn refine(graph: &LevelGraph, membership: &[usize]) -> Vec<usize> {
    let n = graph.node_count();
    let mut refined = vec![UNASSIGNED; n];
    let mut queue = VecDeque::new();
    let mut next_label = 0usize;

    for root in 0..n {
        if refined[root] != UNASSIGNED {
            continue;
        }
        let community = membership[root];
        refined[root] = next_label;
        queue.push_back(root);
        while let Some(v) = queue.pop_front() {
            for &(w, _) in &graph.adj[v] {
                if refined[w] == UNASSIGNED && membership[w] == community {
                    refined[w] = next_label;
                    queue.push_back(w);
                }
            }
        }
        next_label += 1;
    }

    let mut communities: Vec<usize> = membership.to_vec();
    communities.sort_unstable();
    communities.dedup();
    let splits = next_label.saturating_sub(communities.len());
    if splits > 0 {
        tracing::debug!(
            communities = communities.len(),
            refined = next_label,
            "refinement split disconnected communities"
        );
    }
    refined
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::community::detect_communities;
    use crate::graph::index::GraphIndex;
    use crate::graph::models::{CommunityAlgorithm, CommunityConfig, GraphSnapshot, NodeId};

    fn make_index(n: u32, pairs: &[(u32, u32)], directed: bool) -> GraphIndex {
        GraphIndex::build(&GraphSnapshot::from_pairs(n, pairs, directed)).unwrap()
    }

    fn leiden_config() -> CommunityConfig {
        CommunityConfig {
            algorithm: CommunityAlgorithm::Leiden,
            ..Default::default()
        }
    }

    /// Every community must be connected within its own members.
    fn assert_communities_connected(index: &GraphIndex, community_ids: &[u32]) {
        let graph = LevelGraph::from_index(index, true);
        let membership: Vec<usize> = community_ids.iter().map(|&c| c as usize).collect();
        let refined = refine(&graph, &membership);
        let mut before = membership.clone();
        before.sort_unstable();
        before.dedup();
        let mut after = refined;
        after.sort_unstable();
        after.dedup();
        assert_eq!(before.len(), after.len(), "a community is internally disconnected");
    }

    #[test]
    fn test_refine_splits_disconnected_community() {
        // 0-1 and 2-3 share community 0 without an edge between them
        let index = make_index(5, &[(0, 1), (2, 3), (3, 4)], false);
        let graph = LevelGraph::from_index(&index, true);
        let refined = refine(&graph, &[0, 0, 0, 0, 4]);
        assert_eq!(refined, vec![0, 0, 1, 1, 2]);
    }

    #[test]
    fn test_refine_keeps_connected_partition() {
        let index = make_index(4, &[(0, 1), (1, 2), (2, 3)], false);
        let graph = LevelGraph::from_index(&index, true);
        assert_eq!(refine(&graph, &[0, 0, 3, 3]), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_leiden_two_triangles_matches_louvain() {
        let index = make_index(
            6,
            &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)],
            false,
        );
        let louvain = detect_communities(&index, &CommunityConfig::default(), None).unwrap();
        let leiden = detect_communities(&index, &leiden_config(), None).unwrap();

        assert_eq!(leiden.algorithm, CommunityAlgorithm::Leiden);
        assert_eq!(leiden.community_ids, louvain.community_ids);
        assert_eq!(leiden.community_of(NodeId(5)), Some(1));
    }

    #[test]
    fn test_leiden_communities_are_connected() {
        // Ring of cliques with pendant chains, a shape where bridging nodes move
        let mut pairs = Vec::new();
        for c in 0..6u32 {
            let base = c * 5;
            for i in 0..5 {
                for j in (i + 1)..5 {
                    pairs.push((base + i, base + j));
                }
            }
            pairs.push((base + 4, (base + 5) % 30));
            pairs.push((base, 30 + c));
        }
        let index = make_index(36, &pairs, false);
        let result = detect_communities(&index, &leiden_config(), None).unwrap();

        assert_communities_connected(&index, &result.community_ids);
        assert!(result.total_modularity > 0.0);
    }

    #[test]
    fn test_leiden_isolated_nodes_stay_alone() {
        let index = make_index(5, &[(0, 1), (1, 2), (2, 0)], false);
        let result = detect_communities(&index, &leiden_config(), None).unwrap();
        assert_eq!(result.community_count(), 3);
        assert_communities_connected(&index, &result.community_ids);
    }
}
