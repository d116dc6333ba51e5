//! Connectivity partitions.
//!
//! - **Weak components**: union-find (union by rank, path compression) over
//!   the undirected view, via `petgraph::unionfind::UnionFind`
//! - **Strong components**: Tarjan's low-link DFS driven by an explicit call
//!   stack, so deep graphs cannot overflow the thread stack
//!
//! Component ids are dense and assigned in first-discovery order while
//! scanning nodes by ascending id.

use petgraph::unionfind::UnionFind;
use std::collections::HashMap;

use super::index::GraphIndex;
use super::models::{ComponentInfo, ComponentKind, ComponentResult, IdIndex, NodeId};

const UNVISITED: usize = usize::MAX;

/// Weakly connected components (edges treated as undirected).
pub fn weak_components(index: &GraphIndex) -> ComponentResult {
    let n = index.node_count();
    let mut sets: UnionFind<usize> = UnionFind::new(n);

    for slot in 0..n {
        for &(neighbor, _) in index.neighbors(slot) {
            if slot < neighbor {
                sets.union(slot, neighbor);
            }
        }
    }

    let labels: Vec<usize> = (0..n).map(|slot| sets.find_mut(slot)).collect();
    let result = assemble(index, ComponentKind::Weak, &labels);
    tracing::debug!(
        nodes = n,
        components = result.components.len(),
        "weak components computed"
    );
    result
}

/// Strongly connected components (Tarjan, iterative).
///
/// In undirected mode every edge is mirrored, so the result coincides with
/// the weak partition.
pub fn strong_components(index: &GraphIndex) -> ComponentResult {
    let n = index.node_count();
    let mut discovery = vec![UNVISITED; n];
    let mut low_link = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut scc_stack: Vec<usize> = Vec::new();
    // (node, position of the next outgoing edge to explore)
    let mut call_stack: Vec<(usize, usize)> = Vec::new();
    let mut labels = vec![UNVISITED; n];
    let mut next_index = 0usize;
    let mut next_label = 0usize;

    for root in 0..n {
        if discovery[root] != UNVISITED {
            continue;
        }
        discovery[root] = next_index;
        low_link[root] = next_index;
        next_index += 1;
        scc_stack.push(root);
        on_stack[root] = true;
        call_stack.push((root, 0));

        while let Some(&(v, pos)) = call_stack.last() {
            let out = index.out_neighbors(v);
            if pos < out.len() {
                let top = call_stack.len() - 1;
                call_stack[top].1 += 1;
                let w = out[pos].0;
                if discovery[w] == UNVISITED {
                    discovery[w] = next_index;
                    low_link[w] = next_index;
                    next_index += 1;
                    scc_stack.push(w);
                    on_stack[w] = true;
                    call_stack.push((w, 0));
                } else if on_stack[w] {
                    low_link[v] = low_link[v].min(discovery[w]);
                }
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                low_link[parent] = low_link[parent].min(low_link[v]);
            }
            if low_link[v] == discovery[v] {
                while let Some(member) = scc_stack.pop() {
                    on_stack[member] = false;
                    labels[member] = next_label;
                    if member == v {
                        break;
                    }
                }
                next_label += 1;
            }
        }
    }

    let result = assemble(index, ComponentKind::Strong, &labels);
    tracing::debug!(
        nodes = n,
        components = result.components.len(),
        "strong components computed"
    );
    result
}

/// Renumber arbitrary labels by first appearance and build the summaries.
fn assemble(index: &GraphIndex, kind: ComponentKind, labels: &[usize]) -> ComponentResult {
    let n = labels.len();
    let mut remap: HashMap<usize, u32> = HashMap::new();
    let mut component_ids = Vec::with_capacity(n);
    let mut members: Vec<Vec<NodeId>> = Vec::new();

    for (slot, &label) in labels.iter().enumerate() {
        let id = *remap.entry(label).or_insert_with(|| {
            members.push(Vec::new());
            (members.len() - 1) as u32
        });
        component_ids.push(id);
        members[id as usize].push(index.node_id(slot));
    }

    let max_size = members.iter().map(Vec::len).max().unwrap_or(0);
    let main_id = members.iter().position(|m| m.len() == max_size);

    let components = members
        .into_iter()
        .enumerate()
        .map(|(id, members)| ComponentInfo {
            id: id as u32,
            size: members.len(),
            is_main: Some(id) == main_id,
            members,
        })
        .collect();

    ComponentResult {
        kind,
        node_ids: index.node_ids().to_vec(),
        component_ids,
        components,
        index: IdIndex::default(),
    }
}

// ============================================================================
// Tests
// ============================================================================
