//! Community hull construction.
//!
//! - **Convex**: Andrew's monotone chain, `O(n log n)`, collinear points
//!   dropped. Collinear input collapses to its two extreme points, coincident
//!   input to a single point.
//! - **Concave**: chi-shape over the Delaunay triangulation. Boundary edges
//!   longer than `longest_edge / concavity` are removed longest first, each
//!   time deleting the triangle behind the edge, unless its third vertex is
//!   already on the boundary (that would pinch the outline). The remaining
//!   triangles always cover every point, and their outline is traced into
//!   one counter-clockwise polygon. `concavity <= 1` keeps every edge, which
//!   is the convex hull.
//! - **Fallback**: 1–2 member communities get a circle of `fallback_radius`
//!   (widened to reach both members) around the member centroid, sampled as a
//!   circumscribed polygon so the true circle lies inside it.

use std::collections::{BinaryHeap, HashMap, HashSet};

use super::polygon::{self, EPSILON};
use super::triangulation::delaunay;
use super::{BoundaryKind, CommunityBoundary, HullConfig, HullType, Point};
use crate::error::{AnalysisError, Result};
use crate::graph::models::{CommunityAssignment, NodeId, NodePositions};

/// Vertices of the sampled fallback circle.
pub const CIRCLE_SEGMENTS: usize = 32;

// ============================================================================
// Convex hull
// ============================================================================

/// Counter-clockwise convex hull starting at the lowest-x (then lowest-y)
/// point. Returns 1 point for coincident input and 2 for collinear input.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted = unique_points(points);
    if sorted.len() <= 2 {
        return sorted;
    }
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    let turn = |o: Point, a: Point, b: Point| a.sub(o).cross(b.sub(o));
    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() * 2);

    // Lower chain, then upper chain
    for &p in &sorted {
        while hull.len() >= 2 && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();

    if hull.len() < 3 {
        // Collinear: keep the extremes
        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        return vec![first, last];
    }
    hull
}

/// Deduplicate points closer than [`EPSILON`], keeping first occurrences.
fn unique_points(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    let mut unique: Vec<Point> = Vec::with_capacity(sorted.len());
    for p in sorted {
        if !unique.iter().rev().take(8).any(|q| q.distance(p) <= EPSILON) {
            unique.push(p);
        }
    }
    unique
}

// ============================================================================
// Concave hull
// ============================================================================

/// Boundary edge candidate, ordered by length (longest first).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    length: f64,
    edge: (usize, usize),
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.length
            .total_cmp(&other.length)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Chi-shape concave hull. `None` when the input has no triangulation
/// or the outline cannot be traced into one simple cycle.
pub fn concave_hull(points: &[Point], concavity: f64) -> Option<Vec<Point>> {
    let pts = unique_points(points);
    let triangles = delaunay(&pts);
    if triangles.is_empty() {
        return None;
    }

    // Edge -> live triangles touching it
    let mut edge_triangles: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for k in 0..3 {
            edge_triangles
                .entry(edge_key(tri[k], tri[(k + 1) % 3]))
                .or_default()
                .push(t);
        }
    }

    let longest = edge_triangles
        .keys()
        .map(|&(a, b)| pts[a].distance(pts[b]))
        .fold(0.0f64, f64::max);
    let threshold = longest / concavity.max(1.0);

    let mut alive = vec![true; triangles.len()];
    let mut on_boundary: HashSet<usize> = HashSet::new();
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
    for (&(a, b), tris) in &edge_triangles {
        if tris.len() == 1 {
            on_boundary.insert(a);
            on_boundary.insert(b);
            heap.push(Candidate {
                length: pts[a].distance(pts[b]),
                edge: (a, b),
            });
        }
    }

    while let Some(Candidate { length, edge }) = heap.pop() {
        if length <= threshold {
            break;
        }
        let live: Vec<usize> = edge_triangles[&edge]
            .iter()
            .copied()
            .filter(|&t| alive[t])
            .collect();
        let &[t] = live.as_slice() else {
            continue;
        };
        let tri = triangles[t];
        let Some(&apex) = tri.iter().find(|&&v| v != edge.0 && v != edge.1) else {
            continue;
        };
        if on_boundary.contains(&apex) {
            continue;
        }

        alive[t] = false;
        on_boundary.insert(apex);
        for end in [edge.0, edge.1] {
            let key = edge_key(end, apex);
            heap.push(Candidate {
                length: pts[end].distance(pts[apex]),
                edge: key,
            });
        }
    }

    trace_outline(&pts, &triangles, &alive)
}

/// Follow the directed outline edges of the live triangles.
fn trace_outline(pts: &[Point], triangles: &[[usize; 3]], alive: &[bool]) -> Option<Vec<Point>> {
    let mut count: HashMap<(usize, usize), usize> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        if !alive[t] {
            continue;
        }
        for k in 0..3 {
            *count.entry(edge_key(tri[k], tri[(k + 1) % 3])).or_default() += 1;
        }
    }

    let mut next: HashMap<usize, usize> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        if !alive[t] {
            continue;
        }
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            if count[&edge_key(a, b)] == 1 && next.insert(a, b).is_some() {
                // Two outgoing outline edges: pinched vertex
                return None;
            }
        }
    }

    let start = *next.keys().min()?;
    let mut outline = vec![start];
    let mut current = start;
    loop {
        current = *next.get(&current)?;
        if current == start {
            break;
        }
        if outline.len() > next.len() {
            return None;
        }
        outline.push(current);
    }
    if outline.len() != next.len() {
        return None;
    }
    Some(outline.into_iter().map(|v| pts[v]).collect())
}

// ============================================================================
// Fallback circle
// ============================================================================

/// Polygon circumscribing the circle of `radius` around `center`.
pub fn fallback_circle(center: Point, radius: f64) -> Vec<Point> {
    let step = std::f64::consts::TAU / CIRCLE_SEGMENTS as f64;
    let outer = radius / (step / 2.0).cos();
    (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = step * i as f64;
            Point::new(center.x + outer * angle.cos(), center.y + outer * angle.sin())
        })
        .collect()
}

// ============================================================================
// Community boundaries
// ============================================================================

fn member_points(members: &[NodeId], positions: &NodePositions) -> Result<Vec<Point>> {
    members
        .iter()
        .map(|&id| {
            let (x, y) = positions.get(id).ok_or(AnalysisError::NodeNotFound(id))?;
            if !(x.is_finite() && y.is_finite()) {
                return Err(AnalysisError::InvalidGraph(format!(
                    "{id} has non-finite position ({x}, {y})"
                )));
            }
            Ok(Point::new(x, y))
        })
        .collect()
}

/// Boundary polygon for one community.
///
/// Fails with `NodeNotFound` when a member has no position and with
/// `InvalidGraph` for an empty member list.
pub fn compute_hull(
    community_id: u32,
    members: &[NodeId],
    positions: &NodePositions,
    config: &HullConfig,
) -> Result<CommunityBoundary> {
    config.validate()?;
    if members.is_empty() {
        return Err(AnalysisError::InvalidGraph(format!(
            "community {community_id} has no members"
        )));
    }
    let points = member_points(members, positions)?;

    let mut sorted_members = members.to_vec();
    sorted_members.sort();

    let (kind, polygon) = if points.len() <= 2 {
        let center = polygon::vertex_mean(&points);
        let reach = points.iter().map(|p| p.distance(center)).fold(0.0f64, f64::max);
        (
            BoundaryKind::Circle,
            fallback_circle(center, config.fallback_radius.max(reach)),
        )
    } else {
        shaped_hull(community_id, &points, config)
    };

    let centroid = match kind {
        BoundaryKind::Circle => polygon::vertex_mean(&polygon),
        _ => polygon::centroid(&polygon),
    };

    Ok(CommunityBoundary {
        community_id,
        kind,
        polygon,
        centroid,
        members: sorted_members,
    })
}

fn shaped_hull(community_id: u32, points: &[Point], config: &HullConfig) -> (BoundaryKind, Vec<Point>) {
    let convex = convex_hull(points);
    let degenerate_kind = match convex.len() {
        1 => Some(BoundaryKind::Point),
        2 => Some(BoundaryKind::Segment),
        _ => None,
    };
    if let Some(kind) = degenerate_kind {
        return (kind, convex);
    }
    if config.hull_type == HullType::Convex || config.concavity <= 1.0 {
        return (BoundaryKind::Convex, convex);
    }

    match concave_hull(points, config.concavity) {
        Some(outline)
            if polygon::is_simple(&outline)
                && points.iter().all(|&p| polygon::contains_point(&outline, p, EPSILON * 1e3)) =>
        {
            (BoundaryKind::Concave, outline)
        }
        _ => {
            tracing::warn!(
                community_id,
                members = points.len(),
                concavity = config.concavity,
                "concave outline rejected, falling back to convex hull"
            );
            (BoundaryKind::Convex, convex)
        }
    }
}

/// Boundaries for every community of an assignment, in community id order.
pub fn compute_hulls(
    assignment: &CommunityAssignment,
    positions: &NodePositions,
    config: &HullConfig,
) -> Result<Vec<CommunityBoundary>> {
    config.validate()?;
    let boundaries = assignment
        .communities
        .iter()
        .map(|c| compute_hull(c.id, &c.members, positions, config))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(
        communities = boundaries.len(),
        hull_type = %config.hull_type,
        "community hulls computed"
    );
    Ok(boundaries)
}

// ============================================================================
// Tests
// ============================================================================
