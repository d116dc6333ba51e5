//! Rigid-body overlap resolver over community boundaries.

use std::collections::BTreeMap;

use super::{BoundaryPhysicsResult, PhysicsConfig};
use crate::error::{AnalysisError, Result};
use crate::geometry::polygon::{self, Aabb};
use crate::geometry::{CommunityBoundary, Point};

/// Tick ceiling for [`BoundaryPhysicsState::run_until_settled`] when
/// `max_ticks` is 0.
pub const UNBOUNDED_SETTLE_TICKS: usize = 10_000;

#[derive(Debug, Clone)]
struct Body {
    boundary: CommunityBoundary,
    convex: bool,
    aabb: Aabb,
    velocity: Point,
    travelled: Point,
}

impl Body {
    fn translate(&mut self, d: Point) {
        for v in self.boundary.polygon.iter_mut() {
            *v = v.add(d);
        }
        self.boundary.centroid = self.boundary.centroid.add(d);
        self.aabb = self.aabb.translate(d.x, d.y);
        self.travelled = self.travelled.add(d);
    }
}

/// Persistent simulator state. Single owner; ticks must be sequential.
#[derive(Debug, Clone)]
pub struct BoundaryPhysicsState {
    config: PhysicsConfig,
    bodies: Vec<Body>,
    iteration: usize,
    has_overlaps: bool,
}

/// Store the initial boundaries with zero velocity.
///
/// Fails with `InvalidConfig` for out-of-range parameters and with
/// `InvalidGraph` for an empty polygon.
pub fn init_boundary_physics(
    boundaries: &[CommunityBoundary],
    config: &PhysicsConfig,
) -> Result<BoundaryPhysicsState> {
    config.validate()?;
    let bodies = boundaries
        .iter()
        .map(|b| {
            if b.polygon.is_empty() {
                return Err(AnalysisError::InvalidGraph(format!(
                    "community {} has an empty boundary",
                    b.community_id
                )));
            }
            Ok(Body {
                boundary: b.clone(),
                convex: b.kind.is_convex(),
                aabb: b.aabb(),
                velocity: Point::default(),
                travelled: Point::default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut state = BoundaryPhysicsState {
        config: config.clone(),
        bodies,
        iteration: 0,
        has_overlaps: false,
    };
    state.has_overlaps = !state.overlapping_pairs().is_empty();
    tracing::debug!(
        bodies = state.bodies.len(),
        has_overlaps = state.has_overlaps,
        "boundary physics initialized"
    );
    Ok(state)
}

/// Advance the simulation by one tick.
pub fn update_boundary_physics(state: &mut BoundaryPhysicsState) -> BoundaryPhysicsResult {
    state.tick()
}

impl BoundaryPhysicsState {
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn has_overlaps(&self) -> bool {
        self.has_overlaps
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Current boundary positions.
    pub fn boundaries(&self) -> impl Iterator<Item = &CommunityBoundary> {
        self.bodies.iter().map(|b| &b.boundary)
    }

    /// Total translation applied to a community since initialization.
    pub fn total_displacement(&self, community_id: u32) -> Option<Point> {
        self.bodies
            .iter()
            .find(|b| b.boundary.community_id == community_id)
            .map(|b| b.travelled)
    }

    /// Broad phase: sweep on `min_x`, then an AABB test on the y extent.
    fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut order: Vec<usize> = (0..self.bodies.len()).collect();
        order.sort_by(|&a, &b| {
            self.bodies[a]
                .aabb
                .min_x
                .total_cmp(&self.bodies[b].aabb.min_x)
                .then(a.cmp(&b))
        });

        let mut pairs = Vec::new();
        for (k, &i) in order.iter().enumerate() {
            let a = &self.bodies[i].aabb;
            for &j in &order[k + 1..] {
                let b = &self.bodies[j].aabb;
                if b.min_x > a.max_x {
                    break;
                }
                if a.intersects(b) {
                    pairs.push((i.min(j), i.max(j)));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    /// Narrow phase over the broad-phase shortlist.
    fn overlapping_pairs(&self) -> Vec<(usize, usize, polygon::Mtv)> {
        self.candidate_pairs()
            .into_iter()
            .filter_map(|(i, j)| {
                let (a, b) = (&self.bodies[i], &self.bodies[j]);
                polygon::overlap(&a.boundary.polygon, a.convex, &b.boundary.polygon, b.convex)
                    .map(|mtv| (i, j, mtv))
            })
            .collect()
    }

    fn tick(&mut self) -> BoundaryPhysicsResult {
        let cap_reached = self.config.max_ticks > 0 && self.iteration >= self.config.max_ticks;
        if !self.config.enabled || cap_reached {
            if cap_reached && self.has_overlaps {
                tracing::warn!(
                    iteration = self.iteration,
                    max_ticks = self.config.max_ticks,
                    "boundary physics tick cap reached with overlaps remaining"
                );
            }
            self.has_overlaps = !self.overlapping_pairs().is_empty();
            return BoundaryPhysicsResult {
                has_overlaps: self.has_overlaps,
                iteration: self.iteration,
                ..Default::default()
            };
        }

        let overlaps = self.overlapping_pairs();
        let mut push = vec![Point::default(); self.bodies.len()];
        for &(i, j, mtv) in &overlaps {
            let impulse = mtv.axis.scale(mtv.depth * self.config.repulsion_strength);
            push[i] = push[i].sub(impulse);
            push[j] = push[j].add(impulse);
        }

        let max = self.config.max_displacement;
        let mut per_node: BTreeMap<u32, Point> = BTreeMap::new();
        for (body, push) in self.bodies.iter_mut().zip(push) {
            body.velocity = body.velocity.add(push).scale(self.config.damping);
            let step = clamp_length(body.velocity, max);
            body.velocity = step;
            if step == Point::default() {
                continue;
            }
            body.translate(step);
            for id in &body.boundary.members {
                let entry = per_node.entry(id.raw()).or_default();
                *entry = entry.add(step);
            }
        }

        self.iteration += 1;
        self.has_overlaps = !self.overlapping_pairs().is_empty();
        tracing::debug!(
            iteration = self.iteration,
            overlapping_pairs = overlaps.len(),
            moved_nodes = per_node.len(),
            has_overlaps = self.has_overlaps,
            "boundary physics tick"
        );

        let mut result = BoundaryPhysicsResult {
            has_overlaps: self.has_overlaps,
            iteration: self.iteration,
            ..Default::default()
        };
        for (id, d) in per_node {
            // A node listed in two boundaries still moves at most `max`
            let d = clamp_length(d, max);
            result.node_ids.push(id);
            result.displacements_x.push(d.x);
            result.displacements_y.push(d.y);
        }
        result
    }

    /// Tick until no overlaps remain or the tick cap is reached. Returns the
    /// summed displacement of every moved node.
    pub fn run_until_settled(&mut self) -> BoundaryPhysicsResult {
        let limit = match self.config.max_ticks {
            0 => self.iteration + UNBOUNDED_SETTLE_TICKS,
            cap => cap,
        };
        let mut total: BTreeMap<u32, Point> = BTreeMap::new();

        while self.has_overlaps && self.iteration < limit && self.config.enabled {
            let tick = self.tick();
            for ((&id, &dx), &dy) in tick
                .node_ids
                .iter()
                .zip(&tick.displacements_x)
                .zip(&tick.displacements_y)
            {
                let entry = total.entry(id).or_default();
                *entry = entry.add(Point::new(dx, dy));
            }
        }

        if self.has_overlaps {
            tracing::warn!(
                iteration = self.iteration,
                "boundary physics stopped with overlaps remaining"
            );
        } else {
            tracing::info!(iteration = self.iteration, "boundary physics settled");
        }

        let mut result = BoundaryPhysicsResult {
            has_overlaps: self.has_overlaps,
            iteration: self.iteration,
            ..Default::default()
        };
        for (id, d) in total {
            result.node_ids.push(id);
            result.displacements_x.push(d.x);
            result.displacements_y.push(d.y);
        }
        result
    }
}

fn clamp_length(v: Point, max: f64) -> Point {
    let len = v.length();
    if len > max {
        v.scale(max / len)
    } else {
        v
    }
}

// ============================================================================
// Tests
// ============================================================================
