//! Boundary physics: tick-driven overlap resolution between community hulls.
//!
//! Each community boundary is a rigid body. A tick runs an AABB broad phase,
//! a polygon narrow phase (SAT for convex shapes, point sampling otherwise),
//! pushes overlapping pairs apart along the separating axis, damps the
//! velocities and clamps every node's displacement. The caller applies the
//! returned displacement batch to its position store and ticks again until
//! `has_overlaps` is false.
//!
//! ## Modules
//!
//! - [`boundary`] — `BoundaryPhysicsState` and the tick implementation

pub mod boundary;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

pub use boundary::{init_boundary_physics, update_boundary_physics, BoundaryPhysicsState};

/// Tuning parameters for the boundary simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Disabled simulators detect overlaps but never move anything (default: true)
    pub enabled: bool,
    /// Push per unit of overlap depth, applied to each body of a pair (default: 0.5)
    pub repulsion_strength: f64,
    /// Velocity retained per tick, in [0,1] (default: 0.8)
    pub damping: f64,
    /// Per-node displacement cap for one tick (default: 10.0)
    pub max_displacement: f64,
    /// Ticks after which the simulator stops moving bodies; 0 = unbounded
    /// (default: 300)
    pub max_ticks: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repulsion_strength: 0.5,
            damping: 0.8,
            max_displacement: 10.0,
            max_ticks: 300,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.repulsion_strength.is_finite() && self.repulsion_strength >= 0.0) {
            return Err(AnalysisError::config(
                "repulsion_strength",
                format!("must be finite and >= 0, got {}", self.repulsion_strength),
            ));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(AnalysisError::config(
                "damping",
                format!("must lie in [0,1], got {}", self.damping),
            ));
        }
        if !(self.max_displacement.is_finite() && self.max_displacement > 0.0) {
            return Err(AnalysisError::config(
                "max_displacement",
                format!("must be finite and > 0, got {}", self.max_displacement),
            ));
        }
        Ok(())
    }
}

/// Displacement batch produced by one tick (or accumulated over several).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPhysicsResult {
    /// Displaced node ids, ascending
    pub node_ids: Vec<u32>,
    pub displacements_x: Vec<f64>,
    pub displacements_y: Vec<f64>,
    /// Whether any pair of boundaries still overlaps after this tick
    pub has_overlaps: bool,
    /// Ticks executed so far on this state
    pub iteration: usize,
}

impl BoundaryPhysicsResult {
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Largest per-node displacement length in the batch.
    pub fn max_displacement(&self) -> f64 {
        self.displacements_x
            .iter()
            .zip(&self.displacements_y)
            .map(|(dx, dy)| dx.hypot(*dy))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_config_defaults_and_yaml() {
        let config: PhysicsConfig = serde_yaml::from_str("damping: 0.5\nmax_ticks: 0\n").unwrap();
        assert!(config.enabled);
        assert!((config.repulsion_strength - 0.5).abs() < f64::EPSILON);
        assert!((config.damping - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.max_ticks, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_physics_config_validation() {
        let bad_damping = PhysicsConfig {
            damping: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            bad_damping.validate(),
            Err(AnalysisError::InvalidConfig { field: "damping", .. })
        ));

        let bad_cap = PhysicsConfig {
            max_displacement: 0.0,
            ..Default::default()
        };
        assert!(bad_cap.validate().is_err());

        let negative = PhysicsConfig {
            repulsion_strength: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_result_max_displacement() {
        let result = BoundaryPhysicsResult {
            node_ids: vec![1, 2],
            displacements_x: vec![3.0, 0.5],
            displacements_y: vec![4.0, 0.0],
            has_overlaps: false,
            iteration: 1,
        };
        assert!((result.max_displacement() - 5.0).abs() < f64::EPSILON);
        assert!(!result.is_empty());
    }
}
