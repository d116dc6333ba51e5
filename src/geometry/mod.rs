//! Community boundary geometry.
//!
//! Turns the member positions of each community into a closed boundary
//! polygon that the physics simulator and renderers consume.
//!
//! ## Modules
//!
//! - [`polygon`] — primitives (area, centroid, containment, AABB, SAT overlap)
//! - [`triangulation`] — sweep-and-flip Delaunay triangulation
//! - [`hull`] — convex / concave hulls and the 1–2 member fallback circle

pub mod hull;
pub mod polygon;
pub mod triangulation;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::graph::models::NodeId;

pub use hull::{compute_hull, compute_hulls};
pub use polygon::Aabb;

/// 2D point in the layout's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    #[inline]
    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    #[inline]
    pub fn scale(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    #[inline]
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 2D cross product.
    #[inline]
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        self.sub(other).length()
    }
}

/// Hull construction variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HullType {
    #[default]
    Convex,
    Concave,
}

impl std::fmt::Display for HullType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Convex => write!(f, "convex"),
            Self::Concave => write!(f, "concave"),
        }
    }
}

impl std::str::FromStr for HullType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "convex" => Ok(Self::Convex),
            "concave" => Ok(Self::Concave),
            other => Err(AnalysisError::config(
                "hull_type",
                format!("unknown hull type '{other}'"),
            )),
        }
    }
}

/// Shape actually produced for a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    /// Convex polygon (3+ non-collinear points)
    Convex,
    /// Concave polygon traced from a pruned triangulation
    Concave,
    /// Collinear members: the two extreme points
    Segment,
    /// All members at one position
    Point,
    /// Sampled circle around a 1–2 member community
    Circle,
}

impl BoundaryKind {
    /// Whether the separating-axis test is exact for this shape.
    pub fn is_convex(self) -> bool {
        !matches!(self, Self::Concave)
    }
}

/// Closed boundary around one community's members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityBoundary {
    pub community_id: u32,
    pub kind: BoundaryKind,
    /// Vertices in counter-clockwise order; the closing edge is implicit
    pub polygon: Vec<Point>,
    /// Area centroid (vertex mean for degenerate shapes)
    pub centroid: Point,
    /// Members enclosed by this boundary, ascending
    pub members: Vec<NodeId>,
}

impl CommunityBoundary {
    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.polygon)
    }

    pub fn area(&self) -> f64 {
        polygon::signed_area(&self.polygon).abs()
    }
}

/// Tuning parameters for hull construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HullConfig {
    /// Convex or concave (default: convex)
    pub hull_type: HullType,
    /// Concave tightness, higher = tighter (default: 2.0, 1.0 = convex)
    pub concavity: f64,
    /// Radius of the fallback circle for 1–2 member communities (default: 20.0)
    pub fallback_radius: f64,
}

impl Default for HullConfig {
    fn default() -> Self {
        Self {
            hull_type: HullType::Convex,
            concavity: 2.0,
            fallback_radius: 20.0,
        }
    }
}

impl HullConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.concavity.is_finite() && self.concavity > 0.0) {
            return Err(AnalysisError::config(
                "concavity",
                format!("must be finite and > 0, got {}", self.concavity),
            ));
        }
        if !(self.fallback_radius.is_finite() && self.fallback_radius > 0.0) {
            return Err(AnalysisError::config(
                "fallback_radius",
                format!("must be finite and > 0, got {}", self.fallback_radius),
            ));
        }
        Ok(())
    }
}
