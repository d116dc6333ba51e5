//! Graph Insight
//!
//! An in-process graph analytics engine with:
//! - Louvain / Leiden community detection with modularity statistics
//! - Six centrality measures (degree, PageRank, eigenvector, Katz, closeness, betweenness)
//! - Weak and strong connected components
//! - Convex and concave community boundaries
//! - A tick-driven simulator that pushes overlapping boundaries apart

pub mod error;
pub mod geometry;
pub mod graph;
pub mod physics;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use error::AnalysisError;
pub use geometry::{BoundaryKind, CommunityBoundary, HullConfig, HullType, Point};
pub use graph::{
    AnalysisReport, AnalyticsEngine, CentralityConfig, CentralityType, CommunityAlgorithm,
    CommunityAssignment, CommunityConfig, ComponentKind, ComponentResult, GraphAnalyticsEngine,
    GraphIndex, GraphSnapshot, NodeId, NodePositions,
};
pub use physics::{BoundaryPhysicsResult, BoundaryPhysicsState, PhysicsConfig};

// ============================================================================
// Engine configuration
// ============================================================================

/// Configuration for every engine operation.
///
/// Deserializes from YAML where each section and field is optional. The
/// centrality section needs a `type`; it only sets the measure used when no
/// other is requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub community: CommunityConfig,
    pub hull: HullConfig,
    pub centrality: CentralityConfig,
    pub physics: PhysicsConfig,
}

impl EngineConfig {
    /// Load configuration with priority: env vars > YAML file > defaults.
    ///
    /// Looks for `graph-insight.yaml` in the current directory when no path
    /// is given.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Env var overrides
        let config = yaml.with_overrides(|key| std::env::var(key).ok())?;

        // 3. Reject out-of-range values before anything runs
        config.validate()?;
        Ok(config)
    }

    /// Apply `GRAPH_INSIGHT_*` overrides resolved through `lookup`.
    ///
    /// Unparseable numbers are ignored; an unknown algorithm name is an error.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        self.community.resolution = lookup("GRAPH_INSIGHT_RESOLUTION")
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.community.resolution);
        if let Some(name) = lookup("GRAPH_INSIGHT_COMMUNITY_ALGORITHM") {
            self.community.algorithm = name.parse()?;
        }
        self.hull.concavity = lookup("GRAPH_INSIGHT_CONCAVITY")
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.hull.concavity);
        self.physics.max_ticks = lookup("GRAPH_INSIGHT_MAX_TICKS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.physics.max_ticks);
        Ok(self)
    }

    /// Validate every section.
    pub fn validate(&self) -> std::result::Result<(), AnalysisError> {
        self.community.validate()?;
        self.hull.validate()?;
        self.centrality.validate()?;
        self.physics.validate()
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> Self {
        let default_path = Path::new("graph-insight.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }
}
