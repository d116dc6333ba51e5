//! Error types for the analytics engine.

use crate::graph::models::NodeId;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced by the analytics engine.
///
/// Non-convergence, degenerate geometry and residual boundary overlap are
/// deliberately absent: they are reported through result fields, never as
/// failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// A configuration parameter is out of range. Raised before any work starts.
    #[error("invalid config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// The input snapshot is malformed (unknown endpoint, duplicate id, bad weight).
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A referenced node is not part of the graph or has no position.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
}

impl AnalysisError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::config("resolution", "must be > 0, got -1");
        assert_eq!(err.to_string(), "invalid config: resolution must be > 0, got -1");

        let err = AnalysisError::NodeNotFound(NodeId(7));
        assert_eq!(err.to_string(), "node not found: Node(7)");

        let err = AnalysisError::InvalidGraph("edge 0 -> 9 references unknown node".into());
        assert!(err.to_string().starts_with("invalid graph:"));
    }
}
