//! Solver configuration

use serde::{Deserialize, Serialize};

/// Default number of search nodes explored before giving up
pub const DEFAULT_NODE_LIMIT: usize = 100_000;

/// Configuration for the constraint solver
///
/// # Example
///
/// ```
/// use cadence_csp::SolverConfig;
///
/// let config = SolverConfig::with_node_limit(0);
/// assert_eq!(config.node_limit(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Search nodes explored per solve, clamped to at least 1
    node_limit: usize,
}

impl SolverConfig {
    pub fn with_node_limit(node_limit: usize) -> Self {
        Self {
            node_limit: node_limit.max(1),
        }
    }

    pub fn node_limit(&self) -> usize {
        self.node_limit.max(1)
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_limit: DEFAULT_NODE_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(SolverConfig::default().node_limit(), DEFAULT_NODE_LIMIT);
    }

    #[test]
    fn test_clamped_limit() {
        assert_eq!(SolverConfig::with_node_limit(0).node_limit(), 1);
        assert_eq!(SolverConfig::with_node_limit(42).node_limit(), 42);
    }
}
