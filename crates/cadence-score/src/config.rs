//! Scenario configuration and execution modes

use serde::{Deserialize, Serialize};

/// Default container duration in ms
pub const DEFAULT_DURATION: u32 = 10_000;

/// How a scenario is being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExecutionMode {
    /// Interactive events wait for their trigger
    #[default]
    Normal,
    /// Every step crosses sensitized events without waiting for triggers
    CrossAllWithoutWaiting,
    /// A document is being loaded: edits skip the solver and notifications
    Loading,
}

/// Configuration for a scenario
///
/// # Example
///
/// ```
/// use cadence_score::{ExecutionMode, ScenarioConfig};
///
/// let config = ScenarioConfig::default()
///     .with_duration(1000)
///     .with_mode(ExecutionMode::CrossAllWithoutWaiting);
/// assert_eq!(config.duration(), 1000);
/// assert_eq!(config.nb_colors(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Container duration in ms, at least 1
    duration: u32,
    /// Token color channels of the compiled net, at least 1
    nb_colors: u16,
    /// Search nodes the edition solver may explore per edit, at least 1
    solver_node_limit: usize,
    /// Playback speed factor applied to real time, strictly positive
    speed: f64,
    pub mode: ExecutionMode,
}

impl ScenarioConfig {
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration.max(1);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_nb_colors(mut self, nb_colors: u16) -> Self {
        self.nb_colors = nb_colors.max(1);
        self
    }

    pub fn with_solver_node_limit(mut self, limit: usize) -> Self {
        self.solver_node_limit = limit.max(1);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = if speed > 0.0 && speed.is_finite() {
            speed
        } else {
            1.0
        };
        self
    }

    /// Getters re-apply the clamps so values read from documents stay valid
    pub fn duration(&self) -> u32 {
        self.duration.max(1)
    }

    pub fn nb_colors(&self) -> u16 {
        self.nb_colors.max(1)
    }

    pub fn solver_node_limit(&self) -> usize {
        self.solver_node_limit.max(1)
    }

    pub fn speed(&self) -> f64 {
        if self.speed > 0.0 && self.speed.is_finite() {
            self.speed
        } else {
            1.0
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            nb_colors: 1,
            solver_node_limit: cadence_csp::DEFAULT_NODE_LIMIT,
            speed: 1.0,
            mode: ExecutionMode::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScenarioConfig::default();
        assert_eq!(config.duration(), DEFAULT_DURATION);
        assert_eq!(config.mode, ExecutionMode::Normal);
        assert_eq!(config.speed(), 1.0);
    }

    #[test]
    fn test_clamping() {
        let config = ScenarioConfig::default()
            .with_duration(0)
            .with_nb_colors(0)
            .with_solver_node_limit(0)
            .with_speed(-2.0);
        assert_eq!(config.duration(), 1);
        assert_eq!(config.nb_colors(), 1);
        assert_eq!(config.solver_node_limit(), 1);
        assert_eq!(config.speed(), 1.0);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: ScenarioConfig = ron::from_str("(duration: 2500)").unwrap();
        assert_eq!(config.duration(), 2500);
        assert_eq!(config.nb_colors(), 1);
        assert_eq!(config.solver_node_limit(), cadence_csp::DEFAULT_NODE_LIMIT);
    }
}
