//! Schema definitions for RON score documents
//!
//! Objects refer to each other by symbolic string ids. The ids `start` and `end`
//! are reserved for the boundary events of the enclosing scenario.

pub mod condition;
pub mod event;
pub mod process;

pub use condition::{CaseDef, ConditionDef};
pub use event::EventDef;
pub use process::{ProcessDef, ProcessKindDef};

use cadence_score::ScenarioConfig;
use serde::{Deserialize, Serialize};

/// Id of the start event of every scenario
pub const START_ID: &str = "start";
/// Id of the end event of every scenario
pub const END_ID: &str = "end";

/// A whole score, possibly holding nested scores in its processes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: ScenarioConfig,
    /// Events besides `start` and `end`
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub processes: Vec<ProcessDef>,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
}

impl ScoreFile {
    pub fn new(name: impl Into<String>, config: ScenarioConfig) -> Self {
        Self {
            name: name.into(),
            config,
            ..Self::default()
        }
    }
}
