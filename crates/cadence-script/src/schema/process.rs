//! Process definition schema

use super::ScoreFile;
use serde::{Deserialize, Serialize};

/// What a process does between its events
///
/// Behaviors are supplied by the host at run time and have no document form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ProcessKindDef {
    #[default]
    Plain,
    Interval,
    Scenario(Box<ScoreFile>),
}

/// Definition of a time process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Id of the start event
    pub start: String,
    /// Id of the end event
    pub end: String,
    #[serde(default)]
    pub kind: ProcessKindDef,
    /// Minimum duration in ms
    #[serde(default)]
    pub min: u32,
    /// Maximum duration in ms, 0 for unbounded
    #[serde(default)]
    pub max: u32,
    #[serde(default)]
    pub mute: bool,
}

impl ProcessDef {
    pub fn new(id: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            start: start.into(),
            end: end.into(),
            kind: ProcessKindDef::Plain,
            min: 0,
            max: 0,
            mute: false,
        }
    }

    pub fn with_kind(mut self, kind: ProcessKindDef) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_limits(mut self, min: u32, max: u32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
