//! Event definition schema

use serde::{Deserialize, Serialize};

/// Definition of a time event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    /// Unique identifier within the score
    pub id: String,
    /// Display name, the id when missing
    #[serde(default)]
    pub name: Option<String>,
    /// Date in ms from the scenario start
    pub date: u32,
    #[serde(default)]
    pub mute: bool,
}

impl EventDef {
    pub fn new(id: impl Into<String>, date: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            date,
            mute: false,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
