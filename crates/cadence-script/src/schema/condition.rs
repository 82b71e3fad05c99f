//! Condition definition schema

use cadence_score::{Case, Expression};
use serde::{Deserialize, Serialize};

/// One event of a condition and the expressions deciding its fate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDef {
    /// Id of the event
    pub event: String,
    #[serde(default)]
    pub trigger: Expression,
    #[serde(default)]
    pub dispose: Expression,
    /// Happen when the condition is released
    #[serde(default)]
    pub default: bool,
}

impl CaseDef {
    pub fn to_case(&self) -> Case {
        Case {
            trigger: self.trigger.clone(),
            dispose: self.dispose.clone(),
            default: self.default,
        }
    }

    pub fn from_case(event: impl Into<String>, case: &Case) -> Self {
        Self {
            event: event.into(),
            trigger: case.trigger.clone(),
            dispose: case.dispose.clone(),
            default: case.default,
        }
    }
}

/// Definition of a time condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub cases: Vec<CaseDef>,
}

impl ConditionDef {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
