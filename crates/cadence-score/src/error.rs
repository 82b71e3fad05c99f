//! Error types for cadence-score

use crate::identity::{ConditionId, EventId, ProcessId};
use thiserror::Error;

/// Score error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Bad argument or bound ordering; nothing was changed
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("Process not found: {0}")]
    ProcessNotFound(ProcessId),

    #[error("Condition not found: {0}")]
    ConditionNotFound(ConditionId),

    /// The edition solver found no assignment; dates are unchanged
    #[error("Infeasible constraint: {0}")]
    Infeasible(String),

    #[error("Scenario is not compiled")]
    NotCompiled,

    #[error("Graph error: {0}")]
    Graph(#[from] cadence_petri::Error),

    #[error("Solver error: {0}")]
    Csp(#[from] cadence_csp::Error),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::EventNotFound(_) | Error::ProcessNotFound(_) | Error::ConditionNotFound(_)
        )
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, Error::Infeasible(_))
    }

    /// Fatal graph state; the scenario must be recompiled before it runs again
    pub fn is_incoherent(&self) -> bool {
        matches!(self, Error::Graph(e) if e.is_incoherent())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Compile-time check that Error is Send + Sync for thread-safe error propagation.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(Error::Validation("x".into()).is_validation());
        assert!(Error::EventNotFound(EventId::new(1)).is_not_found());
        assert!(Error::Infeasible("x".into()).is_infeasible());
        let graph: Error = cadence_petri::Error::IncoherentState("stale".into()).into();
        assert!(graph.is_incoherent());
        assert!(!Error::NotCompiled.is_incoherent());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::EventNotFound(EventId::new(4)).to_string(),
            "Event not found: event:4"
        );
        assert_eq!(Error::NotCompiled.to_string(), "Scenario is not compiled");
    }
}
