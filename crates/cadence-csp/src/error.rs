//! Error types for cadence-csp

use crate::model::{ConstraintId, VarId};
use thiserror::Error;

/// Constraint solver error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Empty domain: [{min}, {max}]")]
    EmptyDomain { min: i64, max: i64 },

    #[error("Variable not found: {0}")]
    VariableNotFound(VarId),

    #[error("Constraint not found: {0}")]
    ConstraintNotFound(ConstraintId),

    #[error("Arity mismatch: {vars} variable(s) for {coeffs} coefficient(s)")]
    ArityMismatch { vars: usize, coeffs: usize },

    #[error("Variable {0} is still used by a constraint")]
    VariableInUse(VarId),

    #[error("Constraint cannot be satisfied: {0}")]
    Infeasible(ConstraintId),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Compile-time check that Error is Send + Sync.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
