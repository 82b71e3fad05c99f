//! Cadence CSP - small integer constraint solver
//!
//! Integer variables with interval domains, linked by linear constraints
//! (`sum(coeff * var) <relation> bound`). The solver is built for editing:
//! - `suggest_values` pins some variables and re-solves the rest within a budget
//! - `update_variables_values` re-solves everything close to the current values
//! - snapshots give transactional rollback around multi-step edits
//!
//! Solving is bounds propagation followed by depth-first search whose value
//! ordering starts at each variable's current value.

mod config;
mod error;
mod model;
mod search;
mod snapshot;
mod solver;

pub use config::{SolverConfig, DEFAULT_NODE_LIMIT};
pub use error::{Error, Result};
pub use model::{ConstraintId, IntVar, LinearConstraint, Relation, VarId};
pub use snapshot::SolverSnapshot;
pub use solver::Solver;
