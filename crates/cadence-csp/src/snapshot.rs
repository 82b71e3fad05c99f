//! SolverSnapshot - Saved state of a constraint store
//!
//! The solver mutates values in place, so an edit that spans several solves
//! (relax a domain, suggest values, restore the domain) captures a snapshot first
//! and restores it if any step fails.
//!
//! # Example
//!
//! ```
//! use cadence_csp::{Relation, Solver};
//!
//! let mut solver = Solver::new();
//! let x = solver.add_int_var(0, 100, 10, 0).unwrap();
//! let before = solver.snapshot();
//!
//! solver.add_constraint(&[x], &[1], Relation::Gq, 50, true).unwrap();
//! assert_eq!(solver.value(x).unwrap(), 50);
//!
//! solver.restore(before);
//! assert_eq!(solver.value(x).unwrap(), 10);
//! assert_eq!(solver.nb_constraints(), 0);
//! ```

use crate::model::{ConstraintId, IntVar, LinearConstraint, VarId};
use crate::solver::Solver;
use indexmap::IndexMap;

/// Full copy of the variables, constraints and id counters of a [`Solver`]
///
/// Restoring also rewinds the id counters, so ids handed out after the snapshot
/// must not be kept across a restore.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSnapshot {
    vars: IndexMap<VarId, IntVar>,
    constraints: IndexMap<ConstraintId, LinearConstraint>,
    next_var: u32,
    next_constraint: u32,
}

impl SolverSnapshot {
    pub(crate) fn capture(solver: &Solver) -> Self {
        Self {
            vars: solver.vars.clone(),
            constraints: solver.constraints.clone(),
            next_var: solver.next_var,
            next_constraint: solver.next_constraint,
        }
    }

    pub(crate) fn apply(self, solver: &mut Solver) {
        solver.vars = self.vars;
        solver.constraints = self.constraints;
        solver.next_var = self.next_var;
        solver.next_constraint = self.next_constraint;
    }

    /// Value a variable had when the snapshot was taken
    pub fn value(&self, id: VarId) -> Option<i64> {
        self.vars.get(&id).map(|v| v.value)
    }

    pub fn nb_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn nb_constraints(&self) -> usize {
        self.constraints.len()
    }
}
