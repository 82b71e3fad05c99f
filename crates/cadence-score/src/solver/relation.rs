//! Relations for Interval processes

use crate::error::Result;
use cadence_csp::{ConstraintId, Relation, Solver, VarId};

/// `min <= end.date - start.date <= max`, the upper bound only when `max > 0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverRelation {
    start: VarId,
    end: VarId,
    min_bound: ConstraintId,
    max_bound: Option<ConstraintId>,
}

impl SolverRelation {
    pub(crate) fn new(csp: &mut Solver, start: VarId, end: VarId, min: u32, max: u32) -> Result<Self> {
        let (min_bound, max_bound) = Self::bounds(csp, start, end, min, max)?;
        Ok(Self {
            start,
            end,
            min_bound,
            max_bound,
        })
    }

    fn bounds(
        csp: &mut Solver,
        start: VarId,
        end: VarId,
        min: u32,
        max: u32,
    ) -> Result<(ConstraintId, Option<ConstraintId>)> {
        let min_bound =
            csp.add_constraint(&[end, start], &[1, -1], Relation::Gq, min as i64, false)?;
        let max_bound = if max > 0 {
            Some(csp.add_constraint(&[end, start], &[1, -1], Relation::Lq, max as i64, false)?)
        } else {
            None
        };
        Ok((min_bound, max_bound))
    }

    /// Suggest new dates for both ends
    pub(crate) fn move_to(&self, csp: &mut Solver, start: u32, end: u32) -> Result<bool> {
        let (start, end) = (start as i64, end as i64);
        let budget = (start - csp.value(self.start)?)
            .abs()
            .max((end - csp.value(self.end)?).abs());
        Ok(csp.suggest_values(&[self.start, self.end], &[start, end], budget)?)
    }

    /// Replace both bounds and re-solve
    ///
    /// The store has no way to change a bound in place, so both constraints are
    /// removed and created again. The caller checks feasibility and rolls back.
    pub(crate) fn limit(&mut self, csp: &mut Solver, min: u32, max: u32) -> Result<bool> {
        csp.remove_constraint(self.min_bound)?;
        if let Some(max_bound) = self.max_bound.take() {
            csp.remove_constraint(max_bound)?;
        }
        let (min_bound, max_bound) = Self::bounds(csp, self.start, self.end, min, max)?;
        self.min_bound = min_bound;
        self.max_bound = max_bound;
        Ok(csp.update_variables_values())
    }

    pub(crate) fn remove(self, csp: &mut Solver) -> Result<()> {
        csp.remove_constraint(self.min_bound)?;
        if let Some(max_bound) = self.max_bound {
            csp.remove_constraint(max_bound)?;
        }
        Ok(())
    }
}
