//! Constraints for processes with their own transitions

use super::variable::{SolverVariable, RANGE_TAG};
use crate::error::Result;
use cadence_csp::{ConstraintId, Relation, Solver, VarId};

/// `start.date + range == end.date`, with `range` limited to the process
/// duration bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConstraint {
    start: VarId,
    end: VarId,
    range: VarId,
    /// Range variable created for this constraint alone
    owns_range: bool,
    equality: ConstraintId,
}

impl SolverConstraint {
    pub(crate) fn new(
        csp: &mut Solver,
        start: &mut SolverVariable,
        end: &SolverVariable,
        max: u32,
    ) -> Result<Self> {
        // start the range at the current gap so the first solve keeps both dates
        let gap = (csp.value(end.date_var())? - csp.value(start.date_var())?).clamp(0, max as i64);
        let (range, owns_range) = if start.range_used {
            (csp.add_int_var(0, max as i64, gap, RANGE_TAG)?, true)
        } else {
            let range = start.range_var();
            csp.set_int_var(range, gap, gap)?;
            csp.set_int_var(range, 0, max as i64)?;
            (range, false)
        };
        let equality = csp.add_constraint(
            &[start.date_var(), range, end.date_var()],
            &[1, 1, -1],
            Relation::Eq,
            0,
            true,
        );
        let equality = match equality {
            Ok(id) => id,
            Err(e) => {
                if owns_range {
                    csp.remove_int_var(range)?;
                }
                return Err(e.into());
            }
        };
        start.range_used |= !owns_range;
        Ok(Self {
            start: start.date_var(),
            end: end.date_var(),
            range,
            owns_range,
            equality,
        })
    }

    pub fn range_var(&self) -> VarId {
        self.range
    }

    pub fn range(&self, csp: &Solver) -> Result<u32> {
        Ok(csp.value(self.range)?.max(0) as u32)
    }

    /// Whether this constraint uses the start variable's own range
    pub fn uses_start_range(&self) -> bool {
        !self.owns_range
    }

    /// Suggest new dates for both ends; the range follows
    pub(crate) fn move_to(&self, csp: &mut Solver, start: u32, end: u32) -> Result<bool> {
        let (start, end) = (start as i64, end as i64);
        let budget = (start - csp.value(self.start)?)
            .abs()
            .max((end - csp.value(self.end)?).abs());
        Ok(csp.suggest_values(
            &[self.start, self.end, self.range],
            &[start, end, end - start],
            budget,
        )?)
    }

    /// Restrict the duration to `[min, max]`, `max == 0` meaning unbounded
    ///
    /// The caller checks feasibility and rolls back.
    pub(crate) fn limit(&self, csp: &mut Solver, min: u32, max: u32, max_date: u32) -> Result<bool> {
        let max = if max == 0 { max_date } else { max };
        csp.set_int_var(self.range, min as i64, max as i64)?;
        Ok(csp.update_variables_values())
    }

    /// Lift the duration bounds, e.g. while a rigid process is dragged
    pub(crate) fn relax(&self, csp: &mut Solver, max_date: u32) -> Result<()> {
        csp.set_int_var(self.range, 0, max_date as i64)?;
        Ok(())
    }

    pub(crate) fn remove(
        self,
        csp: &mut Solver,
        start: Option<&mut SolverVariable>,
        max_date: u32,
    ) -> Result<()> {
        csp.remove_constraint(self.equality)?;
        if self.owns_range {
            csp.remove_int_var(self.range)?;
        } else if let Some(start) = start {
            start.range_used = false;
            // back to 0 and fully open
            csp.set_int_var(self.range, 0, 0)?;
            csp.set_int_var(self.range, 0, max_date as i64)?;
        }
        Ok(())
    }
}
