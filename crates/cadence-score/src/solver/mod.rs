//! Edition solver: keeps event dates consistent with process durations
//!
//! Every time event owns a [`SolverVariable`] (its date and range). Processes
//! that compile to their own transitions add a [`SolverConstraint`] tying the
//! start and end dates through the start's range; Interval processes add a
//! [`SolverRelation`] bounding the gap between both dates.
//!
//! Edits are all-or-nothing. A move or limit that the solver cannot satisfy
//! returns [`Error::Infeasible`] and leaves every value as it was.

mod constraint;
mod relation;
mod variable;

pub use constraint::SolverConstraint;
pub use relation::SolverRelation;
pub use variable::{SolverVariable, DATE_TAG, RANGE_TAG};

use crate::error::{Error, Result};
use crate::identity::{EventId, ProcessId};
use cadence_csp::{Solver, SolverConfig};
use indexmap::IndexMap;
use tracing::debug;

/// Constraint store of a scenario, indexed by events and processes
#[derive(Debug, Clone)]
pub struct EditionSolver {
    csp: Solver,
    variables: IndexMap<EventId, SolverVariable>,
    constraints: IndexMap<ProcessId, SolverConstraint>,
    relations: IndexMap<ProcessId, SolverRelation>,
    max_date: u32,
}

impl EditionSolver {
    /// Dates live in `[0, max_date]`
    pub fn new(max_date: u32, config: SolverConfig) -> Self {
        Self {
            csp: Solver::with_config(config),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            relations: IndexMap::new(),
            max_date,
        }
    }

    pub fn max_date(&self) -> u32 {
        self.max_date
    }

    /// Underlying constraint store
    pub fn csp(&self) -> &Solver {
        &self.csp
    }

    pub fn variable(&self, event: EventId) -> Option<&SolverVariable> {
        self.variables.get(&event)
    }

    pub fn constraint(&self, process: ProcessId) -> Option<&SolverConstraint> {
        self.constraints.get(&process)
    }

    pub fn relation(&self, process: ProcessId) -> Option<&SolverRelation> {
        self.relations.get(&process)
    }

    pub fn nb_variables(&self) -> usize {
        self.variables.len()
    }

    fn var(&self, event: EventId) -> Result<&SolverVariable> {
        self.variables
            .get(&event)
            .ok_or(Error::EventNotFound(event))
    }

    pub fn date(&self, event: EventId) -> Result<u32> {
        self.var(event)?.date(&self.csp)
    }

    pub fn range(&self, event: EventId) -> Result<u32> {
        self.var(event)?.range(&self.csp)
    }

    /// Solved date of every event
    pub fn dates(&self) -> impl Iterator<Item = (EventId, u32)> + '_ {
        self.variables
            .iter()
            .filter_map(|(id, v)| v.date(&self.csp).ok().map(|d| (*id, d)))
    }

    /// Whether every constraint holds for the current values
    pub fn is_satisfied(&self) -> bool {
        self.csp.is_satisfied()
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Register an event; a pinned one can never move
    pub fn add_variable(&mut self, event: EventId, date: u32, pinned: bool) -> Result<()> {
        if self.variables.contains_key(&event) {
            return Err(Error::Validation(format!("{} already has a variable", event)));
        }
        if date > self.max_date {
            return Err(Error::Validation(format!(
                "date {} is beyond the duration {}",
                date, self.max_date
            )));
        }
        let variable = SolverVariable::new(&mut self.csp, event, date, self.max_date, pinned)?;
        self.variables.insert(event, variable);
        Ok(())
    }

    /// Drop an event's variables; refused (false) while a process uses them
    pub fn remove_variable(&mut self, event: EventId) -> Result<bool> {
        let variable = self.var(event)?;
        let (date, range) = (variable.date_var(), variable.range_var());
        if self.csp.is_referenced(date) || self.csp.is_referenced(range) {
            return Ok(false);
        }
        if let Some(variable) = self.variables.shift_remove(&event) {
            variable.remove(&mut self.csp)?;
        }
        Ok(true)
    }

    /// Tie a non-Interval process: `start.date + range == end.date`, range in
    /// `[min, max]`
    pub fn add_constraint(
        &mut self,
        process: ProcessId,
        start: EventId,
        end: EventId,
        min: u32,
        max: u32,
    ) -> Result<()> {
        self.var(start)?;
        self.var(end)?;
        let saved = self.clone();
        let result = self.try_add_constraint(process, start, end, min, max);
        if result.is_err() {
            *self = saved;
        }
        result
    }

    fn try_add_constraint(
        &mut self,
        process: ProcessId,
        start: EventId,
        end: EventId,
        min: u32,
        max: u32,
    ) -> Result<()> {
        let end_var = self.var(end)?.clone();
        let max_date = self.max_date;
        let start_var = self
            .variables
            .get_mut(&start)
            .ok_or(Error::EventNotFound(start))?;
        let constraint = SolverConstraint::new(&mut self.csp, start_var, &end_var, max_date)
            .map_err(|e| infeasible(process, e))?;
        if (min != 0 || max != 0) && !constraint.limit(&mut self.csp, min, max, max_date)? {
            return Err(Error::Infeasible(format!(
                "{} cannot last [{}, {}]",
                process, min, max
            )));
        }
        self.constraints.insert(process, constraint);
        Ok(())
    }

    /// Bound an Interval process: `min <= end.date - start.date <= max`
    pub fn add_relation(
        &mut self,
        process: ProcessId,
        start: EventId,
        end: EventId,
        min: u32,
        max: u32,
    ) -> Result<()> {
        let start = self.var(start)?.date_var();
        let end = self.var(end)?.date_var();
        let saved = self.clone();
        let relation = SolverRelation::new(&mut self.csp, start, end, min, max)?;
        if !self.csp.update_variables_values() {
            *self = saved;
            return Err(Error::Infeasible(format!(
                "{} cannot last [{}, {}]",
                process, min, max
            )));
        }
        self.relations.insert(process, relation);
        Ok(())
    }

    /// Drop whatever ties a process; unknown processes are ignored
    pub fn remove_process(&mut self, process: ProcessId, start: EventId) -> Result<()> {
        if let Some(constraint) = self.constraints.shift_remove(&process) {
            let start = if constraint.uses_start_range() {
                self.variables.get_mut(&start)
            } else {
                None
            };
            constraint.remove(&mut self.csp, start, self.max_date)?;
        }
        if let Some(relation) = self.relations.shift_remove(&process) {
            relation.remove(&mut self.csp)?;
        }
        Ok(())
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Move one event, dragging whatever is tied to it
    pub fn move_event(&mut self, event: EventId, date: u32) -> Result<()> {
        let var = self.var(event)?.date_var();
        if date > self.max_date {
            return Err(Error::Validation(format!(
                "date {} is beyond the duration {}",
                date, self.max_date
            )));
        }
        let current = self.csp.value(var)?;
        let budget = (date as i64 - current).abs();
        if !self.csp.suggest_values(&[var], &[date as i64], budget)? {
            return Err(Error::Infeasible(format!("{} cannot move to {}", event, date)));
        }
        debug!(event = %event, date, "event moved");
        Ok(())
    }

    /// Move both ends of a process
    ///
    /// A rigid process is resized: its range is opened during the move and the
    /// caller records the new length as its limits.
    pub fn move_process(
        &mut self,
        process: ProcessId,
        start: u32,
        end: u32,
        rigid: bool,
    ) -> Result<()> {
        if start > end || end > self.max_date {
            return Err(Error::Validation(format!(
                "cannot move {} to [{}, {}]",
                process, start, end
            )));
        }
        let before = self.csp.snapshot();
        let moved = if let Some(constraint) = self.constraints.get(&process) {
            if rigid {
                constraint.relax(&mut self.csp, self.max_date)?;
            }
            let moved = constraint.move_to(&mut self.csp, start, end)?;
            if moved && rigid {
                let length = end - start;
                constraint.limit(&mut self.csp, length, length, self.max_date)?
            } else {
                moved
            }
        } else if let Some(relation) = self.relations.get(&process) {
            relation.move_to(&mut self.csp, start, end)?
        } else {
            return Err(Error::ProcessNotFound(process));
        };
        if !moved {
            self.csp.restore(before);
            return Err(Error::Infeasible(format!(
                "{} cannot move to [{}, {}]",
                process, start, end
            )));
        }
        debug!(process = %process, start, end, "process moved");
        Ok(())
    }

    /// Change the duration bounds of a process, 0 meaning unbounded for `max`
    pub fn limit_process(&mut self, process: ProcessId, min: u32, max: u32) -> Result<()> {
        let saved = self.clone();
        let limited = if let Some(constraint) = self.constraints.get(&process) {
            constraint.limit(&mut self.csp, min, max, self.max_date)?
        } else if let Some(relation) = self.relations.get_mut(&process) {
            relation.limit(&mut self.csp, min, max)?
        } else {
            return Err(Error::ProcessNotFound(process));
        };
        if !limited {
            *self = saved;
            return Err(Error::Infeasible(format!(
                "{} cannot last [{}, {}]",
                process, min, max
            )));
        }
        debug!(process = %process, min, max, "process limited");
        Ok(())
    }
}

fn infeasible(process: ProcessId, error: Error) -> Error {
    match error {
        Error::Csp(cadence_csp::Error::Infeasible(_)) => {
            Error::Infeasible(format!("{} does not fit between its events", process))
        }
        other => other,
    }
}
