//! One solver variable pair per time event

use crate::error::Result;
use crate::event::TimeEvent;
use crate::identity::EventId;
use cadence_csp::{Solver, VarId};

/// Tag of date variables
pub const DATE_TAG: u32 = 1;
/// Tag of range variables
pub const RANGE_TAG: u32 = 100;

/// The `date` and `range` variables of a time event
///
/// `range` is the length of the first non-Interval process starting at the
/// event, 0 when it starts none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverVariable {
    event: EventId,
    date: VarId,
    range: VarId,
    /// Whether a constraint already uses `range`
    pub(crate) range_used: bool,
}

impl SolverVariable {
    /// Create the variables; a pinned event can only sit at `date`
    pub(crate) fn new(
        csp: &mut Solver,
        event: EventId,
        date: u32,
        max: u32,
        pinned: bool,
    ) -> Result<Self> {
        let (min, max_date) = if pinned {
            (date as i64, date as i64)
        } else {
            (0, max as i64)
        };
        let date = csp.add_int_var(min, max_date, date as i64, DATE_TAG)?;
        let range = csp.add_int_var(0, max as i64, 0, RANGE_TAG)?;
        Ok(Self {
            event,
            date,
            range,
            range_used: false,
        })
    }

    pub fn event(&self) -> EventId {
        self.event
    }

    pub fn date_var(&self) -> VarId {
        self.date
    }

    pub fn range_var(&self) -> VarId {
        self.range
    }

    pub fn date(&self, csp: &Solver) -> Result<u32> {
        Ok(csp.value(self.date)?.max(0) as u32)
    }

    pub fn range(&self, csp: &Solver) -> Result<u32> {
        Ok(csp.value(self.range)?.max(0) as u32)
    }

    /// Copy the solved date back to the event; returns whether it changed
    pub fn update(&self, csp: &Solver, event: &mut TimeEvent) -> Result<bool> {
        let date = self.date(csp)?;
        if event.date() == date {
            return Ok(false);
        }
        event.set_date(date);
        Ok(true)
    }

    pub(crate) fn remove(self, csp: &mut Solver) -> Result<()> {
        csp.remove_int_var(self.date)?;
        csp.remove_int_var(self.range)?;
        Ok(())
    }
}
