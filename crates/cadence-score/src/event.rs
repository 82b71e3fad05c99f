//! Time events: the commitment points of a score

use crate::error::{Error, Result};
use crate::identity::{ConditionId, EventId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a time event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventStatus {
    /// Not reachable yet
    #[default]
    Waiting,
    /// Ready to happen, waiting for its trigger
    Pending,
    Happened,
    Disposed,
}

impl EventStatus {
    /// Happened or disposed
    pub fn is_final(&self) -> bool {
        matches!(self, EventStatus::Happened | EventStatus::Disposed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventStatus::Waiting => "waiting",
            EventStatus::Pending => "pending",
            EventStatus::Happened => "happened",
            EventStatus::Disposed => "disposed",
        };
        write!(f, "{}", name)
    }
}

/// A point in time of the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEvent {
    id: EventId,
    /// Display name
    pub name: String,
    /// Date in ms from the start of the owning scenario
    date: u32,
    status: EventStatus,
    /// Condition deciding whether this event happens
    condition: Option<ConditionId>,
    /// Muted events are never compiled as interactive
    pub mute: bool,
    /// Number of processes starting at this event
    attached_as_start: u32,
    /// Number of processes ending at this event
    attached_as_end: u32,
}

impl TimeEvent {
    pub(crate) fn new(id: EventId, name: impl Into<String>, date: u32) -> Self {
        Self {
            id,
            name: name.into(),
            date,
            status: EventStatus::Waiting,
            condition: None,
            mute: false,
            attached_as_start: 0,
            attached_as_end: 0,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn date(&self) -> u32 {
        self.date
    }

    pub(crate) fn set_date(&mut self, date: u32) {
        self.date = date;
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn condition(&self) -> Option<ConditionId> {
        self.condition
    }

    pub(crate) fn set_condition(&mut self, condition: Option<ConditionId>) {
        self.condition = condition;
    }

    /// Whether the event waits for an external trigger
    pub fn is_interactive(&self) -> bool {
        self.condition.is_some() && !self.mute
    }

    pub fn attached_as_start(&self) -> u32 {
        self.attached_as_start
    }

    pub fn attached_as_end(&self) -> u32 {
        self.attached_as_end
    }

    pub(crate) fn attach(&mut self, as_start: bool) {
        if as_start {
            self.attached_as_start += 1;
        } else {
            self.attached_as_end += 1;
        }
    }

    pub(crate) fn detach(&mut self, as_start: bool) {
        if as_start {
            self.attached_as_start = self.attached_as_start.saturating_sub(1);
        } else {
            self.attached_as_end = self.attached_as_end.saturating_sub(1);
        }
    }

    /// Whether any process still refers to this event
    pub fn is_attached(&self) -> bool {
        self.attached_as_start + self.attached_as_end > 0
    }

    /// Mark the event ready (pending) or not ready (waiting) again
    ///
    /// Returns whether the status changed.
    pub(crate) fn set_ready(&mut self, ready: bool) -> bool {
        match (self.status, ready) {
            (EventStatus::Waiting, true) => {
                self.status = EventStatus::Pending;
                true
            }
            (EventStatus::Pending, false) => {
                self.status = EventStatus::Waiting;
                true
            }
            _ => false,
        }
    }

    pub fn happen(&mut self) -> Result<()> {
        if self.status.is_final() {
            return Err(Error::Validation(format!(
                "{} cannot happen, it is already {}",
                self.id, self.status
            )));
        }
        self.status = EventStatus::Happened;
        Ok(())
    }

    pub fn dispose(&mut self) -> Result<()> {
        if self.status.is_final() {
            return Err(Error::Validation(format!(
                "{} cannot be disposed, it is already {}",
                self.id, self.status
            )));
        }
        self.status = EventStatus::Disposed;
        Ok(())
    }

    /// Back to waiting, ready for a new run
    pub fn reset(&mut self) {
        self.status = EventStatus::Waiting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lifecycle() {
        let mut e = TimeEvent::new(EventId::new(1), "a", 200);
        assert_eq!(e.status(), EventStatus::Waiting);
        assert!(e.set_ready(true));
        assert!(!e.set_ready(true));
        assert_eq!(e.status(), EventStatus::Pending);
        e.happen().unwrap();
        assert!(e.happen().unwrap_err().is_validation());
        assert!(e.dispose().is_err());
        assert!(!e.set_ready(false));
        e.reset();
        e.dispose().unwrap();
        assert_eq!(e.status(), EventStatus::Disposed);
    }

    #[test]
    fn test_interactive_requires_condition() {
        let mut e = TimeEvent::new(EventId::new(1), "a", 0);
        assert!(!e.is_interactive());
        e.set_condition(Some(ConditionId::new(3)));
        assert!(e.is_interactive());
        e.mute = true;
        assert!(!e.is_interactive());
    }

    #[test]
    fn test_attachment_counters() {
        let mut e = TimeEvent::new(EventId::new(1), "a", 0);
        e.attach(true);
        e.attach(false);
        assert!(e.is_attached());
        e.detach(true);
        e.detach(false);
        e.detach(false);
        assert!(!e.is_attached());
        assert_eq!(e.attached_as_end(), 0);
    }
}
