//! Notifications published by a scenario
//!
//! The scenario never calls upstream code; everything observable is queued as a
//! [`Notification`] and read back with `Scenario::drain_notifications`.

use crate::event::EventStatus;
use crate::identity::{ConditionId, EventId, ProcessId};
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A date was changed by an edit
    EventDateChanged { event: EventId, date: u32 },
    /// An event went through its lifecycle
    EventStatusChanged {
        event: EventId,
        status: EventStatus,
        previous: EventStatus,
    },
    /// An interactive event started (or stopped) waiting for its trigger
    EventReadyChanged { event: EventId, ready: bool },
    ConditionReadyChanged { condition: ConditionId, ready: bool },
    ProcessStarted { process: ProcessId },
    ProcessEnded { process: ProcessId },
    /// The scenario reached its end
    ScenarioEnded,
}

/// A notification with its context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Scenario position in ms when it was published
    pub position: u64,
    /// Replayed while catching up after a goto
    pub recall: bool,
    /// Nested scenario processes this came from, outermost first
    pub path: Vec<ProcessId>,
}

impl Notification {
    pub fn new(kind: NotificationKind, position: u64) -> Self {
        Self {
            kind,
            position,
            recall: false,
            path: Vec::new(),
        }
    }

    /// Mark as replayed
    pub fn with_recall(mut self, recall: bool) -> Self {
        self.recall = recall;
        self
    }

    /// Prefix the path with the process of the enclosing scenario
    pub fn nested_in(mut self, process: ProcessId) -> Self {
        self.path.insert(0, process);
        self
    }

    /// Event concerned, if any
    pub fn event(&self) -> Option<EventId> {
        match &self.kind {
            NotificationKind::EventDateChanged { event, .. }
            | NotificationKind::EventStatusChanged { event, .. }
            | NotificationKind::EventReadyChanged { event, .. } => Some(*event),
            _ => None,
        }
    }

    pub fn is_nested(&self) -> bool {
        !self.path.is_empty()
    }
}
