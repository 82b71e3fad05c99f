//! Events published by a net to its owner

use crate::identity::{NetId, TransitionId, TriggerId};
use crate::time::Date;
use serde::{Deserialize, Serialize};

/// How a transition went across
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossOutcome {
    /// Crossed normally, `lateness` ms after its scheduled date (0 when triggered)
    Happened { lateness: Date },
    /// Crossed because it was deactivated
    Disposed,
}

/// Outbox entry, drained with [`PetriNet::drain_events`](crate::PetriNet::drain_events)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetEvent {
    /// A transition carrying a `Notify` payload crossed
    Crossed {
        transition: TransitionId,
        payload: u64,
        outcome: CrossOutcome,
    },
    /// An interactive transition became ready for (or lost) its trigger
    TriggerReady {
        transition: TransitionId,
        trigger: TriggerId,
        ready: bool,
    },
    /// A child net reached its end place
    ChildFinished { net: NetId },
    /// A child net failed and was stopped
    ChildFailed { net: NetId, reason: String },
    /// Event published by a child net
    Child { net: NetId, event: Box<NetEvent> },
}
