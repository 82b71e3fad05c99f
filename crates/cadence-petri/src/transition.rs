//! Transitions: synchronization points of the net

use crate::identity::{ArcId, NetId, TransitionId, TriggerId};
use crate::time::Date;
use serde::{Deserialize, Serialize};

/// What makes a sensitized transition cross
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Trigger {
    /// Pure timer: crosses as soon as it is sensitized
    #[default]
    Static,
    /// Crosses when the matching stimulus is put into the net
    External(TriggerId),
}

/// Hook run when a transition crosses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionAction {
    /// Publish a crossing with this payload
    Notify(u64),
    /// Start a child net on the parent clock
    LaunchChild(NetId),
    /// Stop a running child net
    StopChild(NetId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    id: TransitionId,
    pub(crate) trigger: Trigger,
    pub(crate) in_arcs: Vec<ArcId>,
    pub(crate) out_arcs: Vec<ArcId>,
    pub(crate) actions: Vec<TransitionAction>,
    pub(crate) wait_for_child: Option<NetId>,
    /// Bumped whenever pending actions for this transition become stale
    pub(crate) generation: u64,
    pub(crate) scheduled_start: Option<Date>,
}

impl Transition {
    pub(crate) fn new(id: TransitionId) -> Self {
        Self {
            id,
            trigger: Trigger::Static,
            in_arcs: Vec::new(),
            out_arcs: Vec::new(),
            actions: Vec::new(),
            wait_for_child: None,
            generation: 0,
            scheduled_start: None,
        }
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn is_static(&self) -> bool {
        matches!(self.trigger, Trigger::Static)
    }

    pub fn in_arcs(&self) -> &[ArcId] {
        &self.in_arcs
    }

    pub fn out_arcs(&self) -> &[ArcId] {
        &self.out_arcs
    }

    pub fn actions(&self) -> &[TransitionAction] {
        &self.actions
    }

    /// Child net this transition waits on, if any
    pub fn wait_for_child(&self) -> Option<NetId> {
        self.wait_for_child
    }

    /// Earliest crossing date computed when the transition was last scheduled
    pub fn scheduled_start(&self) -> Option<Date> {
        self.scheduled_start
    }

    /// Payloads published on crossing
    pub fn payloads(&self) -> impl Iterator<Item = u64> + '_ {
        self.actions.iter().filter_map(|action| match action {
            TransitionAction::Notify(payload) => Some(*payload),
            _ => None,
        })
    }
}
