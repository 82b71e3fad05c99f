//! Timed arcs between a place and a transition

use crate::error::Result;
use crate::identity::{ArcId, Color, PlaceId, TransitionId};
use crate::time::{Bound, Date, TimeWindow};
use serde::{Deserialize, Serialize};

/// Either end of an arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    Place(PlaceId),
    Transition(TransitionId),
}

/// Which way an arc points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcDirection {
    /// Place -> transition, consumed when the transition crosses
    Input,
    /// Transition -> place, produced when the transition crosses
    Output,
}

/// A directed place/transition edge
///
/// `relative` is measured from the moment the arc became active, `absolute`
/// from the start of the net clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arc {
    id: ArcId,
    place: PlaceId,
    transition: TransitionId,
    direction: ArcDirection,
    color: Color,
    relative: TimeWindow,
    absolute: TimeWindow,
    activation: Option<Date>,
}

impl Arc {
    pub(crate) fn new(
        id: ArcId,
        place: PlaceId,
        transition: TransitionId,
        direction: ArcDirection,
        color: Color,
    ) -> Self {
        Self {
            id,
            place,
            transition,
            direction,
            color,
            relative: TimeWindow::UNBOUNDED,
            absolute: TimeWindow::UNBOUNDED,
            activation: None,
        }
    }

    pub fn id(&self) -> ArcId {
        self.id
    }

    pub fn place(&self) -> PlaceId {
        self.place
    }

    pub fn transition(&self) -> TransitionId {
        self.transition
    }

    pub fn direction(&self) -> ArcDirection {
        self.direction
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Source node
    pub fn from(&self) -> Node {
        match self.direction {
            ArcDirection::Input => Node::Place(self.place),
            ArcDirection::Output => Node::Transition(self.transition),
        }
    }

    /// Destination node
    pub fn to(&self) -> Node {
        match self.direction {
            ArcDirection::Input => Node::Transition(self.transition),
            ArcDirection::Output => Node::Place(self.place),
        }
    }

    pub fn relative(&self) -> TimeWindow {
        self.relative
    }

    pub fn absolute(&self) -> TimeWindow {
        self.absolute
    }

    pub fn relative_min(&self) -> u64 {
        self.relative.min()
    }

    pub fn relative_max(&self) -> Bound {
        self.relative.max()
    }

    /// Change the relative window; rejected without side effect if `min >= max`
    pub fn change_relative_time(&mut self, min: u64, max: Bound) -> Result<()> {
        self.relative.set(min, max)
    }

    /// Change the absolute window; rejected without side effect if `min >= max`
    pub fn change_absolute_time(&mut self, min: u64, max: Bound) -> Result<()> {
        self.absolute.set(min, max)
    }

    pub fn is_active(&self) -> bool {
        self.activation.is_some()
    }

    /// Date the relative window counts from, if active
    pub fn activation(&self) -> Option<Date> {
        self.activation
    }

    pub(crate) fn set_active(&mut self, date: Date) {
        self.activation = Some(date);
    }

    pub(crate) fn set_inactive(&mut self) {
        self.activation = None;
    }

    pub(crate) fn retarget(&mut self, transition: TransitionId) {
        self.transition = transition;
    }

    pub(crate) fn rehome(&mut self, place: PlaceId) {
        self.place = place;
    }

    /// Earliest date this arc allows its transition to cross
    pub(crate) fn earliest(&self) -> Option<Date> {
        let activation = self.activation?;
        let relative = activation.saturating_add(self.relative.min() as Date);
        Some(relative.max(self.absolute.min() as Date))
    }

    /// Latest date this arc allows its transition to cross, `None` when unbounded
    pub(crate) fn latest(&self) -> Option<Date> {
        let activation = self.activation?;
        let relative = self.relative.max().offset(activation);
        let absolute = self.absolute.max().offset(0);
        match (relative, absolute) {
            (Some(r), Some(a)) => Some(r.min(a)),
            (r, a) => r.or(a),
        }
    }
}
