//! The Petri net engine
//!
//! A [`PetriNet`] owns every place, transition and arc of one net in id-addressed
//! arenas, plus the runtime state needed to step it:
//! - the time-ordered action queue (START / END boundaries),
//! - the sensitized set (transitions waiting for their trigger),
//! - the accelerated queue (transitions whose window elapsed before they got there),
//! - the child nets launched and stopped by transition actions.
//!
//! Everything the owner needs to react to is published into an outbox of
//! [`NetEvent`]s rather than through callbacks.

use crate::action::{ActionKind, ActionQueue, PriorityTransitionAction};
use crate::arc::{Arc, ArcDirection, Node};
use crate::error::{Error, Result};
use crate::event::{CrossOutcome, NetEvent};
use crate::identity::{ArcId, Color, NetId, PlaceId, TransitionId, TriggerId};
use crate::place::Place;
use crate::time::{Bound, Date};
use crate::transition::{Transition, TransitionAction, Trigger};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, Copy)]
struct Accelerated {
    transition: TransitionId,
    generation: u64,
    lateness: Date,
}

/// A timed, colored Petri net
#[derive(Debug, Clone)]
pub struct PetriNet {
    id: NetId,
    parent: Option<NetId>,
    nb_colors: u16,
    places: IndexMap<PlaceId, Place>,
    transitions: IndexMap<TransitionId, Transition>,
    arcs: IndexMap<ArcId, Arc>,
    next_id: u32,
    start_place: PlaceId,
    end_place: PlaceId,
    queue: ActionQueue,
    sensitized: IndexSet<TransitionId>,
    accelerated: VecDeque<Accelerated>,
    stimuli: IndexSet<TriggerId>,
    ignore_events: bool,
    to_deactivate: IndexSet<TransitionId>,
    current_time: Date,
    start_offset: Date,
    running: bool,
    children: IndexMap<NetId, PetriNet>,
    active_children: IndexSet<NetId>,
    next_child: u32,
    outbox: Vec<NetEvent>,
}

impl PetriNet {
    /// Create an uncolored net with its start and end places
    pub fn new() -> Self {
        Self::with_colors(1)
    }

    /// Create a net with `nb_colors` token channels (at least one)
    pub fn with_colors(nb_colors: u16) -> Self {
        let nb_colors = nb_colors.max(1);
        let mut places = IndexMap::new();
        let start_place = PlaceId::new(0);
        let end_place = PlaceId::new(1);
        places.insert(start_place, Place::new(start_place, nb_colors));
        places.insert(end_place, Place::new(end_place, nb_colors));
        Self {
            id: NetId::new(0),
            parent: None,
            nb_colors,
            places,
            transitions: IndexMap::new(),
            arcs: IndexMap::new(),
            next_id: 2,
            start_place,
            end_place,
            queue: ActionQueue::new(),
            sensitized: IndexSet::new(),
            accelerated: VecDeque::new(),
            stimuli: IndexSet::new(),
            ignore_events: false,
            to_deactivate: IndexSet::new(),
            current_time: 0,
            start_offset: 0,
            running: false,
            children: IndexMap::new(),
            active_children: IndexSet::new(),
            next_child: 0,
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> NetId {
        self.id
    }

    /// Parent net id, `None` for a root net
    pub fn parent(&self) -> Option<NetId> {
        self.parent
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub fn start_place(&self) -> PlaceId {
        self.start_place
    }

    pub fn end_place(&self) -> PlaceId {
        self.end_place
    }

    pub fn create_place(&mut self) -> PlaceId {
        let id = PlaceId::new(self.alloc_id());
        self.places.insert(id, Place::new(id, self.nb_colors));
        id
    }

    pub fn create_transition(&mut self) -> TransitionId {
        let id = TransitionId::new(self.alloc_id());
        self.transitions.insert(id, Transition::new(id));
        id
    }

    /// Connect a place and a transition
    ///
    /// Returns the existing arc when the same endpoints are already connected
    /// with the same color.
    pub fn create_arc(&mut self, from: Node, to: Node, color: Color) -> Result<ArcId> {
        self.check_color(color)?;
        let (place, transition, direction) = match (from, to) {
            (Node::Place(p), Node::Transition(t)) => (p, t, ArcDirection::Input),
            (Node::Transition(t), Node::Place(p)) => (p, t, ArcDirection::Output),
            (Node::Place(_), Node::Place(_)) => {
                return Err(Error::InvalidArc("a place cannot be linked to a place".into()))
            }
            (Node::Transition(_), Node::Transition(_)) => {
                return Err(Error::InvalidArc(
                    "a transition cannot be linked to a transition".into(),
                ))
            }
        };
        if !self.places.contains_key(&place) {
            return Err(Error::PlaceNotFound(place));
        }
        if !self.transitions.contains_key(&transition) {
            return Err(Error::TransitionNotFound(transition));
        }
        if let Some(existing) = self.find_arc(from, to, color) {
            return Ok(existing);
        }

        let id = ArcId::new(self.alloc_id());
        self.arcs
            .insert(id, Arc::new(id, place, transition, direction, color));
        match direction {
            ArcDirection::Input => {
                self.places[&place].out_arcs.push(id);
                self.transitions[&transition].in_arcs.push(id);
            }
            ArcDirection::Output => {
                self.transitions[&transition].out_arcs.push(id);
                self.places[&place].in_arcs.push(id);
            }
        }

        if self.running
            && direction == ArcDirection::Input
            && self.places[&place].nb_tokens(color) > 0
        {
            self.activate_arc(id, self.current_time)?;
        }
        Ok(id)
    }

    /// Arc connecting `from` to `to` with `color`, if any
    pub fn find_arc(&self, from: Node, to: Node, color: Color) -> Option<ArcId> {
        let candidates = match from {
            Node::Place(p) => self.places.get(&p)?.out_arcs.as_slice(),
            Node::Transition(t) => self.transitions.get(&t)?.out_arcs.as_slice(),
        };
        candidates.iter().copied().find(|id| {
            self.arcs
                .get(id)
                .is_some_and(|arc| arc.to() == to && arc.color() == color)
        })
    }

    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.places.get(&id)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(&id)
    }

    pub fn arc(&self, id: ArcId) -> Option<&Arc> {
        self.arcs.get(&id)
    }

    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.values()
    }

    pub fn nb_places(&self) -> usize {
        self.places.len()
    }

    pub fn nb_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn nb_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Change an arc's relative window, see [`Arc::change_relative_time`]
    pub fn change_relative_time(&mut self, arc: ArcId, min: u64, max: Bound) -> Result<()> {
        self.arcs
            .get_mut(&arc)
            .ok_or(Error::ArcNotFound(arc))?
            .change_relative_time(min, max)
    }

    /// Change an arc's absolute window, see [`Arc::change_absolute_time`]
    pub fn change_absolute_time(&mut self, arc: ArcId, min: u64, max: Bound) -> Result<()> {
        self.arcs
            .get_mut(&arc)
            .ok_or(Error::ArcNotFound(arc))?
            .change_absolute_time(min, max)
    }

    pub fn set_trigger(&mut self, transition: TransitionId, trigger: Trigger) -> Result<()> {
        self.transition_mut(transition)?.trigger = trigger;
        Ok(())
    }

    /// Attach a hook run every time the transition crosses
    pub fn add_extern_action(
        &mut self,
        transition: TransitionId,
        action: TransitionAction,
    ) -> Result<()> {
        if let TransitionAction::LaunchChild(net) | TransitionAction::StopChild(net) = action {
            if !self.children.contains_key(&net) {
                return Err(Error::NetNotFound(net));
            }
        }
        let t = self.transition_mut(transition)?;
        if !t.actions.contains(&action) {
            t.actions.push(action);
        }
        Ok(())
    }

    /// Keep the transition from being sensitized while `net` runs
    pub fn set_wait_for_child(
        &mut self,
        transition: TransitionId,
        net: Option<NetId>,
    ) -> Result<()> {
        self.transition_mut(transition)?.wait_for_child = net;
        Ok(())
    }

    pub fn delete_arc(&mut self, id: ArcId) -> Result<()> {
        let arc = self.arcs.shift_remove(&id).ok_or(Error::ArcNotFound(id))?;
        if let Some(place) = self.places.get_mut(&arc.place()) {
            place.in_arcs.retain(|a| *a != id);
            place.out_arcs.retain(|a| *a != id);
        }
        if let Some(t) = self.transitions.get_mut(&arc.transition()) {
            t.in_arcs.retain(|a| *a != id);
            t.out_arcs.retain(|a| *a != id);
        }
        if arc.direction() == ArcDirection::Input && arc.is_active() {
            self.invalidate(arc.transition());
        }
        Ok(())
    }

    /// Delete a place and every arc touching it; the start and end places stay
    pub fn delete_place(&mut self, id: PlaceId) -> Result<()> {
        if id == self.start_place || id == self.end_place {
            return Err(Error::InvalidOperation(format!(
                "{} is a boundary place of the net",
                id
            )));
        }
        let place = self.places.get(&id).ok_or(Error::PlaceNotFound(id))?;
        let arcs: Vec<ArcId> = place.in_arcs.iter().chain(&place.out_arcs).copied().collect();
        for arc in arcs {
            self.delete_arc(arc)?;
        }
        self.places.shift_remove(&id);
        Ok(())
    }

    /// Delete a transition and every arc touching it
    pub fn delete_transition(&mut self, id: TransitionId) -> Result<()> {
        let t = self.transition(id).ok_or(Error::TransitionNotFound(id))?;
        let arcs: Vec<ArcId> = t.in_arcs.iter().chain(&t.out_arcs).copied().collect();
        for arc in arcs {
            self.delete_arc(arc)?;
        }
        self.transitions.shift_remove(&id);
        self.sensitized.shift_remove(&id);
        self.to_deactivate.shift_remove(&id);
        Ok(())
    }

    /// Fuse place `other` into `keep`: its tokens move over as they are and its
    /// arcs are redirected, duplicates of `keep`'s arcs dropped
    pub fn merge_places(&mut self, keep: PlaceId, other: PlaceId) -> Result<()> {
        if keep == other {
            return Ok(());
        }
        if other == self.start_place || other == self.end_place {
            return Err(Error::InvalidOperation(format!(
                "{} is a boundary place of the net",
                other
            )));
        }
        if !self.places.contains_key(&keep) {
            return Err(Error::PlaceNotFound(keep));
        }
        let merged = self
            .places
            .shift_remove(&other)
            .ok_or(Error::PlaceNotFound(other))?;

        for arc_id in merged.in_arcs.iter().chain(&merged.out_arcs).copied() {
            let Some(arc) = self.arcs.get(&arc_id) else {
                continue;
            };
            let (transition, color, direction) = (arc.transition(), arc.color(), arc.direction());
            let (from, to) = match direction {
                ArcDirection::Input => (Node::Place(keep), Node::Transition(transition)),
                ArcDirection::Output => (Node::Transition(transition), Node::Place(keep)),
            };
            if self.find_arc(from, to, color).is_some() {
                self.arcs.shift_remove(&arc_id);
                if let Some(t) = self.transitions.get_mut(&transition) {
                    t.in_arcs.retain(|a| *a != arc_id);
                    t.out_arcs.retain(|a| *a != arc_id);
                }
                continue;
            }
            if let Some(arc) = self.arcs.get_mut(&arc_id) {
                arc.rehome(keep);
            }
            let target = &mut self.places[&keep];
            match direction {
                ArcDirection::Input => target.out_arcs.push(arc_id),
                ArcDirection::Output => target.in_arcs.push(arc_id),
            }
        }

        self.places[&keep].merge(merged);
        debug!(keep = %keep, merged = %other, "merged places");
        Ok(())
    }

    /// Fuse `other` into `keep`, redirecting all of its arcs
    ///
    /// Arcs that would duplicate an existing arc of `keep` are dropped. Hooks are
    /// appended to `keep`, which also adopts `other`'s trigger and child wait when
    /// it has none of its own.
    pub fn merge_transitions(&mut self, keep: TransitionId, other: TransitionId) -> Result<()> {
        if keep == other {
            return Ok(());
        }
        if !self.transitions.contains_key(&keep) {
            return Err(Error::TransitionNotFound(keep));
        }
        let merged = self
            .transitions
            .shift_remove(&other)
            .ok_or(Error::TransitionNotFound(other))?;
        self.sensitized.shift_remove(&other);
        self.to_deactivate.shift_remove(&other);

        for arc_id in merged.in_arcs.iter().chain(&merged.out_arcs).copied() {
            let Some(arc) = self.arcs.get(&arc_id) else {
                continue;
            };
            let (place, color, direction) = (arc.place(), arc.color(), arc.direction());
            let (from, to) = match direction {
                ArcDirection::Input => (Node::Place(place), Node::Transition(keep)),
                ArcDirection::Output => (Node::Transition(keep), Node::Place(place)),
            };
            if self.find_arc(from, to, color).is_some() {
                self.arcs.shift_remove(&arc_id);
                if let Some(place) = self.places.get_mut(&place) {
                    place.in_arcs.retain(|a| *a != arc_id);
                    place.out_arcs.retain(|a| *a != arc_id);
                }
                continue;
            }
            if let Some(arc) = self.arcs.get_mut(&arc_id) {
                arc.retarget(keep);
            }
            let target = &mut self.transitions[&keep];
            match direction {
                ArcDirection::Input => target.in_arcs.push(arc_id),
                ArcDirection::Output => target.out_arcs.push(arc_id),
            }
        }

        let target = &mut self.transitions[&keep];
        for action in merged.actions {
            if !target.actions.contains(&action) {
                target.actions.push(action);
            }
        }
        if target.trigger == Trigger::Static {
            target.trigger = merged.trigger;
        }
        if target.wait_for_child.is_none() {
            target.wait_for_child = merged.wait_for_child;
        }
        debug!(keep = %keep, merged = %other, "merged transitions");
        Ok(())
    }

    pub fn nb_colors(&self) -> u16 {
        self.nb_colors
    }

    /// Grow the number of color channels; shrinking is rejected
    pub fn change_nb_of_colors(&mut self, nb_colors: u16) -> Result<()> {
        if nb_colors < self.nb_colors {
            return Err(Error::InvalidOperation(format!(
                "cannot reduce colors from {} to {}",
                self.nb_colors, nb_colors
            )));
        }
        self.nb_colors = nb_colors;
        for place in self.places.values_mut() {
            place.resize_colors(nb_colors);
        }
        Ok(())
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Adopt a child net; its clock follows this net once launched
    pub fn add_child(&mut self, mut child: PetriNet) -> NetId {
        let id = NetId::new(self.next_child);
        self.next_child += 1;
        child.id = id;
        child.parent = Some(self.id);
        self.children.insert(id, child);
        id
    }

    pub fn child(&self, id: NetId) -> Option<&PetriNet> {
        self.children.get(&id)
    }

    pub fn child_mut(&mut self, id: NetId) -> Option<&mut PetriNet> {
        self.children.get_mut(&id)
    }

    pub fn is_child_active(&self, id: NetId) -> bool {
        self.active_children.contains(&id)
    }

    fn launch_child(&mut self, net: NetId, lateness: Date) -> Result<()> {
        let now = self.current_time;
        let child = self.children.get_mut(&net).ok_or(Error::NetNotFound(net))?;
        match child.start_at(now, lateness) {
            Ok(()) => {
                debug!(net = %net, now, "launched child net");
                self.active_children.insert(net);
            }
            Err(e) => {
                warn!(net = %net, error = %e, "child net failed to start");
                child.stop();
                self.outbox.push(NetEvent::ChildFailed {
                    net,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }

    fn stop_child(&mut self, net: NetId) -> Result<()> {
        let child = self.children.get_mut(&net).ok_or(Error::NetNotFound(net))?;
        child.stop();
        self.active_children.shift_remove(&net);
        debug!(net = %net, "stopped child net");
        Ok(())
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Put `n` tokens in a place, activating its outgoing arcs of that color when
    /// the place was empty for it
    pub fn produce_tokens(
        &mut self,
        place: PlaceId,
        n: usize,
        color: Color,
        time: Date,
    ) -> Result<()> {
        let crossed = self
            .places
            .get_mut(&place)
            .ok_or(Error::PlaceNotFound(place))?
            .produce(n, color, time)?;
        if crossed {
            let activation = self.current_time - time;
            let arcs = self.places[&place].out_arcs.clone();
            for arc in arcs {
                if self.arcs.get(&arc).is_some_and(|a| a.color() == color) {
                    self.activate_arc(arc, activation)?;
                }
            }
        }
        Ok(())
    }

    /// Take `n` tokens from a place, returning the last removed token's time
    pub fn consume_tokens(&mut self, place: PlaceId, n: usize, color: Color) -> Result<Date> {
        let p = self
            .places
            .get_mut(&place)
            .ok_or(Error::PlaceNotFound(place))?;
        let time = p.consume(n, color)?;
        if p.nb_tokens(color) == 0 {
            let arcs = p.out_arcs.clone();
            for arc in arcs {
                let Some(a) = self.arcs.get_mut(&arc) else {
                    continue;
                };
                if a.color() == color && a.is_active() {
                    a.set_inactive();
                    let transition = a.transition();
                    self.invalidate(transition);
                }
            }
        }
        Ok(time)
    }

    fn activate_arc(&mut self, arc: ArcId, date: Date) -> Result<()> {
        let a = self.arcs.get_mut(&arc).ok_or(Error::ArcNotFound(arc))?;
        a.set_active(date);
        let transition = a.transition();
        trace!(arc = %arc, date, "arc active");
        if self.are_all_in_going_arcs_active(transition) {
            self.schedule(transition)?;
        }
        Ok(())
    }

    /// Drop every pending action of a transition that lost an incoming arc
    fn invalidate(&mut self, transition: TransitionId) {
        if let Some(t) = self.transitions.get_mut(&transition) {
            t.generation += 1;
            t.scheduled_start = None;
            let trigger = t.trigger;
            if self.sensitized.shift_remove(&transition) {
                if let Trigger::External(trigger) = trigger {
                    self.outbox.push(NetEvent::TriggerReady {
                        transition,
                        trigger,
                        ready: false,
                    });
                }
            }
        }
    }

    /// Queue the crossing window of a transition whose incoming arcs are all active
    fn schedule(&mut self, transition: TransitionId) -> Result<()> {
        let now = self.current_time;
        let t = self
            .transitions
            .get(&transition)
            .ok_or(Error::TransitionNotFound(transition))?;

        let mut start = Date::MIN;
        let mut end: Option<Date> = None;
        for arc in t.in_arcs.iter().filter_map(|a| self.arcs.get(a)) {
            if let Some(earliest) = arc.earliest() {
                start = start.max(earliest);
            }
            if let Some(latest) = arc.latest() {
                end = Some(end.map_or(latest, |e| e.min(latest)));
            }
        }
        if let Some(end) = end {
            if end < start {
                error!(transition = %transition, start, end, "empty crossing window");
                return Err(Error::IncoherentState(format!(
                    "{} has an empty crossing window [{}, {}]",
                    transition, start, end
                )));
            }
        }

        let generation = t.generation;
        let is_static = t.is_static();
        self.transitions[&transition].scheduled_start = Some(start);

        // a static transition would have crossed at the window start
        let elapsed = match end {
            _ if is_static && start < now => Some(now - start),
            Some(end) if end < now => Some(now - end),
            _ => None,
        };
        if let Some(lateness) = elapsed {
            trace!(transition = %transition, lateness, "accelerated crossing");
            self.accelerated.push_back(Accelerated {
                transition,
                generation,
                lateness,
            });
            return Ok(());
        }

        trace!(transition = %transition, start, ?end, "scheduled");
        self.queue
            .push(start, transition, ActionKind::Start, generation);
        if let Some(end) = end {
            self.queue.push(end, transition, ActionKind::End, generation);
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// False only while the transition waits on a running child net
    pub fn could_be_sensitized(&self, transition: TransitionId) -> bool {
        self.transitions
            .get(&transition)
            .and_then(|t| t.wait_for_child)
            .map_or(true, |net| !self.active_children.contains(&net))
    }

    pub fn are_all_in_going_arcs_active(&self, transition: TransitionId) -> bool {
        self.transitions.get(&transition).is_some_and(|t| {
            t.in_arcs
                .iter()
                .all(|a| self.arcs.get(a).is_some_and(Arc::is_active))
        })
    }

    pub fn is_sensitized(&self, transition: TransitionId) -> bool {
        self.sensitized.contains(&transition)
    }

    pub fn sensitized(&self) -> impl Iterator<Item = TransitionId> + '_ {
        self.sensitized.iter().copied()
    }

    pub fn nb_pending_actions(&self) -> usize {
        self.queue.len()
    }

    /// Earliest pending action
    pub fn top_action(&self) -> Result<&PriorityTransitionAction> {
        self.queue
            .top()
            .ok_or_else(|| Error::IncoherentState("the action queue is empty".into()))
    }

    /// Remove the earliest pending action
    pub fn remove_top_action(&mut self) -> Result<PriorityTransitionAction> {
        self.queue
            .pop()
            .ok_or_else(|| Error::IncoherentState("the action queue is empty".into()))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_time(&self) -> Date {
        self.current_time
    }

    pub fn start_offset(&self) -> Date {
        self.start_offset
    }

    /// Make `start` behave as if the net had already run for `offset` ms
    pub fn set_start_offset(&mut self, offset: Date) {
        self.start_offset = offset;
    }

    /// Take every published event
    pub fn drain_events(&mut self) -> Vec<NetEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Reset the marking and put one token in the start place at date 0
    pub fn start(&mut self) -> Result<()> {
        self.start_at(0, 0)
    }

    /// Reset the marking and put one token in the start place at `now`
    ///
    /// The token is `lateness` plus the start offset late, so windows that elapsed
    /// before it are crossed on the first step.
    pub fn start_at(&mut self, now: Date, lateness: Date) -> Result<()> {
        self.stop();
        for place in self.places.values_mut() {
            place.clear();
        }
        for arc in self.arcs.values_mut() {
            arc.set_inactive();
        }
        for t in self.transitions.values_mut() {
            t.generation += 1;
            t.scheduled_start = None;
        }
        self.stimuli.clear();
        self.ignore_events = false;
        self.to_deactivate.clear();
        self.current_time = now;
        self.running = true;
        debug!(net = %self.id, now, offset = self.start_offset, "net started");
        let result = self.produce_tokens(
            self.start_place,
            1,
            Color::DEFAULT,
            lateness + self.start_offset,
        );
        if result.is_err() {
            self.stop();
        }
        result
    }

    /// Tear down the scheduler state; the marking is kept for inspection
    pub fn stop(&mut self) {
        self.running = false;
        self.queue.clear();
        self.sensitized.clear();
        self.accelerated.clear();
        let active: Vec<NetId> = self.active_children.drain(..).collect();
        for net in active {
            if let Some(child) = self.children.get_mut(&net) {
                child.stop();
            }
        }
    }

    /// Inject one external stimulus for the next step, also seen by running children
    pub fn put_an_event(&mut self, trigger: TriggerId) {
        self.stimuli.insert(trigger);
        for net in &self.active_children {
            if let Some(child) = self.children.get_mut(net) {
                child.put_an_event(trigger);
            }
        }
    }

    /// Cross every sensitized transition on the next step, stimulus or not
    pub fn ignore_events_for_one_step(&mut self) {
        self.ignore_events = true;
    }

    /// Cross the transition as disposed as soon as it is sensitized
    pub fn deactivate_transition(&mut self, transition: TransitionId) -> Result<()> {
        if !self.transitions.contains_key(&transition) {
            return Err(Error::TransitionNotFound(transition));
        }
        self.to_deactivate.insert(transition);
        Ok(())
    }

    /// Advance the net to `now`
    ///
    /// Returns `false` once the end place holds a token; further calls do nothing
    /// until the net is started again. An [`Error::IncoherentState`] stops the net.
    pub fn make_one_step(&mut self, now: Date) -> Result<bool> {
        if !self.running {
            return Ok(false);
        }
        self.current_time = now;
        let result = self.step(now);
        if let Err(e) = &result {
            error!(net = %self.id, now, error = %e, "step failed, stopping net");
            self.stop();
        }
        result
    }

    fn step(&mut self, now: Date) -> Result<bool> {
        // Due actions
        while let Some(action) = self.queue.pop_due(now) {
            let id = action.transition;
            let Some(t) = self.transitions.get(&id) else {
                continue;
            };
            if t.generation != action.generation {
                continue;
            }
            match action.kind {
                ActionKind::Start => {
                    if !self.could_be_sensitized(id) {
                        trace!(transition = %id, "waiting on child net, start deferred");
                        self.queue
                            .push(now + 1, id, ActionKind::Start, action.generation);
                        continue;
                    }
                    let trigger = t.trigger;
                    if self.sensitized.insert(id) {
                        trace!(transition = %id, now, "sensitized");
                        if let Trigger::External(trigger) = trigger {
                            self.outbox.push(NetEvent::TriggerReady {
                                transition: id,
                                trigger,
                                ready: true,
                            });
                        }
                    }
                }
                ActionKind::End => {
                    if !self.are_all_in_going_arcs_active(id) {
                        return Err(Error::IncoherentState(format!(
                            "{} forced to cross with inactive arcs",
                            id
                        )));
                    }
                    let lateness = now - action.time;
                    self.cross_transition(id, CrossOutcome::Happened { lateness })?;
                }
            }
        }

        // Sensitized transitions
        let candidates: Vec<TransitionId> = self.sensitized.iter().copied().collect();
        for id in candidates {
            if !self.sensitized.contains(&id) {
                continue;
            }
            if !self.are_all_in_going_arcs_active(id) {
                self.invalidate(id);
                continue;
            }
            let Some(t) = self.transitions.get(&id) else {
                self.sensitized.shift_remove(&id);
                continue;
            };
            let overdue = now - t.scheduled_start.unwrap_or(now);
            let outcome = if self.to_deactivate.contains(&id) {
                Some(CrossOutcome::Disposed)
            } else {
                match t.trigger {
                    Trigger::Static => Some(CrossOutcome::Happened { lateness: overdue }),
                    Trigger::External(trigger) if self.stimuli.contains(&trigger) => {
                        Some(CrossOutcome::Happened { lateness: 0 })
                    }
                    Trigger::External(_) if self.ignore_events => {
                        Some(CrossOutcome::Happened { lateness: overdue })
                    }
                    Trigger::External(_) => None,
                }
            };
            if let Some(outcome) = outcome {
                self.cross_transition(id, outcome)?;
            }
        }

        self.stimuli.clear();
        self.ignore_events = false;

        // Accelerated transitions
        while let Some(acc) = self.accelerated.pop_front() {
            let Some(t) = self.transitions.get(&acc.transition) else {
                continue;
            };
            if t.generation != acc.generation {
                continue;
            }
            if !self.are_all_in_going_arcs_active(acc.transition) {
                return Err(Error::IncoherentState(format!(
                    "{} accelerated with inactive arcs",
                    acc.transition
                )));
            }
            self.cross_transition(
                acc.transition,
                CrossOutcome::Happened {
                    lateness: acc.lateness,
                },
            )?;
        }

        self.step_children(now);

        if self.places[&self.end_place].total_tokens() > 0 {
            debug!(net = %self.id, now, "end place reached");
            self.running = false;
            return Ok(false);
        }
        Ok(true)
    }

    fn step_children(&mut self, now: Date) {
        let active: Vec<NetId> = self.active_children.iter().copied().collect();
        for net in active {
            let Some(child) = self.children.get_mut(&net) else {
                continue;
            };
            let result = child.make_one_step(now);
            let events = child.drain_events();
            self.outbox.extend(events.into_iter().map(|event| NetEvent::Child {
                net,
                event: Box::new(event),
            }));
            match result {
                Ok(true) => {}
                Ok(false) => {
                    self.active_children.shift_remove(&net);
                    self.outbox.push(NetEvent::ChildFinished { net });
                }
                Err(e) => {
                    warn!(net = %net, error = %e, "child net failed");
                    self.active_children.shift_remove(&net);
                    self.outbox.push(NetEvent::ChildFailed {
                        net,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Consume the input tokens of a transition, run its hooks and produce its
    /// output tokens
    pub fn cross_transition(&mut self, id: TransitionId, outcome: CrossOutcome) -> Result<()> {
        self.sensitized.shift_remove(&id);
        self.to_deactivate.shift_remove(&id);
        let t = self.transition_mut(id)?;
        t.generation += 1;
        t.scheduled_start = None;
        let in_arcs = t.in_arcs.clone();
        let out_arcs = t.out_arcs.clone();
        let actions = t.actions.clone();

        let token_time = match outcome {
            CrossOutcome::Happened { lateness } => lateness.max(0),
            CrossOutcome::Disposed => 0,
        };
        debug!(transition = %id, now = self.current_time, ?outcome, "crossing");

        for arc in in_arcs {
            let a = self.arcs.get(&arc).ok_or(Error::ArcNotFound(arc))?;
            let (place, color) = (a.place(), a.color());
            self.consume_tokens(place, 1, color)?;
        }
        for action in actions {
            match action {
                TransitionAction::Notify(payload) => self.outbox.push(NetEvent::Crossed {
                    transition: id,
                    payload,
                    outcome,
                }),
                TransitionAction::LaunchChild(net) => self.launch_child(net, token_time)?,
                TransitionAction::StopChild(net) => self.stop_child(net)?,
            }
        }
        for arc in out_arcs {
            let a = self.arcs.get(&arc).ok_or(Error::ArcNotFound(arc))?;
            let (place, color) = (a.place(), a.color());
            self.produce_tokens(place, 1, color, token_time)?;
        }
        Ok(())
    }

    fn transition_mut(&mut self, id: TransitionId) -> Result<&mut Transition> {
        self.transitions
            .get_mut(&id)
            .ok_or(Error::TransitionNotFound(id))
    }

    fn check_color(&self, color: Color) -> Result<()> {
        if color.0 >= self.nb_colors {
            return Err(Error::InvalidColor {
                color,
                nb_colors: self.nb_colors,
            });
        }
        Ok(())
    }
}

impl Default for PetriNet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// start_place -> ts -> p -> te -> end_place, with `window` on p -> te
    fn chain(min: u64, max: Bound) -> (PetriNet, TransitionId, TransitionId, ArcId) {
        let mut net = PetriNet::new();
        let ts = net.create_transition();
        let te = net.create_transition();
        let p = net.create_place();
        let c = Color::DEFAULT;
        net.create_arc(Node::Place(net.start_place()), Node::Transition(ts), c)
            .unwrap();
        net.create_arc(Node::Transition(ts), Node::Place(p), c).unwrap();
        let arc = net.create_arc(Node::Place(p), Node::Transition(te), c).unwrap();
        net.create_arc(Node::Transition(te), Node::Place(net.end_place()), c)
            .unwrap();
        net.change_relative_time(arc, min, max).unwrap();
        net.add_extern_action(ts, TransitionAction::Notify(1)).unwrap();
        net.add_extern_action(te, TransitionAction::Notify(2)).unwrap();
        (net, ts, te, arc)
    }

    fn crossings(net: &mut PetriNet) -> Vec<(u64, CrossOutcome)> {
        net.drain_events()
            .into_iter()
            .filter_map(|e| match e {
                NetEvent::Crossed {
                    payload, outcome, ..
                } => Some((payload, outcome)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_arc_endpoints_validated() {
        let mut net = PetriNet::new();
        let t1 = net.create_transition();
        let t2 = net.create_transition();
        let p = net.create_place();
        assert!(matches!(
            net.create_arc(Node::Transition(t1), Node::Transition(t2), Color::DEFAULT),
            Err(Error::InvalidArc(_))
        ));
        assert!(matches!(
            net.create_arc(Node::Place(p), Node::Place(net.end_place()), Color::DEFAULT),
            Err(Error::InvalidArc(_))
        ));
        assert!(matches!(
            net.create_arc(Node::Place(p), Node::Transition(t1), Color(3)),
            Err(Error::InvalidColor { .. })
        ));
        assert_eq!(net.nb_arcs(), 0);
    }

    #[test]
    fn test_create_arc_returns_existing() {
        let mut net = PetriNet::new();
        let t = net.create_transition();
        let p = net.create_place();
        let a = net
            .create_arc(Node::Place(p), Node::Transition(t), Color::DEFAULT)
            .unwrap();
        let b = net
            .create_arc(Node::Place(p), Node::Transition(t), Color::DEFAULT)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(net.nb_arcs(), 1);
    }

    #[test]
    fn test_change_time_unknown_arc() {
        let mut net = PetriNet::new();
        assert!(matches!(
            net.change_relative_time(ArcId::new(99), 0, Bound::Infinite),
            Err(Error::ArcNotFound(_))
        ));
    }

    #[test]
    fn test_rejected_change_keeps_net_bounds() {
        let (mut net, _, _, arc) = chain(100, Bound::Finite(200));
        assert!(net.change_relative_time(arc, 200, Bound::Finite(200)).is_err());
        assert!(net.change_absolute_time(arc, 50, Bound::Finite(10)).is_err());
        let a = net.arc(arc).unwrap();
        assert_eq!(a.relative_min(), 100);
        assert_eq!(a.relative_max(), Bound::Finite(200));
        assert_eq!(a.absolute().min(), 0);
    }

    #[test]
    fn test_production_activates_arcs_once() {
        let mut net = PetriNet::with_colors(2);
        let p = net.create_place();
        let t1 = net.create_transition();
        let t2 = net.create_transition();
        let t3 = net.create_transition();
        let a1 = net
            .create_arc(Node::Place(p), Node::Transition(t1), Color(0))
            .unwrap();
        let a2 = net
            .create_arc(Node::Place(p), Node::Transition(t2), Color(0))
            .unwrap();
        let other = net
            .create_arc(Node::Place(p), Node::Transition(t3), Color(1))
            .unwrap();
        net.start().unwrap();
        let baseline = net.nb_pending_actions();

        net.produce_tokens(p, 1, Color(0), 0).unwrap();
        assert_eq!(net.arc(a1).unwrap().activation(), Some(0));
        assert_eq!(net.arc(a2).unwrap().activation(), Some(0));
        assert!(!net.arc(other).unwrap().is_active());
        assert_eq!(net.nb_pending_actions(), baseline + 2);

        net.produce_tokens(p, 1, Color(0), 30).unwrap();
        assert_eq!(net.arc(a1).unwrap().activation(), Some(0));
        assert_eq!(net.arc(a2).unwrap().activation(), Some(0));
        assert_eq!(net.nb_pending_actions(), baseline + 2);
        assert_eq!(net.place(p).unwrap().nb_tokens(Color(0)), 2);
    }

    #[test]
    fn test_consume_deactivates_when_empty() {
        let mut net = PetriNet::new();
        let p = net.create_place();
        let t = net.create_transition();
        let a = net
            .create_arc(Node::Place(p), Node::Transition(t), Color::DEFAULT)
            .unwrap();
        net.start().unwrap();
        net.produce_tokens(p, 2, Color::DEFAULT, 0).unwrap();
        net.consume_tokens(p, 1, Color::DEFAULT).unwrap();
        assert!(net.arc(a).unwrap().is_active());
        net.consume_tokens(p, 1, Color::DEFAULT).unwrap();
        assert!(!net.arc(a).unwrap().is_active());
        assert!(net.consume_tokens(p, 1, Color::DEFAULT).is_err());
    }

    #[test]
    fn test_step_returns_false_once_end_reached() {
        let (mut net, _, _, _) = chain(100, Bound::Infinite);
        net.start().unwrap();
        assert!(net.make_one_step(0).unwrap());
        assert!(net.make_one_step(50).unwrap());
        assert!(!net.make_one_step(100).unwrap());
        assert!(!net.is_running());
        assert_eq!(
            crossings(&mut net),
            vec![
                (1, CrossOutcome::Happened { lateness: 0 }),
                (2, CrossOutcome::Happened { lateness: 0 })
            ]
        );

        // Nothing more happens until the net is restarted
        assert!(!net.make_one_step(150).unwrap());
        assert!(net.drain_events().is_empty());

        net.start().unwrap();
        assert!(net.make_one_step(0).unwrap());
        assert!(!net.make_one_step(120).unwrap());
        assert_eq!(
            crossings(&mut net)[1],
            (2, CrossOutcome::Happened { lateness: 20 })
        );
    }

    #[test]
    fn test_start_offset_accelerates_elapsed_windows() {
        let (mut net, _, _, _) = chain(100, Bound::Infinite);
        net.set_start_offset(250);
        net.start().unwrap();
        assert!(!net.make_one_step(0).unwrap());
        assert_eq!(
            crossings(&mut net),
            vec![
                (1, CrossOutcome::Happened { lateness: 250 }),
                (2, CrossOutcome::Happened { lateness: 150 })
            ]
        );

        let (mut net, _, _, _) = chain(100, Bound::Infinite);
        net.set_start_offset(40);
        net.start().unwrap();
        assert!(net.make_one_step(0).unwrap());
        assert!(net.make_one_step(59).unwrap());
        assert!(!net.make_one_step(60).unwrap());
    }

    #[test]
    fn test_interactive_transition_waits_for_trigger() {
        let (mut net, _, te, _) = chain(100, Bound::Finite(300));
        net.set_trigger(te, Trigger::External(TriggerId::new(7))).unwrap();
        net.start().unwrap();
        assert!(net.make_one_step(0).unwrap());
        assert!(net.make_one_step(100).unwrap());
        assert!(net.is_sensitized(te));
        assert!(net.drain_events().contains(&NetEvent::TriggerReady {
            transition: te,
            trigger: TriggerId::new(7),
            ready: true
        }));

        // Wrong stimulus
        net.put_an_event(TriggerId::new(8));
        assert!(net.make_one_step(150).unwrap());

        net.put_an_event(TriggerId::new(7));
        assert!(!net.make_one_step(160).unwrap());
        assert_eq!(
            crossings(&mut net),
            vec![(2, CrossOutcome::Happened { lateness: 0 })]
        );
    }

    #[test]
    fn test_stimulus_before_window_is_ignored() {
        let (mut net, _, te, _) = chain(100, Bound::Finite(300));
        net.set_trigger(te, Trigger::External(TriggerId::new(7))).unwrap();
        net.start().unwrap();
        net.make_one_step(0).unwrap();
        net.put_an_event(TriggerId::new(7));
        assert!(net.make_one_step(50).unwrap());
        assert!(net.make_one_step(100).unwrap());
    }

    #[test]
    fn test_interactive_transition_forced_at_max() {
        let (mut net, _, te, _) = chain(100, Bound::Finite(300));
        net.set_trigger(te, Trigger::External(TriggerId::new(7))).unwrap();
        net.start().unwrap();
        net.make_one_step(0).unwrap();
        net.make_one_step(200).unwrap();
        assert!(!net.make_one_step(320).unwrap());
        let crossed = crossings(&mut net);
        assert_eq!(crossed[1], (2, CrossOutcome::Happened { lateness: 20 }));
    }

    #[test]
    fn test_ignore_events_for_one_step() {
        let (mut net, _, te, _) = chain(100, Bound::Finite(300));
        net.set_trigger(te, Trigger::External(TriggerId::new(7))).unwrap();
        net.start().unwrap();
        net.make_one_step(0).unwrap();
        net.make_one_step(100).unwrap();
        net.ignore_events_for_one_step();
        assert!(!net.make_one_step(130).unwrap());
        assert_eq!(
            crossings(&mut net)[1],
            (2, CrossOutcome::Happened { lateness: 30 })
        );
    }

    #[test]
    fn test_deactivated_transition_is_disposed() {
        let (mut net, _, te, _) = chain(100, Bound::Finite(300));
        net.set_trigger(te, Trigger::External(TriggerId::new(7))).unwrap();
        net.start().unwrap();
        net.make_one_step(0).unwrap();
        net.deactivate_transition(te).unwrap();
        assert!(!net.make_one_step(100).unwrap());
        assert_eq!(crossings(&mut net)[1], (2, CrossOutcome::Disposed));
    }

    #[test]
    fn test_empty_queue_is_incoherent() {
        let mut net = PetriNet::new();
        assert!(net.top_action().unwrap_err().is_incoherent());
        assert!(net.remove_top_action().unwrap_err().is_incoherent());
    }

    #[test]
    fn test_empty_window_is_incoherent() {
        let (mut net, ts, _, _) = chain(100, Bound::Infinite);
        let first = net.transition(ts).unwrap().in_arcs()[0];
        net.change_relative_time(first, 100, Bound::Infinite).unwrap();
        net.change_absolute_time(first, 0, Bound::Finite(50)).unwrap();
        assert!(net.start().unwrap_err().is_incoherent());
    }

    #[test]
    fn test_end_with_inactive_arc_stops_the_net() {
        let (mut net, _, te, _) = chain(100, Bound::Finite(300));
        net.start().unwrap();
        assert!(net.make_one_step(0).unwrap());
        // te is already queued for [100, 300) when it gains an input that never fills
        let q = net.create_place();
        net.create_arc(Node::Place(q), Node::Transition(te), Color::DEFAULT)
            .unwrap();
        assert!(!net.are_all_in_going_arcs_active(te));

        let err = net.make_one_step(320).unwrap_err();
        assert!(err.is_incoherent());
        assert!(!net.is_running());
        assert!(!net.make_one_step(340).unwrap());
    }

    #[test]
    fn test_merge_transitions_redirects_arcs() {
        let mut net = PetriNet::new();
        let a = net.create_transition();
        let b = net.create_transition();
        let p = net.create_place();
        let q = net.create_place();
        net.create_arc(Node::Place(p), Node::Transition(a), Color::DEFAULT)
            .unwrap();
        net.create_arc(Node::Place(p), Node::Transition(b), Color::DEFAULT)
            .unwrap();
        net.create_arc(Node::Transition(b), Node::Place(q), Color::DEFAULT)
            .unwrap();
        net.add_extern_action(b, TransitionAction::Notify(5)).unwrap();
        net.set_trigger(b, Trigger::External(TriggerId::new(5))).unwrap();

        net.merge_transitions(a, b).unwrap();

        assert!(net.transition(b).is_none());
        assert_eq!(net.nb_transitions(), 1);
        // duplicate p -> a dropped, b -> q redirected
        assert_eq!(net.nb_arcs(), 2);
        let merged = net.transition(a).unwrap();
        assert_eq!(merged.in_arcs().len(), 1);
        assert_eq!(merged.out_arcs().len(), 1);
        assert_eq!(merged.payloads().collect::<Vec<_>>(), vec![5]);
        assert_eq!(merged.trigger(), Trigger::External(TriggerId::new(5)));
        assert_eq!(net.place(p).unwrap().out_arcs().len(), 1);
        assert!(net
            .find_arc(Node::Transition(a), Node::Place(q), Color::DEFAULT)
            .is_some());
    }

    #[test]
    fn test_delete_place_removes_arcs() {
        let (mut net, ts, _, arc) = chain(0, Bound::Infinite);
        let p = net.arc(arc).unwrap().place();
        net.delete_place(p).unwrap();
        assert!(net.arc(arc).is_none());
        assert!(net.transition(ts).unwrap().out_arcs().is_empty());
        assert!(net.delete_place(net.start_place()).is_err());
    }

    #[test]
    fn test_delete_transition_removes_arcs() {
        let (mut net, ts, te, arc) = chain(0, Bound::Infinite);
        let p = net.arc(arc).unwrap().place();
        net.delete_transition(te).unwrap();
        assert!(net.transition(te).is_none());
        assert!(net.arc(arc).is_none());
        assert_eq!(net.nb_arcs(), 2);
        assert!(net.place(p).unwrap().out_arcs().is_empty());
        assert!(net.transition(ts).is_some());
        assert!(net.delete_transition(te).is_err());
    }

    #[test]
    fn test_merge_places_redirects_arcs() {
        let (mut net, ts, _, arc) = chain(0, Bound::Infinite);
        let p = net.arc(arc).unwrap().place();
        let q = net.create_place();
        let t = net.create_transition();
        let extra = net.create_arc(Node::Place(q), Node::Transition(t), Color::DEFAULT).unwrap();
        let dup = net.create_arc(Node::Transition(ts), Node::Place(q), Color::DEFAULT).unwrap();

        net.merge_places(p, q).unwrap();
        assert!(net.place(q).is_none());
        // ts -> q duplicated ts -> p
        assert!(net.arc(dup).is_none());
        assert_eq!(net.arc(extra).unwrap().place(), p);
        assert_eq!(net.place(p).unwrap().out_arcs().len(), 2);
        assert_eq!(net.transition(ts).unwrap().out_arcs().len(), 1);
        assert!(net.merge_places(p, net.end_place()).is_err());
    }

    #[test]
    fn test_colors_only_grow() {
        let mut net = PetriNet::new();
        let p = net.create_place();
        net.change_nb_of_colors(3).unwrap();
        assert_eq!(net.nb_colors(), 3);
        net.produce_tokens(p, 1, Color(2), 0).unwrap();
        assert!(net.change_nb_of_colors(2).is_err());
    }

    fn child_net(delay: u64) -> PetriNet {
        let (mut child, _, _, _) = chain(delay, Bound::Infinite);
        child.set_start_offset(0);
        child
    }

    #[test]
    fn test_parent_waits_for_child() {
        let (mut net, ts, te, _) = chain(0, Bound::Infinite);
        let child = net.add_child(child_net(200));
        net.add_extern_action(ts, TransitionAction::LaunchChild(child))
            .unwrap();
        net.set_wait_for_child(te, Some(child)).unwrap();
        assert_eq!(net.child(child).unwrap().parent(), Some(net.id()));

        net.start().unwrap();
        assert!(net.make_one_step(0).unwrap());
        assert!(net.is_child_active(child));
        assert!(net.make_one_step(100).unwrap());
        assert!(net.make_one_step(200).unwrap());
        assert!(!net.is_child_active(child));
        assert!(!net.make_one_step(250).unwrap());

        let events = net.drain_events();
        assert!(events.contains(&NetEvent::ChildFinished { net: child }));
        assert!(events.contains(&NetEvent::Child {
            net: child,
            event: Box::new(NetEvent::Crossed {
                transition: net.child(child).unwrap().transitions().nth(1).unwrap().id(),
                payload: 2,
                outcome: CrossOutcome::Happened { lateness: 0 },
            }),
        }));
    }

    #[test]
    fn test_child_failure_does_not_stop_parent() {
        let (mut net, ts, te, _) = chain(10, Bound::Infinite);
        let mut broken = child_net(100);
        let first = broken.transitions().next().unwrap().in_arcs()[0];
        broken
            .change_absolute_time(first, 0, Bound::Finite(5))
            .unwrap();
        broken.change_relative_time(first, 50, Bound::Infinite).unwrap();
        let child = net.add_child(broken);
        net.add_extern_action(ts, TransitionAction::LaunchChild(child))
            .unwrap();
        net.set_wait_for_child(te, Some(child)).unwrap();

        net.start().unwrap();
        assert!(net.make_one_step(0).unwrap());
        assert!(!net.is_child_active(child));
        assert!(matches!(
            net.drain_events().last(),
            Some(NetEvent::ChildFailed { .. })
        ));
        assert!(net.make_one_step(5).unwrap());
        assert!(!net.make_one_step(10).unwrap());
    }
}
