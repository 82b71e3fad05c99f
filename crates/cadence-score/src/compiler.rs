//! Scenario to Petri net compilation
//!
//! [`compile`] is a pure function of a scenario and a time offset: it never
//! touches the scenario and always produces the same net for the same input.
//!
//! The net is built in a fixed order, each step relying on the previous ones:
//! 1. a start and an end transition bracket the net, the end one anchored at the
//!    scenario duration
//! 2. events of processes with their own transitions are chained start to end,
//!    then every other event is anchored on the start transition
//! 3. Interval processes either merge their two transitions (equal dates) or get
//!    a place of their own, replacing the anchor of their end
//! 4. leaf transitions are closed on the end transition, and nested scenarios are
//!    compiled into child nets
//! 5. events waiting for a condition are made interactive

use crate::error::{Error, Result};
use crate::identity::{EventId, ProcessId};
use crate::process::ProcessKind;
use crate::scenario::Scenario;
use cadence_petri::{
    ArcId, Bound, Color, Date, NetId, Node, PetriNet, PlaceId, TransitionAction, TransitionId,
    Trigger, TriggerId,
};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

/// Where each part of a scenario ended up in its net
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphIndex {
    start: Option<TransitionId>,
    end: Option<TransitionId>,
    events: IndexMap<EventId, TransitionId>,
    /// Transitions fused away, mapped to the one that absorbed them
    merged: IndexMap<TransitionId, TransitionId>,
    /// Arc carrying the duration of each process into its end transition
    process_arcs: IndexMap<ProcessId, ArcId>,
    triggers: IndexMap<EventId, TriggerId>,
    children: IndexMap<NetId, (ProcessId, GraphIndex)>,
}

impl GraphIndex {
    pub fn start_transition(&self) -> Option<TransitionId> {
        self.start
    }

    pub fn end_transition(&self) -> Option<TransitionId> {
        self.end
    }

    /// Transition of an event, following merges
    pub fn transition(&self, event: EventId) -> Option<TransitionId> {
        self.events.get(&event).map(|t| self.resolve(*t))
    }

    fn resolve(&self, mut transition: TransitionId) -> TransitionId {
        while let Some(next) = self.merged.get(&transition) {
            transition = *next;
        }
        transition
    }

    pub fn is_merged(&self, transition: TransitionId) -> bool {
        self.merged.contains_key(&transition)
    }

    pub fn process_arc(&self, process: ProcessId) -> Option<ArcId> {
        self.process_arcs.get(&process).copied()
    }

    pub fn trigger(&self, event: EventId) -> Option<TriggerId> {
        self.triggers.get(&event).copied()
    }

    /// Event waiting on `trigger`
    pub fn trigger_event(&self, trigger: TriggerId) -> Option<EventId> {
        self.triggers
            .iter()
            .find(|(_, t)| **t == trigger)
            .map(|(e, _)| *e)
    }

    pub fn child(&self, net: NetId) -> Option<(ProcessId, &GraphIndex)> {
        self.children.get(&net).map(|(p, index)| (*p, index))
    }

    pub fn children(&self) -> impl Iterator<Item = (NetId, ProcessId, &GraphIndex)> {
        self.children.iter().map(|(n, (p, index))| (*n, *p, index))
    }

    /// Child net running a nested scenario process
    pub fn child_net(&self, process: ProcessId) -> Option<NetId> {
        self.children
            .iter()
            .find(|(_, (p, _))| *p == process)
            .map(|(n, _)| *n)
    }
}

/// A compiled scenario: its net and how to read it
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub net: PetriNet,
    pub index: GraphIndex,
}

/// Build the net of `scenario`, as if it had already run for `offset` ms
///
/// Events dated before the offset are compiled as plain timers so that they
/// catch up on the first step.
pub fn compile(scenario: &Scenario, offset: u32) -> Result<CompiledGraph> {
    let mut next_trigger = 0;
    let (mut net, index) = Builder::new(scenario, offset).build(&mut next_trigger)?;
    net.set_start_offset(offset as Date);
    debug!(
        places = net.nb_places(),
        transitions = net.nb_transitions(),
        arcs = net.nb_arcs(),
        offset,
        "scenario compiled"
    );
    Ok(CompiledGraph { net, index })
}

/// Every event comes after the start event, before the end event and after the
/// start of each of its processes; a cycle would leave a net that never ends
fn check_acyclic(scenario: &Scenario) -> Result<()> {
    let (first, last) = (scenario.start_event(), scenario.end_event());
    let mut edges: Vec<(EventId, EventId)> = scenario
        .processes()
        .map(|p| (p.start_event(), p.end_event()))
        .collect();
    for event in scenario.events().map(|e| e.id()) {
        if event != first {
            edges.push((first, event));
        }
        if event != last {
            edges.push((event, last));
        }
    }

    let mut incoming: IndexMap<EventId, usize> =
        scenario.events().map(|e| (e.id(), 0)).collect();
    for (_, to) in &edges {
        if let Some(n) = incoming.get_mut(to) {
            *n += 1;
        }
    }
    let mut ready: Vec<EventId> = incoming
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(e, _)| *e)
        .collect();
    let mut ordered = 0;
    while let Some(event) = ready.pop() {
        ordered += 1;
        for (_, to) in edges.iter().filter(|(from, _)| *from == event) {
            if let Some(n) = incoming.get_mut(to) {
                *n -= 1;
                if *n == 0 {
                    ready.push(*to);
                }
            }
        }
    }

    if ordered == incoming.len() {
        return Ok(());
    }
    let stuck = incoming
        .iter()
        .filter(|(e, n)| **n > 0 && **e != last)
        .map(|(e, _)| e.to_string())
        .collect::<Vec<_>>();
    Err(Error::Validation(format!(
        "processes form a cycle through {}",
        stuck.join(", ")
    )))
}

struct Builder<'a> {
    scenario: &'a Scenario,
    offset: u32,
    net: PetriNet,
    index: GraphIndex,
}

const COLOR: Color = Color::DEFAULT;

impl<'a> Builder<'a> {
    fn new(scenario: &'a Scenario, offset: u32) -> Self {
        Self {
            scenario,
            offset,
            net: PetriNet::with_colors(scenario.config().nb_colors()),
            index: GraphIndex::default(),
        }
    }

    fn build(mut self, next_trigger: &mut u64) -> Result<(PetriNet, GraphIndex)> {
        check_acyclic(self.scenario)?;
        let (start, end) = self.brackets()?;
        self.chain_processes(start)?;
        self.anchor_events(start)?;
        self.intervals(start, end)?;
        self.close(end)?;
        self.notify()?;
        self.nested(next_trigger)?;
        self.interactive(next_trigger)?;
        Ok((self.net, self.index))
    }

    /// `from -> place -> to`, the arc into `to` carrying `[min, inf)`
    fn link(&mut self, from: TransitionId, to: TransitionId, min: u32) -> Result<ArcId> {
        let place = self.net.create_place();
        self.net
            .create_arc(Node::Transition(from), Node::Place(place), COLOR)?;
        let arc = self
            .net
            .create_arc(Node::Place(place), Node::Transition(to), COLOR)?;
        self.net
            .change_relative_time(arc, min as u64, Bound::Infinite)?;
        Ok(arc)
    }

    fn brackets(&mut self) -> Result<(TransitionId, TransitionId)> {
        let start = self.net.create_transition();
        let end = self.net.create_transition();
        let (start_place, end_place) = (self.net.start_place(), self.net.end_place());
        self.net
            .create_arc(Node::Place(start_place), Node::Transition(start), COLOR)?;
        self.net
            .create_arc(Node::Transition(end), Node::Place(end_place), COLOR)?;
        self.link(start, end, self.scenario.config().duration())?;

        self.index.start = Some(start);
        self.index.end = Some(end);
        self.index.events.insert(self.scenario.start_event(), start);
        self.index.events.insert(self.scenario.end_event(), end);
        Ok((start, end))
    }

    /// Transition of an event, anchored on `start` at its date when new
    fn ensure(&mut self, start: TransitionId, event: EventId) -> Result<TransitionId> {
        if let Some(t) = self.index.transition(event) {
            return Ok(t);
        }
        let date = self.scenario.event(event)?.date();
        let t = self.net.create_transition();
        self.link(start, t, date)?;
        self.index.events.insert(event, t);
        trace!(event = %event, transition = %t, date, "event compiled");
        Ok(t)
    }

    fn chain_processes(&mut self, start: TransitionId) -> Result<()> {
        let scenario = self.scenario;
        for process in scenario.processes().filter(|p| !p.is_interval()) {
            let ts = self.ensure(start, process.start_event())?;
            let gap = self.gap(process.start_event(), process.end_event())?;
            let te = match self.index.transition(process.end_event()) {
                Some(te) => te,
                None => {
                    let te = self.net.create_transition();
                    self.index.events.insert(process.end_event(), te);
                    te
                }
            };
            let arc = self.link(ts, te, gap)?;
            self.index.process_arcs.insert(process.id(), arc);
        }
        Ok(())
    }

    fn anchor_events(&mut self, start: TransitionId) -> Result<()> {
        let scenario = self.scenario;
        for event in scenario.events() {
            self.ensure(start, event.id())?;
        }
        Ok(())
    }

    fn gap(&self, from: EventId, to: EventId) -> Result<u32> {
        let from = self.scenario.event(from)?.date();
        let to = self.scenario.event(to)?.date();
        Ok(to.saturating_sub(from))
    }

    fn intervals(&mut self, start: TransitionId, end: TransitionId) -> Result<()> {
        let scenario = self.scenario;
        for process in scenario.processes().filter(|p| p.is_interval()) {
            let ts = self.ensure(start, process.start_event())?;
            let te = self.ensure(start, process.end_event())?;
            if ts == te {
                continue;
            }
            let gap = self.gap(process.start_event(), process.end_event())?;
            if gap == 0 {
                self.remove_places_between(ts, te)?;
                self.net.merge_transitions(ts, te)?;
                self.index.merged.insert(te, ts);
                for t in self.index.events.values_mut() {
                    if *t == te {
                        *t = ts;
                    }
                }
                if self.index.start == Some(te) {
                    self.index.start = Some(ts);
                }
                if self.index.end == Some(te) {
                    self.index.end = Some(ts);
                }
                trace!(process = %process.id(), transition = %ts, "interval merged");
                continue;
            }
            let arc = self.link(ts, te, gap)?;
            self.index.process_arcs.insert(process.id(), arc);
            if te != end {
                let keep = self.net.arc(arc).map(|a| a.place());
                self.remove_anchors(start, te, keep)?;
            }
        }
        Ok(())
    }

    /// Places fed only by `from` and feeding only `to`, in either direction
    fn remove_places_between(&mut self, a: TransitionId, b: TransitionId) -> Result<()> {
        let mut doomed = IndexSet::new();
        for (from, to) in [(a, b), (b, a)] {
            doomed.extend(self.places_between(from, to, None));
        }
        for place in doomed {
            self.net.delete_place(place)?;
        }
        Ok(())
    }

    /// Anchors of `to` on the start transition, now redundant with an interval
    fn remove_anchors(
        &mut self,
        start: TransitionId,
        to: TransitionId,
        keep: Option<PlaceId>,
    ) -> Result<()> {
        for place in self.places_between(start, to, keep) {
            self.net.delete_place(place)?;
        }
        Ok(())
    }

    fn places_between(
        &self,
        from: TransitionId,
        to: TransitionId,
        keep: Option<PlaceId>,
    ) -> Vec<PlaceId> {
        let Some(t) = self.net.transition(to) else {
            return Vec::new();
        };
        t.in_arcs()
            .iter()
            .filter_map(|a| self.net.arc(*a))
            .map(|a| a.place())
            .filter(|p| Some(*p) != keep)
            .filter(|p| {
                self.net.place(*p).is_some_and(|place| {
                    let fed_by = |arcs: &[ArcId], t: TransitionId| {
                        !arcs.is_empty()
                            && arcs
                                .iter()
                                .filter_map(|a| self.net.arc(*a))
                                .all(|a| a.transition() == t)
                    };
                    fed_by(place.in_arcs(), from) && fed_by(place.out_arcs(), to)
                })
            })
            .collect()
    }

    /// Give every transition without successor a way to the end
    fn close(&mut self, end: TransitionId) -> Result<()> {
        let leaves: IndexSet<TransitionId> = self
            .index
            .events
            .values()
            .copied()
            .filter(|t| *t != end)
            .filter(|t| {
                self.net
                    .transition(*t)
                    .is_some_and(|t| t.out_arcs().is_empty())
            })
            .collect();
        for t in leaves {
            self.link(t, end, 0)?;
        }
        Ok(())
    }

    /// Every event transition reports its crossing, except the end one which the
    /// scenario handles when the net finishes
    fn notify(&mut self) -> Result<()> {
        let end_event = self.scenario.end_event();
        let events: Vec<(EventId, TransitionId)> = self
            .index
            .events
            .iter()
            .filter(|(e, _)| **e != end_event)
            .map(|(e, t)| (*e, *t))
            .collect();
        for (event, t) in events {
            self.net
                .add_extern_action(t, TransitionAction::Notify(event.raw()))?;
        }
        Ok(())
    }

    fn nested(&mut self, next_trigger: &mut u64) -> Result<()> {
        let scenario = self.scenario;
        for process in scenario.processes() {
            let ProcessKind::Scenario(nested) = process.kind() else {
                continue;
            };
            let start_date = scenario.event(process.start_event())?.date();
            let offset = self.offset.saturating_sub(start_date);
            let (child, child_index) = Builder::new(nested, offset).build(next_trigger)?;
            let net = self.net.add_child(child);

            let (Some(ts), Some(te)) = (
                self.index.transition(process.start_event()),
                self.index.transition(process.end_event()),
            ) else {
                continue;
            };
            self.net
                .add_extern_action(ts, TransitionAction::LaunchChild(net))?;
            self.net
                .add_extern_action(te, TransitionAction::StopChild(net))?;
            self.net.set_wait_for_child(te, Some(net))?;
            self.index.children.insert(net, (process.id(), child_index));
            debug!(process = %process.id(), net = %net, "nested scenario compiled");
        }
        Ok(())
    }

    fn interactive(&mut self, next_trigger: &mut u64) -> Result<()> {
        let scenario = self.scenario;
        let interactive: Vec<EventId> = scenario
            .events()
            .filter(|e| e.is_interactive() && e.date() >= self.offset)
            .map(|e| e.id())
            .collect();
        for event in interactive {
            let Some(t) = self.index.transition(event) else {
                continue;
            };
            let trigger = TriggerId::new(*next_trigger);
            *next_trigger += 1;
            self.net.set_trigger(t, Trigger::External(trigger))?;
            self.net.set_wait_for_child(t, None)?;
            self.index.triggers.insert(event, trigger);

            let in_arcs: Vec<ArcId> = self
                .net
                .transition(t)
                .map(|t| t.in_arcs().to_vec())
                .unwrap_or_default();
            for arc in in_arcs {
                self.net.change_relative_time(arc, 0, Bound::Infinite)?;
            }
            for process in scenario.processes().filter(|p| p.end_event() == event) {
                let Some(arc) = self.index.process_arc(process.id()) else {
                    continue;
                };
                let (min, max) = window(process.duration_min(), process.duration_max());
                self.net.change_relative_time(arc, min, max)?;
            }
            trace!(event = %event, trigger = %trigger, "event made interactive");
        }
        Ok(())
    }
}

/// Arc window of a process duration; a rigid one is widened to one ms
fn window(min: u32, max: u32) -> (u64, Bound) {
    let (min, max) = (min as u64, max as u64);
    match max {
        0 => (min, Bound::Infinite),
        max if max <= min => (min, Bound::Finite(min + 1)),
        max => (min, Bound::Finite(max)),
    }
}
