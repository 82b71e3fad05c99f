//! Scenario - the editable score and its run loop
//!
//! A scenario owns its events, processes and conditions, keeps their dates
//! consistent through an [`EditionSolver`], and runs by compiling itself to a
//! Petri net that it steps on every tick.
//!
//! Structural edits mark the scenario stale: a run already in progress keeps its
//! net, and the next [`Scenario::start`] compiles again.

use crate::compiler::{self, CompiledGraph, GraphIndex};
use crate::condition::{Case, TimeCondition};
use crate::config::{ExecutionMode, ScenarioConfig};
use crate::error::{Error, Result};
use crate::event::{EventStatus, TimeEvent};
use crate::identity::{ConditionId, EventId, ProcessId};
use crate::notification::{Notification, NotificationKind};
use crate::process::{ProcessKind, TimeProcess};
use crate::solver::EditionSolver;
use crate::value::Value;
use cadence_csp::SolverConfig;
use cadence_petri::{CrossOutcome, Date, NetEvent, NetId, PetriNet, TransitionId, TriggerId};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, error, trace, warn};

/// What an incoming value asks the net to do
enum Stimulus {
    Trigger(TriggerId),
    /// Transition to dispose, in the net reached by following the child path
    Dispose(Vec<NetId>, TransitionId),
}

/// An interactive score
#[derive(Debug)]
pub struct Scenario {
    pub name: String,
    config: ScenarioConfig,
    events: IndexMap<EventId, TimeEvent>,
    processes: IndexMap<ProcessId, TimeProcess>,
    conditions: IndexMap<ConditionId, TimeCondition>,
    start_event: EventId,
    end_event: EventId,
    next_event: u64,
    next_process: u64,
    next_condition: u64,
    solver: EditionSolver,
    graph: Option<CompiledGraph>,
    compiled: bool,
    offset: u32,
    mute_recall: bool,
    /// Date reached by the last step, in ms from the scenario start
    position: u64,
    running: bool,
    notifications: Vec<Notification>,
}

fn solver_for(config: &ScenarioConfig) -> EditionSolver {
    EditionSolver::new(
        config.duration(),
        SolverConfig::with_node_limit(config.solver_node_limit()),
    )
}

impl Scenario {
    /// Create a scenario with its start event at 0 and its end event at the
    /// configured duration
    pub fn new(config: ScenarioConfig) -> Self {
        let start_event = EventId::new(0);
        let end_event = EventId::new(1);
        let duration = config.duration();
        let mut events = IndexMap::new();
        events.insert(start_event, TimeEvent::new(start_event, "start", 0));
        events.insert(end_event, TimeEvent::new(end_event, "end", duration));

        let mut scenario = Self {
            name: "scenario".to_string(),
            solver: solver_for(&config),
            config,
            events,
            processes: IndexMap::new(),
            conditions: IndexMap::new(),
            start_event,
            end_event,
            next_event: 2,
            next_process: 0,
            next_condition: 0,
            graph: None,
            compiled: false,
            offset: 0,
            mute_recall: false,
            position: 0,
            running: false,
            notifications: Vec::new(),
        };
        if let Err(e) = scenario.rebuild_solver() {
            // both boundary events fit the duration by construction
            error!(error = %e, "cannot register boundary events");
        }
        scenario
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Container duration in ms
    pub fn duration(&self) -> u32 {
        self.config.duration()
    }

    pub fn mode(&self) -> ExecutionMode {
        self.config.mode
    }

    pub fn start_event(&self) -> EventId {
        self.start_event
    }

    pub fn end_event(&self) -> EventId {
        self.end_event
    }

    pub fn event(&self, id: EventId) -> Result<&TimeEvent> {
        self.events.get(&id).ok_or(Error::EventNotFound(id))
    }

    pub fn time_process(&self, id: ProcessId) -> Result<&TimeProcess> {
        self.processes.get(&id).ok_or(Error::ProcessNotFound(id))
    }

    pub fn condition(&self, id: ConditionId) -> Result<&TimeCondition> {
        self.conditions
            .get(&id)
            .ok_or(Error::ConditionNotFound(id))
    }

    pub fn events(&self) -> impl Iterator<Item = &TimeEvent> {
        self.events.values()
    }

    pub fn processes(&self) -> impl Iterator<Item = &TimeProcess> {
        self.processes.values()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &TimeCondition> {
        self.conditions.values()
    }

    pub fn solver(&self) -> &EditionSolver {
        &self.solver
    }

    /// Net of the last compilation, kept until the next one
    pub fn graph(&self) -> Option<&CompiledGraph> {
        self.graph.as_ref()
    }

    /// Whether the net reflects every edit made so far
    pub fn is_compiled(&self) -> bool {
        self.compiled && self.graph.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Nested scenario of a process, for editing
    pub fn nested_mut(&mut self, process: ProcessId) -> Result<&mut Scenario> {
        self.mark_stale();
        self.processes
            .get_mut(&process)
            .ok_or(Error::ProcessNotFound(process))?
            .scenario_mut()
            .ok_or_else(|| Error::Validation(format!("{} is not a scenario", process)))
    }

    /// Take every published notification
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn is_loading(&self) -> bool {
        self.config.mode == ExecutionMode::Loading
    }

    fn mark_stale(&mut self) {
        self.compiled = false;
    }

    fn publish(&mut self, kind: NotificationKind, recall: bool) {
        if self.is_loading() || (recall && self.mute_recall) {
            return;
        }
        self.notifications
            .push(Notification::new(kind, self.position).with_recall(recall));
    }

    /// Switch mode; leaving [`ExecutionMode::Loading`] rebuilds the solver from
    /// the current model
    pub fn set_mode(&mut self, mode: ExecutionMode) -> Result<()> {
        let leaving = self.is_loading() && mode != ExecutionMode::Loading;
        self.config.mode = mode;
        if leaving {
            if let Err(e) = self.rebuild_solver() {
                self.config.mode = ExecutionMode::Loading;
                return Err(e);
            }
        }
        self.mark_stale();
        Ok(())
    }

    fn rebuild_solver(&mut self) -> Result<()> {
        let mut solver = solver_for(&self.config);
        for event in self.events.values() {
            let pinned = event.id() == self.start_event || event.id() == self.end_event;
            solver.add_variable(event.id(), event.date(), pinned)?;
        }
        for p in self.processes.values() {
            let (id, start, end) = (p.id(), p.start_event(), p.end_event());
            if p.is_interval() {
                solver.add_relation(id, start, end, p.duration_min(), p.duration_max())?;
            } else {
                solver.add_constraint(id, start, end, p.duration_min(), p.duration_max())?;
            }
        }
        self.solver = solver;
        self.sync_dates();
        debug!(
            events = self.events.len(),
            processes = self.processes.len(),
            "edition solver rebuilt"
        );
        Ok(())
    }

    /// Copy solved dates back to the events
    fn sync_dates(&mut self) {
        let mut changed = Vec::new();
        for (id, event) in self.events.iter_mut() {
            let Some(variable) = self.solver.variable(*id) else {
                continue;
            };
            match variable.update(self.solver.csp(), event) {
                Ok(true) => changed.push((*id, event.date())),
                Ok(false) => {}
                Err(e) => warn!(event = %id, error = %e, "solved date unreadable"),
            }
        }
        for (event, date) in changed {
            self.publish(NotificationKind::EventDateChanged { event, date }, false);
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn add_event(&mut self, name: impl Into<String>, date: u32) -> Result<EventId> {
        self.check_date(date)?;
        let id = EventId::new(self.next_event);
        if !self.is_loading() {
            self.solver.add_variable(id, date, false)?;
        }
        self.next_event += 1;
        self.events.insert(id, TimeEvent::new(id, name, date));
        self.mark_stale();
        debug!(event = %id, date, "event added");
        Ok(id)
    }

    /// Remove an event no process refers to any more
    pub fn remove_event(&mut self, id: EventId) -> Result<()> {
        let event = self.event(id)?;
        let (uses, condition) = (
            event.attached_as_start() + event.attached_as_end(),
            event.condition(),
        );
        if id == self.start_event || id == self.end_event {
            return Err(Error::Validation(format!("{} bounds the scenario", id)));
        }
        if uses > 0 {
            return Err(Error::Validation(format!(
                "{} is still used by {} process(es)",
                id, uses
            )));
        }
        if !self.is_loading() && !self.solver.remove_variable(id)? {
            return Err(Error::Validation(format!("{} is still constrained", id)));
        }
        if let Some(condition) = condition {
            if let Some(c) = self.conditions.get_mut(&condition) {
                c.remove_case(id);
            }
        }
        self.events.shift_remove(&id);
        self.mark_stale();
        debug!(event = %id, "event removed");
        Ok(())
    }

    pub fn set_event_mute(&mut self, id: EventId, mute: bool) -> Result<()> {
        self.events
            .get_mut(&id)
            .ok_or(Error::EventNotFound(id))?
            .mute = mute;
        self.mark_stale();
        Ok(())
    }

    fn check_date(&self, date: u32) -> Result<()> {
        if date > self.duration() {
            return Err(Error::Validation(format!(
                "date {} is beyond the duration {}",
                date,
                self.duration()
            )));
        }
        Ok(())
    }

    fn check_movable(&self, id: EventId, date: u32) -> Result<()> {
        let pinned = if id == self.start_event {
            Some(0)
        } else if id == self.end_event {
            Some(self.duration())
        } else {
            None
        };
        match pinned {
            Some(pinned) if pinned != date => Err(Error::Validation(format!(
                "{} bounds the scenario and cannot move",
                id
            ))),
            _ => Ok(()),
        }
    }

    /// Move an event; every event tied to it follows
    ///
    /// Dates are unchanged when the move fails.
    pub fn move_event(&mut self, id: EventId, date: u32) -> Result<()> {
        self.event(id)?;
        self.check_date(date)?;
        self.check_movable(id, date)?;
        if self.is_loading() {
            if let Some(event) = self.events.get_mut(&id) {
                event.set_date(date);
            }
        } else {
            self.solver.move_event(id, date)?;
            self.sync_dates();
        }
        self.mark_stale();
        Ok(())
    }

    // ========================================================================
    // Processes
    // ========================================================================

    /// Add a process between two existing events, the start not after the end
    pub fn add_process(
        &mut self,
        name: impl Into<String>,
        kind: ProcessKind,
        start: EventId,
        end: EventId,
    ) -> Result<ProcessId> {
        let start_date = self.event(start)?.date();
        let end_date = self.event(end)?.date();
        if start == end {
            return Err(Error::Validation(format!(
                "a process cannot start and end at {}",
                start
            )));
        }
        if start_date > end_date {
            return Err(Error::Validation(format!(
                "{} at {} comes after {} at {}",
                start, start_date, end, end_date
            )));
        }
        if end == self.start_event || start == self.end_event {
            return Err(Error::Validation(format!(
                "{} -> {} leaves the bounds of the scenario",
                start, end
            )));
        }
        if self.reaches(end, start) {
            return Err(Error::Validation(format!(
                "{} -> {} closes a cycle of processes",
                start, end
            )));
        }

        let id = ProcessId::new(self.next_process);
        if !self.is_loading() {
            if matches!(kind, ProcessKind::Interval) {
                self.solver.add_relation(id, start, end, 0, 0)?;
            } else {
                self.solver.add_constraint(id, start, end, 0, 0)?;
            }
            self.sync_dates();
        }
        self.next_process += 1;
        let kind_name = kind.name();
        self.processes
            .insert(id, TimeProcess::new(id, name, kind, start, end));
        if let Some(e) = self.events.get_mut(&start) {
            e.attach(true);
        }
        if let Some(e) = self.events.get_mut(&end) {
            e.attach(false);
        }
        self.mark_stale();
        debug!(process = %id, kind = kind_name, start = %start, end = %end, "process added");
        Ok(id)
    }

    /// Whether a chain of processes leads from `from` to `to`
    fn reaches(&self, from: EventId, to: EventId) -> bool {
        let mut seen = IndexSet::new();
        let mut stack = vec![from];
        while let Some(event) = stack.pop() {
            if event == to {
                return true;
            }
            if !seen.insert(event) {
                continue;
            }
            stack.extend(
                self.processes
                    .values()
                    .filter(|p| p.start_event() == event)
                    .map(|p| p.end_event()),
            );
        }
        false
    }

    pub fn remove_process(&mut self, id: ProcessId) -> Result<()> {
        let process = self.time_process(id)?;
        let (start, end) = (process.start_event(), process.end_event());
        if !self.is_loading() {
            self.solver.remove_process(id, start)?;
        }
        self.processes.shift_remove(&id);
        if let Some(e) = self.events.get_mut(&start) {
            e.detach(true);
        }
        if let Some(e) = self.events.get_mut(&end) {
            e.detach(false);
        }
        self.mark_stale();
        debug!(process = %id, "process removed");
        Ok(())
    }

    pub fn set_process_mute(&mut self, id: ProcessId, mute: bool) -> Result<()> {
        self.processes
            .get_mut(&id)
            .ok_or(Error::ProcessNotFound(id))?
            .mute = mute;
        Ok(())
    }

    /// Change the duration bounds of a process, 0 meaning unbounded for `max`
    ///
    /// Events may move to satisfy the new bounds; nothing changes on failure.
    pub fn set_limits(&mut self, id: ProcessId, min: u32, max: u32) -> Result<()> {
        TimeProcess::validate_limits(min, max)?;
        self.time_process(id)?;
        if !self.is_loading() {
            self.solver.limit_process(id, min, max)?;
            self.sync_dates();
        }
        if let Some(process) = self.processes.get_mut(&id) {
            process.set_limits(min, max)?;
        }
        self.mark_stale();
        Ok(())
    }

    /// Move both events of a process
    ///
    /// A rigid process takes the new length as its duration.
    pub fn move_process(&mut self, id: ProcessId, start: u32, end: u32) -> Result<()> {
        let process = self.time_process(id)?;
        let (start_event, end_event) = (process.start_event(), process.end_event());
        let rigid = process.is_rigid() && !process.is_interval();
        if start > end {
            return Err(Error::Validation(format!(
                "cannot move {} to [{}, {}]",
                id, start, end
            )));
        }
        self.check_date(end)?;
        self.check_movable(start_event, start)?;
        self.check_movable(end_event, end)?;

        if self.is_loading() {
            for (event, date) in [(start_event, start), (end_event, end)] {
                if let Some(e) = self.events.get_mut(&event) {
                    e.set_date(date);
                }
            }
        } else {
            self.solver.move_process(id, start, end, rigid)?;
            self.sync_dates();
        }
        if rigid {
            if let Some(process) = self.processes.get_mut(&id) {
                process.set_limits(end - start, end - start)?;
            }
        }
        self.mark_stale();
        Ok(())
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    pub fn add_condition(&mut self, name: impl Into<String>) -> ConditionId {
        let id = ConditionId::new(self.next_condition);
        self.next_condition += 1;
        self.conditions.insert(id, TimeCondition::new(id, name));
        self.mark_stale();
        id
    }

    /// Remove a condition; its events go back to plain timers
    pub fn remove_condition(&mut self, id: ConditionId) -> Result<()> {
        let condition = self
            .conditions
            .shift_remove(&id)
            .ok_or(Error::ConditionNotFound(id))?;
        for event in condition.events() {
            if let Some(e) = self.events.get_mut(&event) {
                e.set_condition(None);
            }
        }
        self.mark_stale();
        Ok(())
    }

    /// Make an event wait for `condition`
    pub fn add_case(&mut self, condition: ConditionId, event: EventId, case: Case) -> Result<()> {
        let current = self.event(event)?.condition();
        if !self.conditions.contains_key(&condition) {
            return Err(Error::ConditionNotFound(condition));
        }
        if current.is_some_and(|c| c != condition) {
            return Err(Error::Validation(format!(
                "{} already waits for another condition",
                event
            )));
        }
        if let Some(c) = self.conditions.get_mut(&condition) {
            c.add_case(event, case)?;
        }
        if let Some(e) = self.events.get_mut(&event) {
            e.set_condition(Some(condition));
        }
        self.mark_stale();
        Ok(())
    }

    pub fn remove_case(&mut self, condition: ConditionId, event: EventId) -> Result<()> {
        let c = self
            .conditions
            .get_mut(&condition)
            .ok_or(Error::ConditionNotFound(condition))?;
        c.remove_case(event).ok_or(Error::EventNotFound(event))?;
        if let Some(e) = self.events.get_mut(&event) {
            e.set_condition(None);
        }
        self.mark_stale();
        Ok(())
    }

    /// Replace the expressions of a case
    pub fn set_case(&mut self, condition: ConditionId, event: EventId, case: Case) -> Result<()> {
        let c = self
            .conditions
            .get_mut(&condition)
            .ok_or(Error::ConditionNotFound(condition))?;
        *c.case_mut(event)? = case;
        Ok(())
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Build a fresh net from the current model
    pub fn compile(&mut self) -> Result<()> {
        let graph = compiler::compile(self, self.offset)?;
        self.graph = Some(graph);
        self.compiled = true;
        self.reset_run_state();
        Ok(())
    }

    fn reset_run_state(&mut self) {
        for event in self.events.values_mut() {
            event.reset();
        }
        for condition in self.conditions.values_mut() {
            condition.reset();
        }
        for process in self.processes.values_mut() {
            process.reset();
            if let Some(nested) = process.scenario_mut() {
                nested.reset_run_state();
                nested.running = false;
            }
        }
        self.position = self.offset as u64;
    }

    /// Start playing from the current offset, compiling first if needed
    pub fn start(&mut self) -> Result<()> {
        if !self.is_compiled() {
            self.compile()?;
        } else {
            self.reset_run_state();
        }
        let graph = self.graph.as_mut().ok_or(Error::NotCompiled)?;
        graph.net.start()?;
        self.running = true;
        debug!(scenario = %self.name, offset = self.offset, "scenario started");
        Ok(())
    }

    /// Stop playing; the next start compiles again
    pub fn stop(&mut self) {
        if let Some(graph) = self.graph.as_mut() {
            graph.net.stop();
        }
        self.end_processes();
        self.running = false;
        self.mark_stale();
        debug!(scenario = %self.name, position = self.position, "scenario stopped");
    }

    /// Move the playhead; takes effect at the next start
    ///
    /// Events before the offset happen on the first step as recalls, silently
    /// when `mute_recall` is set.
    pub fn goto(&mut self, offset: u32, mute_recall: bool) -> Result<()> {
        self.check_date(offset)?;
        if self.running {
            self.stop();
        }
        self.offset = offset;
        self.mute_recall = mute_recall;
        self.position = offset as u64;
        self.mark_stale();
        Ok(())
    }

    /// Advance to `progression` ms after the start
    ///
    /// Returns `false` once the scenario reached its end. A graph error stops the
    /// run and drops the net, which must be compiled again.
    pub fn process(&mut self, progression: u64, real_time: u64) -> Result<bool> {
        let Some(mut graph) = self.graph.take() else {
            return Err(Error::NotCompiled);
        };
        if !self.running {
            self.graph = Some(graph);
            return Ok(false);
        }

        let now = (progression as f64 * self.config.speed()) as Date;
        if self.config.mode == ExecutionMode::CrossAllWithoutWaiting {
            graph.net.ignore_events_for_one_step();
        }
        let step = graph.net.make_one_step(now);
        self.position = self.offset as u64 + now.max(0) as u64;
        for event in graph.net.drain_events() {
            self.dispatch(&graph.index, event);
        }

        match step {
            Ok(true) => {
                self.tick(self.position, real_time);
                self.graph = Some(graph);
                Ok(true)
            }
            Ok(false) => {
                self.finish();
                self.graph = Some(graph);
                Ok(false)
            }
            Err(e) => {
                error!(scenario = %self.name, position = self.position, error = %e, "run aborted");
                self.end_processes();
                self.running = false;
                self.mark_stale();
                Err(e.into())
            }
        }
    }

    /// Trigger an interactive event of this scenario
    pub fn trigger_event(&mut self, id: EventId) -> Result<()> {
        self.event(id)?;
        let graph = self.graph.as_mut().ok_or(Error::NotCompiled)?;
        let trigger = graph
            .index
            .trigger(id)
            .ok_or_else(|| Error::Validation(format!("{} is not interactive", id)))?;
        graph.net.put_an_event(trigger);
        debug!(event = %id, trigger = %trigger, "event triggered");
        Ok(())
    }

    /// Feed a value to every ready condition, nested scenarios included
    pub fn receive(&mut self, address: &str, value: &Value) -> Result<()> {
        let Some(mut graph) = self.graph.take() else {
            return Err(Error::NotCompiled);
        };
        let mut stimuli = Vec::new();
        self.resolve_conditions(&graph.index, &[], address, value, &mut stimuli);
        let result = apply(&mut graph.net, stimuli);
        self.graph = Some(graph);
        result
    }

    fn resolve_conditions(
        &mut self,
        index: &GraphIndex,
        path: &[NetId],
        address: &str,
        value: &Value,
        out: &mut Vec<Stimulus>,
    ) {
        let ids: Vec<ConditionId> = self.conditions.keys().copied().collect();
        for id in ids {
            let Some(resolution) = self
                .conditions
                .get_mut(&id)
                .and_then(|c| c.resolve(address, value))
            else {
                continue;
            };
            debug!(condition = %id, address, %value, ?resolution, "condition resolved");
            self.publish(
                NotificationKind::ConditionReadyChanged {
                    condition: id,
                    ready: false,
                },
                false,
            );
            out.extend(
                resolution
                    .triggered
                    .iter()
                    .filter_map(|e| index.trigger(*e))
                    .map(Stimulus::Trigger),
            );
            out.extend(
                resolution
                    .disposed
                    .iter()
                    .filter_map(|e| index.transition(*e))
                    .map(|t| Stimulus::Dispose(path.to_vec(), t)),
            );
        }

        for (net, process, child) in index.children() {
            let Some(nested) = self
                .processes
                .get_mut(&process)
                .and_then(|p| p.scenario_mut())
            else {
                continue;
            };
            if !nested.running {
                continue;
            }
            let mut child_path = path.to_vec();
            child_path.push(net);
            nested.resolve_conditions(child, &child_path, address, value, out);
            self.bubble(process);
        }
    }

    // ========================================================================
    // Net events
    // ========================================================================

    fn dispatch(&mut self, index: &GraphIndex, event: NetEvent) {
        match event {
            NetEvent::Crossed {
                payload, outcome, ..
            } => self.cross(EventId::new(payload), outcome),
            NetEvent::TriggerReady { trigger, ready, .. } => {
                if let Some(event) = index.trigger_event(trigger) {
                    self.ready(event, ready);
                }
            }
            NetEvent::Child { net, event } => {
                let Some((process, child)) = index.child(net) else {
                    return;
                };
                let position = self.nested_position(process);
                if let Some(nested) = self.nested(process) {
                    nested.position = position;
                    nested.dispatch(child, *event);
                }
                self.bubble(process);
            }
            NetEvent::ChildFinished { net } => {
                let Some((process, _)) = index.child(net) else {
                    return;
                };
                if let Some(nested) = self.nested(process) {
                    nested.finish();
                }
                self.bubble(process);
            }
            NetEvent::ChildFailed { net, reason } => {
                let Some((process, _)) = index.child(net) else {
                    return;
                };
                warn!(process = %process, net = %net, reason = %reason, "nested scenario failed");
                if let Some(nested) = self.nested(process) {
                    nested.end_processes();
                    nested.running = false;
                }
                self.bubble(process);
            }
        }
    }

    fn nested(&mut self, process: ProcessId) -> Option<&mut Scenario> {
        self.processes
            .get_mut(&process)
            .and_then(|p| p.scenario_mut())
    }

    fn nested_position(&self, process: ProcessId) -> u64 {
        let start = self
            .processes
            .get(&process)
            .and_then(|p| self.events.get(&p.start_event()))
            .map_or(0, |e| e.date() as u64);
        self.position.saturating_sub(start)
    }

    /// Republish the notifications of a nested scenario
    fn bubble(&mut self, process: ProcessId) {
        let Some(nested) = self.nested(process) else {
            return;
        };
        let notifications = nested.drain_notifications();
        self.notifications.extend(
            notifications
                .into_iter()
                .map(|n| n.nested_in(process)),
        );
    }

    fn cross(&mut self, id: EventId, outcome: CrossOutcome) {
        let recall = self.offset > 0;
        let Some(event) = self.events.get_mut(&id) else {
            warn!(event = %id, "crossing for an unknown event");
            return;
        };
        let previous = event.status();
        if previous.is_final() {
            trace!(event = %id, status = %previous, "event already final");
            return;
        }
        let recall = recall && event.date() < self.offset;
        let result = match outcome {
            CrossOutcome::Happened { lateness } => {
                trace!(event = %id, lateness, "event happens");
                event.happen()
            }
            CrossOutcome::Disposed => event.dispose(),
        };
        if result.is_err() {
            return;
        }
        let status = event.status();
        let condition = event.condition();
        self.publish(
            NotificationKind::EventStatusChanged {
                event: id,
                status,
                previous,
            },
            recall,
        );
        if let Some(condition) = condition {
            self.condition_ready(condition, id, false);
        }

        let ending: Vec<ProcessId> = self
            .processes
            .values()
            .filter(|p| p.end_event() == id)
            .map(|p| p.id())
            .collect();
        for process in ending {
            self.end_process(process, recall);
        }
        if status == EventStatus::Happened {
            let starting: Vec<ProcessId> = self
                .processes
                .values()
                .filter(|p| p.start_event() == id)
                .map(|p| p.id())
                .collect();
            for process in starting {
                self.start_process(process, recall);
            }
        }
    }

    fn ready(&mut self, id: EventId, ready: bool) {
        let Some(event) = self.events.get_mut(&id) else {
            return;
        };
        let condition = event.condition();
        if event.set_ready(ready) {
            self.publish(NotificationKind::EventReadyChanged { event: id, ready }, false);
        }
        if let Some(condition) = condition {
            self.condition_ready(condition, id, ready);
        }
    }

    fn condition_ready(&mut self, condition: ConditionId, event: EventId, pending: bool) {
        let changed = self
            .conditions
            .get_mut(&condition)
            .and_then(|c| c.event_ready(event, pending));
        if let Some(ready) = changed {
            self.publish(
                NotificationKind::ConditionReadyChanged { condition, ready },
                false,
            );
        }
    }

    fn start_process(&mut self, id: ProcessId, recall: bool) {
        let Some(process) = self.processes.get_mut(&id) else {
            return;
        };
        process.process_start();
        if let Some(nested) = process.scenario_mut() {
            nested.running = true;
            nested.position = 0;
        }
        self.publish(NotificationKind::ProcessStarted { process: id }, recall);
    }

    fn end_process(&mut self, id: ProcessId, recall: bool) {
        let Some(process) = self.processes.get_mut(&id) else {
            return;
        };
        if !process.is_running() {
            return;
        }
        process.process_end();
        if let Some(nested) = process.scenario_mut() {
            nested.end_processes();
            nested.running = false;
        }
        self.publish(NotificationKind::ProcessEnded { process: id }, recall);
        self.bubble(id);
    }

    fn end_processes(&mut self) {
        let running: Vec<ProcessId> = self
            .processes
            .values()
            .filter(|p| p.is_running())
            .map(|p| p.id())
            .collect();
        for id in running {
            self.end_process(id, false);
        }
    }

    /// The net reached its end: fire the end event and close the run
    fn finish(&mut self) {
        let end = self.end_event;
        self.cross(end, CrossOutcome::Happened { lateness: 0 });
        self.end_processes();
        self.running = false;
        self.publish(NotificationKind::ScenarioEnded, false);
        debug!(scenario = %self.name, position = self.position, "scenario ended");
    }

    /// Drive running processes to `position`
    fn tick(&mut self, position: u64, real_time: u64) {
        let running: Vec<(ProcessId, u64, u64)> = self
            .processes
            .values()
            .filter(|p| p.is_running())
            .filter_map(|p| {
                let start = self.events.get(&p.start_event())?.date() as u64;
                let end = self.events.get(&p.end_event())?.date() as u64;
                Some((p.id(), start, end))
            })
            .collect();
        for (id, start, end) in running {
            let Some(process) = self.processes.get_mut(&id) else {
                continue;
            };
            let elapsed = position.saturating_sub(start);
            let progression = if end > start {
                elapsed as f64 / (end - start) as f64
            } else {
                1.0
            };
            process.process(progression, real_time);
            if let Some(nested) = process.scenario_mut() {
                if nested.running {
                    nested.position = elapsed;
                    nested.tick(elapsed, real_time);
                }
            }
        }
    }
}

fn apply(net: &mut PetriNet, stimuli: Vec<Stimulus>) -> Result<()> {
    for stimulus in stimuli {
        match stimulus {
            Stimulus::Trigger(trigger) => net.put_an_event(trigger),
            Stimulus::Dispose(path, transition) => {
                let mut target = &mut *net;
                for id in path {
                    target = target
                        .child_mut(id)
                        .ok_or(cadence_petri::Error::NetNotFound(id))?;
                }
                target.deactivate_transition(transition)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::process::TimeProcessBehavior;
    use cadence_petri::{Color, Node};
    use std::sync::{Arc, Mutex};

    fn config(duration: u32) -> ScenarioConfig {
        ScenarioConfig::default().with_duration(duration)
    }

    /// 0 -- a(200) == p, rigid 500 == b(700) -- end(1000)
    fn rigid() -> (Scenario, EventId, EventId, ProcessId) {
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 200).unwrap();
        let b = s.add_event("b", 700).unwrap();
        let p = s.add_process("p", ProcessKind::Plain, a, b).unwrap();
        s.set_limits(p, 500, 500).unwrap();
        (s, a, b, p)
    }

    fn status(s: &Scenario, id: EventId) -> EventStatus {
        s.event(id).unwrap().status()
    }

    fn statuses(notifications: &[Notification]) -> Vec<(EventId, EventStatus, bool)> {
        notifications
            .iter()
            .filter_map(|n| match n.kind {
                NotificationKind::EventStatusChanged { event, status, .. } => {
                    Some((event, status, n.recall))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_end_event_happens_at_duration() {
        let (mut s, a, b, _) = rigid();
        s.compile().unwrap();
        s.start().unwrap();
        let end = s.end_event();

        for t in (0..1000).step_by(50) {
            assert!(s.process(t, t).unwrap(), "ended early at {}", t);
            assert_ne!(status(&s, end), EventStatus::Happened);
            if t >= 700 {
                assert_eq!(status(&s, b), EventStatus::Happened);
            } else if t >= 200 {
                assert_eq!(status(&s, a), EventStatus::Happened);
                assert_eq!(status(&s, b), EventStatus::Waiting);
            }
        }
        assert!(!s.process(1000, 1000).unwrap());
        assert_eq!(status(&s, end), EventStatus::Happened);
        assert!(!s.is_running());
        assert!(!s.process(1050, 1050).unwrap());

        let notifications = s.drain_notifications();
        assert_eq!(
            notifications.last().map(|n| &n.kind),
            Some(&NotificationKind::ScenarioEnded)
        );
        let happened: Vec<EventId> = statuses(&notifications).iter().map(|s| s.0).collect();
        assert_eq!(happened, vec![s.start_event(), a, b, end]);
    }

    #[test]
    fn test_process_requires_compile() {
        let (mut s, ..) = rigid();
        assert_eq!(s.process(0, 0).unwrap_err(), Error::NotCompiled);
        s.start().unwrap();
        assert!(s.is_compiled());
        s.add_event("late", 900).unwrap();
        assert!(!s.is_compiled());
        // the current run keeps its net
        assert!(s.process(0, 0).unwrap());
    }

    #[test]
    fn test_move_beyond_duration() {
        let (mut s, a, ..) = rigid();
        s.drain_notifications();
        let err = s.move_event(a, 1500).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(s.event(a).unwrap().date(), 200);
        assert!(s.drain_notifications().is_empty());

        let err = s.move_event(s.end_event(), 900).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_relation_move_infeasible() {
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 200).unwrap();
        let b = s.add_event("b", 350).unwrap();
        let p = s.add_process("gap", ProcessKind::Interval, a, b).unwrap();
        s.set_limits(p, 100, 200).unwrap();

        let err = s.move_process(p, 200, 250).unwrap_err();
        assert!(err.is_infeasible());
        assert_eq!(s.event(a).unwrap().date(), 200);
        assert_eq!(s.event(b).unwrap().date(), 350);

        s.move_process(p, 300, 480).unwrap();
        assert_eq!(s.event(a).unwrap().date(), 300);
        assert_eq!(s.event(b).unwrap().date(), 480);
    }

    #[test]
    fn test_move_keeps_solver_and_dates_in_sync() {
        let (mut s, a, b, p) = rigid();
        s.drain_notifications();
        s.move_event(a, 300).unwrap();
        assert_eq!(s.event(b).unwrap().date(), 800);
        for event in s.events() {
            assert_eq!(s.solver().date(event.id()).unwrap(), event.date());
        }
        let range = s.solver().constraint(p).unwrap().range(s.solver().csp()).unwrap();
        assert_eq!(s.event(a).unwrap().date() + range, s.event(b).unwrap().date());
        let moved: Vec<_> = s
            .drain_notifications()
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert!(moved.contains(&NotificationKind::EventDateChanged { event: a, date: 300 }));
        assert!(moved.contains(&NotificationKind::EventDateChanged { event: b, date: 800 }));

        // a rigid process takes its new length
        s.move_process(p, 100, 400).unwrap();
        assert_eq!(s.time_process(p).unwrap().duration_min(), 300);
        assert!(s.time_process(p).unwrap().is_rigid());
        assert!(s.solver().is_satisfied());
    }

    /// start + range == end for the constraint of every non-interval process
    fn assert_constraints_hold(s: &Scenario) {
        for p in s.processes().filter(|p| !p.is_interval()) {
            let constraint = s.solver().constraint(p.id()).unwrap();
            let range = constraint.range(s.solver().csp()).unwrap();
            assert_eq!(
                s.event(p.start_event()).unwrap().date() + range,
                s.event(p.end_event()).unwrap().date(),
                "{}",
                p.id()
            );
        }
    }

    #[test]
    fn test_chained_rigid_processes_follow_a_move() {
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 100).unwrap();
        let b = s.add_event("b", 600).unwrap();
        let c = s.add_event("c", 800).unwrap();
        let ab = s.add_process("ab", ProcessKind::Plain, a, b).unwrap();
        let bc = s.add_process("bc", ProcessKind::Plain, b, c).unwrap();
        s.set_limits(ab, 500, 500).unwrap();
        s.set_limits(bc, 200, 200).unwrap();
        assert_constraints_hold(&s);

        s.move_event(a, 150).unwrap();
        assert_eq!(s.event(b).unwrap().date(), 650);
        assert_eq!(s.event(c).unwrap().date(), 850);
        assert_constraints_hold(&s);
    }

    #[test]
    fn test_process_across_the_bounds_rejected() {
        let mut s = Scenario::new(config(1000));
        let x = s.add_event("x", 0).unwrap();
        let y = s.add_event("y", 1000).unwrap();
        let (start, end) = (s.start_event(), s.end_event());
        let err = s.add_process("into start", ProcessKind::Plain, x, start).unwrap_err();
        assert!(err.is_validation());
        let err = s.add_process("out of end", ProcessKind::Plain, end, y).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(s.processes().count(), 0);
        assert!(!s.event(start).unwrap().is_attached());

        s.add_process("ok", ProcessKind::Plain, start, x).unwrap();
    }

    #[test]
    fn test_cycle_of_processes_rejected() {
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 400).unwrap();
        let b = s.add_event("b", 400).unwrap();
        let c = s.add_event("c", 400).unwrap();
        s.add_process("ab", ProcessKind::Plain, a, b).unwrap();
        s.add_process("bc", ProcessKind::Interval, b, c).unwrap();
        for kind in [ProcessKind::Plain, ProcessKind::Interval] {
            assert!(s.add_process("back", kind, c, a).unwrap_err().is_validation());
        }
        assert!(s.add_process("ba", ProcessKind::Plain, b, a).unwrap_err().is_validation());
        assert_eq!(s.processes().count(), 2);
        assert!(s.solver().is_satisfied());

        s.start().unwrap();
        let mut t = 0;
        while s.process(t, t).unwrap() {
            t += 50;
            assert!(t <= 1000, "scenario never ended");
        }
        assert_eq!(status(&s, c), EventStatus::Happened);
    }

    #[test]
    fn test_compile_rejects_cycle() {
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 400).unwrap();
        let b = s.add_event("b", 400).unwrap();
        s.add_process("ab", ProcessKind::Plain, a, b).unwrap();
        let back = ProcessId::new(99);
        s.processes
            .insert(back, TimeProcess::new(back, "ba", ProcessKind::Plain, b, a));

        assert!(s.compile().unwrap_err().is_validation());
        assert!(!s.is_compiled());
        assert!(s.start().unwrap_err().is_validation());
        assert!(!s.is_running());
    }

    #[test]
    fn test_incoherent_graph_stops_the_run() {
        let (mut s, a, b, _) = interactive();
        s.start().unwrap();
        for t in [0, 250] {
            assert!(s.process(t, t).unwrap());
        }
        assert_eq!(status(&s, a), EventStatus::Happened);

        // an input b can never get, once its window is already queued
        let graph = s.graph.as_mut().unwrap();
        let tb = graph.index.transition(b).unwrap();
        let place = graph.net.create_place();
        graph
            .net
            .create_arc(Node::Place(place), Node::Transition(tb), Color::DEFAULT)
            .unwrap();

        let err = s.process(1000, 1000).unwrap_err();
        assert!(err.is_incoherent());
        assert!(!s.is_running());
        assert!(!s.is_compiled());
        assert!(s.graph().is_none());
        assert_eq!(s.process(1050, 1050).unwrap_err(), Error::NotCompiled);

        s.start().unwrap();
        assert!(s.is_compiled());
        let mut t = 0;
        while s.process(t, t).unwrap() {
            t += 50;
            assert!(t <= 2000, "scenario never ended");
        }
        assert_eq!(status(&s, s.end_event()), EventStatus::Happened);
    }

    #[test]
    fn test_structure_validation() {
        let (mut s, a, b, p) = rigid();
        assert!(s.add_process("back", ProcessKind::Plain, b, a).unwrap_err().is_validation());
        assert!(s.add_process("self", ProcessKind::Plain, a, a).unwrap_err().is_validation());
        assert!(s.remove_event(a).unwrap_err().is_validation());
        assert!(s.remove_event(s.start_event()).unwrap_err().is_validation());
        assert!(s.remove_event(EventId::new(99)).unwrap_err().is_not_found());
        assert!(s.set_limits(p, 600, 400).unwrap_err().is_validation());
        assert_eq!(s.time_process(p).unwrap().duration_min(), 500);

        s.remove_process(p).unwrap();
        assert!(!s.event(a).unwrap().is_attached());
        s.remove_event(a).unwrap();
        assert!(s.event(a).unwrap_err().is_not_found());
    }

    /// b waits for "/go" anywhere in [100, 800) after a
    fn interactive() -> (Scenario, EventId, EventId, ConditionId) {
        let (mut s, a, b, p) = rigid();
        s.set_limits(p, 100, 800).unwrap();
        let c = s.add_condition("go");
        s.add_case(c, b, Case::on(Expression::parse("/go == 1").unwrap()))
            .unwrap();
        (s, a, b, c)
    }

    #[test]
    fn test_interactive_event_triggered() {
        let (mut s, _, b, c) = interactive();
        s.start().unwrap();
        for t in (0..=300).step_by(50) {
            assert!(s.process(t, t).unwrap());
        }
        assert_eq!(status(&s, b), EventStatus::Pending);
        assert!(s.condition(c).unwrap().is_ready());

        s.receive("/go", &Value::Int(1)).unwrap();
        assert!(s.process(350, 350).unwrap());
        assert_eq!(status(&s, b), EventStatus::Happened);
        assert!(!s.condition(c).unwrap().is_ready());

        let kinds: Vec<_> = s.drain_notifications().into_iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&NotificationKind::EventReadyChanged { event: b, ready: true }));
        assert!(kinds.contains(&NotificationKind::ConditionReadyChanged {
            condition: c,
            ready: true
        }));
    }

    #[test]
    fn test_interactive_event_disposed() {
        let (mut s, _, b, _) = interactive();
        s.start().unwrap();
        for t in (0..=300).step_by(50) {
            s.process(t, t).unwrap();
        }
        s.receive("/go", &Value::Int(2)).unwrap();
        s.process(350, 350).unwrap();
        assert_eq!(status(&s, b), EventStatus::Disposed);
    }

    #[test]
    fn test_interactive_event_forced_at_max() {
        let (mut s, a, b, _) = interactive();
        let p = s.processes().next().unwrap().id();
        s.set_limits(p, 100, 500).unwrap();
        assert_eq!(s.event(a).unwrap().date(), 200);
        s.start().unwrap();
        let mut happened_at = None;
        for t in (0..=1000).step_by(50) {
            s.process(t, t).unwrap();
            if happened_at.is_none() && status(&s, b) == EventStatus::Happened {
                happened_at = Some(t);
            }
        }
        assert_eq!(happened_at, Some(700));
        assert_eq!(status(&s, s.end_event()), EventStatus::Happened);
    }

    #[test]
    fn test_cross_all_without_waiting() {
        let (mut s, _, b, _) = interactive();
        s.set_mode(ExecutionMode::CrossAllWithoutWaiting).unwrap();
        s.start().unwrap();
        for t in (0..=300).step_by(50) {
            s.process(t, t).unwrap();
        }
        assert_eq!(status(&s, b), EventStatus::Happened);
    }

    #[test]
    fn test_trigger_event() {
        let (mut s, a, b, _) = interactive();
        assert_eq!(s.trigger_event(b).unwrap_err(), Error::NotCompiled);
        s.start().unwrap();
        assert!(s.trigger_event(a).unwrap_err().is_validation());
        for t in (0..=300).step_by(50) {
            s.process(t, t).unwrap();
        }
        s.trigger_event(b).unwrap();
        s.process(310, 310).unwrap();
        assert_eq!(status(&s, b), EventStatus::Happened);
    }

    #[test]
    fn test_goto_recalls_past_events() {
        let (mut s, a, b, p) = rigid();
        s.goto(500, false).unwrap();
        s.start().unwrap();
        assert!(s.process(0, 0).unwrap());
        assert_eq!(s.position(), 500);
        assert_eq!(status(&s, a), EventStatus::Happened);
        assert!(s.time_process(p).unwrap().is_running());

        let recalled = statuses(&s.drain_notifications());
        assert_eq!(
            recalled,
            vec![
                (s.start_event(), EventStatus::Happened, true),
                (a, EventStatus::Happened, true)
            ]
        );

        assert!(s.process(150, 150).unwrap());
        assert_eq!(status(&s, b), EventStatus::Waiting);
        assert!(s.process(200, 200).unwrap());
        assert_eq!(status(&s, b), EventStatus::Happened);
        assert_eq!(statuses(&s.drain_notifications()), vec![(b, EventStatus::Happened, false)]);
    }

    #[test]
    fn test_goto_mute_recall() {
        let (mut s, a, ..) = rigid();
        s.goto(500, true).unwrap();
        s.start().unwrap();
        s.process(0, 0).unwrap();
        assert_eq!(status(&s, a), EventStatus::Happened);
        assert!(statuses(&s.drain_notifications()).is_empty());
        assert!(s.goto(2000, false).unwrap_err().is_validation());
    }

    #[derive(Debug)]
    struct Recorder {
        log: Arc<Mutex<Vec<f64>>>,
    }

    impl TimeProcessBehavior for Recorder {
        fn process(&mut self, progression: f64, _real_time: u64) {
            self.log.lock().unwrap().push(progression);
        }
    }

    #[test]
    fn test_behavior_progression() {
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 200).unwrap();
        let b = s.add_event("b", 700).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let curve = Recorder { log: log.clone() };
        let p = s
            .add_process("curve", ProcessKind::Behavior(Box::new(curve)), a, b)
            .unwrap();
        s.start().unwrap();
        for t in (0..=1000).step_by(50) {
            s.process(t, t).unwrap();
        }
        let log = log.lock().unwrap();
        assert_eq!(log.first(), Some(&0.0));
        assert!(log.contains(&0.5));
        assert!(log.iter().all(|p| (0.0..1.0).contains(p)));
        assert!(!s.time_process(p).unwrap().is_running());
    }

    #[test]
    fn test_nested_scenario() {
        let mut inner = Scenario::new(config(500));
        let x = inner.add_event("x", 250).unwrap();
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 100).unwrap();
        let b = s.add_event("b", 600).unwrap();
        let p = s
            .add_process("inner", ProcessKind::Scenario(Box::new(inner)), a, b)
            .unwrap();
        s.start().unwrap();
        for t in (0..=700).step_by(50) {
            assert!(s.process(t, t).unwrap());
        }
        let nested = s.time_process(p).unwrap().scenario().unwrap();
        assert_eq!(nested.event(x).unwrap().status(), EventStatus::Happened);
        assert_eq!(
            nested.event(nested.end_event()).unwrap().status(),
            EventStatus::Happened
        );
        assert_eq!(status(&s, b), EventStatus::Happened);

        let notifications = s.drain_notifications();
        let inner_x = notifications.iter().find(|n| {
            n.path == vec![p]
                && matches!(n.kind, NotificationKind::EventStatusChanged { event, .. } if event == x)
        });
        assert!(inner_x.is_some());
        assert!(notifications
            .iter()
            .any(|n| n.path == vec![p] && n.kind == NotificationKind::ScenarioEnded));
    }

    #[test]
    fn test_loading_mode() {
        let mut s = Scenario::new(config(1000).with_mode(ExecutionMode::Loading));
        let a = s.add_event("a", 200).unwrap();
        let b = s.add_event("b", 900).unwrap();
        let p = s.add_process("gap", ProcessKind::Interval, a, b).unwrap();
        s.set_limits(p, 100, 300).unwrap();
        assert_eq!(s.event(b).unwrap().date(), 900);
        assert!(s.drain_notifications().is_empty());

        s.set_mode(ExecutionMode::Normal).unwrap();
        let gap = s.event(b).unwrap().date() - s.event(a).unwrap().date();
        assert!((100..=300).contains(&gap));
        assert!(s.solver().relation(p).is_some());
        assert!(s.solver().is_satisfied());
    }

    #[test]
    fn test_set_case_replaces_expressions() {
        let (mut s, a, b, c) = interactive();
        let case = Case::on(Expression::parse("/go == 2").unwrap());
        assert!(s.set_case(c, a, case.clone()).is_err());
        s.set_case(c, b, case).unwrap();
        s.start().unwrap();
        for t in (0..=300).step_by(50) {
            s.process(t, t).unwrap();
        }
        s.receive("/go", &Value::Int(2)).unwrap();
        s.process(350, 350).unwrap();
        assert_eq!(status(&s, b), EventStatus::Happened);
    }

    #[test]
    fn test_nested_edit_marks_stale() {
        let mut s = Scenario::new(config(1000));
        let a = s.add_event("a", 100).unwrap();
        let b = s.add_event("b", 600).unwrap();
        let inner = ProcessKind::Scenario(Box::new(Scenario::new(config(500))));
        let p = s.add_process("inner", inner, a, b).unwrap();
        let plain = s.add_process("plain", ProcessKind::Plain, a, b).unwrap();
        s.compile().unwrap();
        assert!(s.is_compiled());

        let y = s.nested_mut(p).unwrap().add_event("y", 100).unwrap();
        assert!(!s.is_compiled());
        let nested = s.time_process(p).unwrap().scenario().unwrap();
        assert_eq!(nested.event(y).unwrap().date(), 100);
        assert!(s.nested_mut(plain).is_err());
    }

    #[test]
    fn test_remove_condition_restores_timer() {
        let (mut s, _, b, c) = interactive();
        s.remove_condition(c).unwrap();
        assert!(s.event(b).unwrap().condition().is_none());
        assert!(s.condition(c).unwrap_err().is_not_found());
        s.compile().unwrap();
        assert!(s.graph().unwrap().index.trigger(b).is_none());
    }
}
