//! Time processes: durations between two time events

use crate::error::{Error, Result};
use crate::identity::{EventId, ProcessId};
use crate::scenario::Scenario;
use std::fmt;

/// Lifecycle hooks of a process plugin (curves, automations, ...)
pub trait TimeProcessBehavior: fmt::Debug + Send {
    /// Called when the start event happens
    fn process_start(&mut self) {}

    /// Called on every tick while running
    ///
    /// `progression` goes from 0 at the start date to 1 at the end date,
    /// `real_time` is the elapsed time in ms since the process started.
    fn process(&mut self, progression: f64, real_time: u64);

    /// Called when the end event happens or is disposed
    fn process_end(&mut self) {}
}

/// What a process does between its two events
#[derive(Debug)]
pub enum ProcessKind {
    /// Pure duration constraint, compiled without transitions of its own
    Interval,
    /// A process with no behavior attached
    Plain,
    /// A process driving a plugin
    Behavior(Box<dyn TimeProcessBehavior>),
    /// A nested scenario run as a child net
    Scenario(Box<Scenario>),
}

impl ProcessKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessKind::Interval => "Interval",
            ProcessKind::Plain => "Plain",
            ProcessKind::Behavior(_) => "Behavior",
            ProcessKind::Scenario(_) => "Scenario",
        }
    }
}

/// A duration-bearing unit bounded by a start and an end event
#[derive(Debug)]
pub struct TimeProcess {
    id: ProcessId,
    pub name: String,
    pub(crate) kind: ProcessKind,
    start: EventId,
    end: EventId,
    /// Minimal duration in ms, 0 when unbounded
    duration_min: u32,
    /// Maximal duration in ms, 0 when unbounded
    duration_max: u32,
    pub mute: bool,
    running: bool,
}

impl TimeProcess {
    pub(crate) fn new(
        id: ProcessId,
        name: impl Into<String>,
        kind: ProcessKind,
        start: EventId,
        end: EventId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            start,
            end,
            duration_min: 0,
            duration_max: 0,
            mute: false,
            running: false,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn kind(&self) -> &ProcessKind {
        &self.kind
    }

    pub fn is_interval(&self) -> bool {
        matches!(self.kind, ProcessKind::Interval)
    }

    pub fn start_event(&self) -> EventId {
        self.start
    }

    pub fn end_event(&self) -> EventId {
        self.end
    }

    pub fn duration_min(&self) -> u32 {
        self.duration_min
    }

    pub fn duration_max(&self) -> u32 {
        self.duration_max
    }

    /// Exact fixed length: `min == max`, both set
    pub fn is_rigid(&self) -> bool {
        self.duration_min == self.duration_max && self.duration_min != 0
    }

    /// Check a `[min, max]` pair, 0 meaning unbounded for `max`
    pub fn validate_limits(min: u32, max: u32) -> Result<()> {
        if max != 0 && min > max {
            return Err(Error::Validation(format!(
                "duration min {} is greater than max {}",
                min, max
            )));
        }
        Ok(())
    }

    pub(crate) fn set_limits(&mut self, min: u32, max: u32) -> Result<()> {
        Self::validate_limits(min, max)?;
        self.duration_min = min;
        self.duration_max = max;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Nested scenario, if this process is one
    pub fn scenario(&self) -> Option<&Scenario> {
        match &self.kind {
            ProcessKind::Scenario(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn scenario_mut(&mut self) -> Option<&mut Scenario> {
        match &mut self.kind {
            ProcessKind::Scenario(s) => Some(s),
            _ => None,
        }
    }

    /// Forget a previous run without calling any hook
    pub(crate) fn reset(&mut self) {
        self.running = false;
    }

    pub(crate) fn process_start(&mut self) {
        self.running = true;
        if let ProcessKind::Behavior(behavior) = &mut self.kind {
            behavior.process_start();
        }
    }

    pub(crate) fn process(&mut self, progression: f64, real_time: u64) {
        if !self.running || self.mute {
            return;
        }
        if let ProcessKind::Behavior(behavior) = &mut self.kind {
            behavior.process(progression.clamp(0.0, 1.0), real_time);
        }
    }

    pub(crate) fn process_end(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        if let ProcessKind::Behavior(behavior) = &mut self.kind {
            behavior.process_end();
        }
    }
}
