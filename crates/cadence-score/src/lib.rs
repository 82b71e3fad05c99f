//! Cadence Score - interactive scores on top of timed Petri nets
//!
//! This crate provides the model an author edits and the machinery that plays it:
//! - Time events, processes between them and conditions deciding their fate
//! - Message expressions (`/address == value`) evaluated against incoming values
//! - The edition solver, keeping event dates consistent while editing
//! - The graph compiler, turning a scenario into a `cadence_petri::PetriNet`
//! - The `Scenario` orchestrator, stepped tick by tick
//!
//! ## Playing a score
//!
//! ```
//! use cadence_score::{ProcessKind, Scenario, ScenarioConfig};
//!
//! let mut score = Scenario::new(ScenarioConfig::default().with_duration(1000));
//! let a = score.add_event("a", 200).unwrap();
//! let b = score.add_event("b", 700).unwrap();
//! let p = score.add_process("p", ProcessKind::Plain, a, b).unwrap();
//! score.set_limits(p, 500, 500).unwrap();
//!
//! score.start().unwrap();
//! let mut t = 0;
//! while score.process(t, t).unwrap() {
//!     t += 50;
//! }
//! assert_eq!(t, 1000);
//! ```
//!
//! Everything observable is published as a [`Notification`] and read back with
//! [`Scenario::drain_notifications`].

pub mod compiler;
mod condition;
mod config;
mod error;
mod event;
mod expression;
mod identity;
mod notification;
mod process;
mod scenario;
pub mod solver;
mod value;

pub use compiler::{compile, CompiledGraph, GraphIndex};
pub use condition::{Case, Resolution, TimeCondition};
pub use config::{ExecutionMode, ScenarioConfig, DEFAULT_DURATION};
pub use error::{Error, Result};
pub use event::{EventStatus, TimeEvent};
pub use expression::{Expression, Operator};
pub use identity::{ConditionId, EventId, ProcessId};
pub use notification::{Notification, NotificationKind};
pub use process::{ProcessKind, TimeProcess, TimeProcessBehavior};
pub use scenario::Scenario;
pub use solver::EditionSolver;
pub use value::Value;
