//! Cadence Petri - timed Petri net engine
//!
//! This crate provides the discrete-event substrate interactive scores run on:
//! - Graph primitives (`Place`, `Transition`, `Arc`) addressed by ids
//! - Time windows on arcs, relative to activation or absolute on the net clock
//! - The `PetriNet` engine with its action queue and sensitized set
//! - Hierarchical child nets sharing the parent clock
//!
//! ## Stepping
//!
//! A net is driven by its owner: call [`PetriNet::start`], then
//! [`PetriNet::make_one_step`] with a monotonically increasing date until it
//! returns `false`. Crossings and readiness changes are read back with
//! [`PetriNet::drain_events`].
//!
//! ```
//! use cadence_petri::{Bound, Color, Node, PetriNet};
//!
//! let mut net = PetriNet::new();
//! let t = net.create_transition();
//! let arc = net
//!     .create_arc(Node::Place(net.start_place()), Node::Transition(t), Color::DEFAULT)
//!     .unwrap();
//! net.create_arc(Node::Transition(t), Node::Place(net.end_place()), Color::DEFAULT)
//!     .unwrap();
//! net.change_relative_time(arc, 100, Bound::Infinite).unwrap();
//!
//! net.start().unwrap();
//! assert!(net.make_one_step(50).unwrap());
//! assert!(!net.make_one_step(100).unwrap());
//! ```

mod action;
mod arc;
mod error;
mod event;
mod identity;
mod net;
mod place;
pub mod time;
mod transition;

pub use action::{ActionKind, ActionQueue, PriorityTransitionAction};
pub use arc::{Arc, ArcDirection, Node};
pub use error::{Error, Result};
pub use event::{CrossOutcome, NetEvent};
pub use identity::{ArcId, Color, NetId, PlaceId, TransitionId, TriggerId};
pub use net::PetriNet;
pub use place::{Place, Token};
pub use time::{Bound, Date, TimeWindow};
pub use transition::{Transition, TransitionAction, Trigger};
