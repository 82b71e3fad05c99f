//! Identity types for the nodes of a net
//!
//! Places, transitions and arcs live in arenas owned by a [`PetriNet`](crate::PetriNet)
//! and are addressed by these ids instead of pointers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new id
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            /// Get the raw id value
            pub fn raw(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

node_id!(
    /// Identifier of a place inside one net
    PlaceId,
    "place"
);
node_id!(
    /// Identifier of a transition inside one net
    TransitionId,
    "transition"
);
node_id!(
    /// Identifier of an arc inside one net
    ArcId,
    "arc"
);
node_id!(
    /// Identifier of a child net, unique among the children of its parent
    NetId,
    "net"
);

/// External stimulus a transition can be bound to
///
/// The owner of the net decides what a trigger means; the scenario layer uses
/// the raw id of the bound time event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerId(pub u64);

impl TriggerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger:{}", self.0)
    }
}

/// Token color channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color(pub u16);

impl Color {
    /// Channel used when a net is not colored
    pub const DEFAULT: Color = Color(0);

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "color:{}", self.0)
    }
}
