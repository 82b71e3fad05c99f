//! Error types for cadence-petri

use crate::identity::{ArcId, Color, NetId, PlaceId, TransitionId};
use crate::time::Bound;
use thiserror::Error;

/// Petri net error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid time bounds: min {min} must be strictly lower than max {max}")]
    InvalidBounds { min: u64, max: Bound },

    #[error("Place not found: {0}")]
    PlaceNotFound(PlaceId),

    #[error("Transition not found: {0}")]
    TransitionNotFound(TransitionId),

    #[error("Arc not found: {0}")]
    ArcNotFound(ArcId),

    #[error("Child net not found: {0}")]
    NetNotFound(NetId),

    #[error("Not enough tokens in {place} for {color}: requested {requested}, available {available}")]
    NotEnoughTokens {
        place: PlaceId,
        color: Color,
        requested: usize,
        available: usize,
    },

    #[error("Invalid arc: {0}")]
    InvalidArc(String),

    #[error("Invalid color {color}: net has {nb_colors} color(s)")]
    InvalidColor { color: Color, nb_colors: u16 },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Incoherent graph state: {0}")]
    IncoherentState(String),
}

impl Error {
    /// True for errors that leave the net unusable until it is rebuilt
    pub fn is_incoherent(&self) -> bool {
        matches!(self, Error::IncoherentState(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Compile-time check that Error is Send + Sync so nets can be moved across threads.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
