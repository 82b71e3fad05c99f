//! Time windows for timed arcs
//!
//! Dates are signed milliseconds on the net clock:
//! - `Date` - A point on the net clock (may be negative when a net starts late)
//! - `Bound` - Upper end of a window, possibly unbounded
//! - `TimeWindow` - `[min, max)` window carried by arcs

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the net clock, in milliseconds
pub type Date = i64;

/// Upper bound of a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bound {
    Finite(u64),
    Infinite,
}

impl Bound {
    /// Finite value, or `None` when unbounded
    pub fn finite(&self) -> Option<u64> {
        match self {
            Bound::Finite(v) => Some(*v),
            Bound::Infinite => None,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Bound::Infinite)
    }

    /// Check whether `value` is strictly below this bound
    pub fn exceeds(&self, value: u64) -> bool {
        match self {
            Bound::Finite(max) => *max > value,
            Bound::Infinite => true,
        }
    }

    /// Shift a date by this bound, `None` when unbounded
    pub fn offset(&self, date: Date) -> Option<Date> {
        self.finite().map(|v| date.saturating_add(v as Date))
    }
}

impl From<u64> for Bound {
    fn from(v: u64) -> Self {
        Bound::Finite(v)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Finite(v) => write!(f, "{}", v),
            Bound::Infinite => write!(f, "inf"),
        }
    }
}

/// A `[min, max)` window in milliseconds
///
/// `min < max` always holds; every mutation validates the new pair first and
/// leaves the window untouched when it is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    min: u64,
    max: Bound,
}

impl TimeWindow {
    /// `[0, +inf)`
    pub const UNBOUNDED: TimeWindow = TimeWindow {
        min: 0,
        max: Bound::Infinite,
    };

    /// Create a window, rejecting `min >= max`
    pub fn new(min: u64, max: Bound) -> Result<Self> {
        if !max.exceeds(min) {
            return Err(Error::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// `[min, +inf)`
    pub fn at_least(min: u64) -> Self {
        Self {
            min,
            max: Bound::Infinite,
        }
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> Bound {
        self.max
    }

    /// Replace both ends at once
    pub fn set(&mut self, min: u64, max: Bound) -> Result<()> {
        *self = Self::new(min, max)?;
        Ok(())
    }

    /// Check whether an elapsed time lies inside the window
    pub fn contains(&self, elapsed: u64) -> bool {
        elapsed >= self.min && self.max.exceeds(elapsed)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}
