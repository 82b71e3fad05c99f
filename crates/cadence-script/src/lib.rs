//! Cadence Script - RON score documents
//!
//! Saves and loads the editable model of a score:
//! - Events with their dates
//! - Processes with their kind and duration bounds, nested scores included
//! - Conditions with the expressions of each case
//!
//! Compiled nets and solver state are never saved; they are rebuilt from the
//! model when the score is built and started.

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::{build_scenario, export, load_file, load_str, save_file, save_str};
pub use schema::{
    CaseDef, ConditionDef, EventDef, ProcessDef, ProcessKindDef, ScoreFile, END_ID, START_ID,
};
