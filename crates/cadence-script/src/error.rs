//! Error types for cadence-script

use thiserror::Error;

/// Score document error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON write error: {0}")]
    RonSerialize(#[from] ron::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Missing reference: {0}")]
    MissingReference(String),

    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    /// The document describes a score the model rejects
    #[error("Score error: {0}")]
    Score(#[from] cadence_score::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Compile-time check that Error is Send + Sync.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
