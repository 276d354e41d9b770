//! Error taxonomy for emblem
//!
//! Nothing here is fatal to the process: malformed records and
//! unparseable frames are dropped with a diagnostic, unreachable relays
//! are skipped, and the worst observable failure is a badge key that
//! never resolves.

use thiserror::Error;

/// Errors produced by the engine and its collaborators
#[derive(Debug, Error)]
pub enum EmblemError {
    /// Bad user-supplied identity string; surfaced to the caller
    #[error("Identity decode error: {0}")]
    Decode(String),

    /// A relay-supplied record missing a required tag or with content
    /// that fails structured parsing; dropped, never aborts the stream
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// An inbound frame that does not parse as a relay message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A relay endpoint that could not be reached; the pool as a whole
    /// is unaffected
    #[error("Connection error: {0}")]
    Connection(String),

    /// Should-not-happen conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for emblem operations
pub type Result<T> = std::result::Result<T, EmblemError>;
