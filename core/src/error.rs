//! Top-level error taxonomy (§7).
//!
//! Every fallible operation in this crate returns `Result<T, Error>` (or a
//! narrower error type that converts into it at the module boundary).
//! `thiserror` is used here rather than hand-rolled `Display`/`Error` impls
//! (the pattern the donor workspace's smaller `consensus::error` module
//! uses) because this taxonomy spans eight kinds across five subsystems,
//! where deriving saves real repetition.

use thiserror::Error as ThisError;

/// Sub-kinds of RPC authentication failure (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidTimestamp,
    TimestampOutOfRange,
    BadSignature,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthErrorKind::InvalidTimestamp => "invalid_timestamp",
            AuthErrorKind::TimestampOutOfRange => "timestamp_out_of_range",
            AuthErrorKind::BadSignature => "bad_signature",
        };
        f.write_str(s)
    }
}

/// The error kinds surfaced by this crate (§7).
#[derive(Debug, ThisError)]
pub enum Error {
    /// Malformed xmif, block, or config.
    #[error("bad format: {0}")]
    BadFormat(String),

    /// Rejected at the RPC authentication boundary.
    #[error("auth failed: {0}")]
    AuthFailed(AuthErrorKind),

    /// Inbound block breaks the index/prev-hash chain invariant.
    #[error("chain mismatch: {0}")]
    ChainMismatch(String),

    /// Confirmations fail verification or fall short of `N_required`.
    #[error("PoD invalid: {0}")]
    PodInvalid(String),

    /// Concurrent append attempt lost the ledger lock race; caller retries.
    #[error("conflicting concurrent append")]
    Conflict,

    /// Puzzle loop hit its attempt cap; caller recomputes difficulty.
    #[error("puzzle search exhausted")]
    Exhausted,

    /// Network/timeout errors, always recoverable by the caller.
    #[error("transport error: {0}")]
    Transport(String),

    /// Corrupted ledger tail or unreadable store; terminal.
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::BadFormat(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Fatal(e.to_string())
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
