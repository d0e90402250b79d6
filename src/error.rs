//! Error types for vtmock.

use std::fmt;

use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Distinguishes why a call on a mocked instance could not be served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnexpectedKind {
    /// No stub exists for the invoked method at all.
    Unmocked,
    /// Stubs exist for the method, but none accepted the call's arguments
    /// (or every accepting stub had exhausted its recorded actions).
    Unmatched,
}

impl fmt::Display for UnexpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnexpectedKind::Unmocked => write!(f, "unmocked"),
            UnexpectedKind::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Errors that can occur while stubbing, invoking, or verifying mocks.
///
/// Unexpected-call errors are raised from inside a vtable trampoline, where
/// no `Result` channel exists; they are delivered as a panic carrying the
/// rendered message, which test harnesses surface as an ordinary failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} method call: {class}::{method}{args}")]
    UnexpectedCall {
        kind: UnexpectedKind,
        class: &'static str,
        method: String,
        args: String,
    },

    #[error(
        "sequence verification failed at {location}: expected {expected} \
         of [{sequence}], found {actual}"
    )]
    SequenceVerification {
        sequence: String,
        expected: String,
        actual: u64,
        location: String,
    },

    #[error("expected no more invocations, but found: {}", unverified.join(", "))]
    NoMoreInvocations { unverified: Vec<String> },

    #[error("type {0} has no virtual destructor")]
    NoVirtualDestructor(&'static str),

    #[error("unsupported layout for {class}: {reason}")]
    UnsupportedLayout {
        class: &'static str,
        reason: String,
    },
}
