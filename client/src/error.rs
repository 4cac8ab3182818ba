//! Error types for the transport boundary and the session manager

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`crate::transport`] implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),
    #[error("join rejected: {0}")]
    Rejected(String),
    #[error("channel closed")]
    Closed,
}

/// Caller-visible failures of session lifecycle operations.
///
/// Connection and join failures are recoverable: the manager is left in the
/// "not connected" / "not joined" state and the caller may retry.
/// `PreconditionViolation` marks a call-site bug, not a transient fault.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection failure: {0}")]
    ConnectionFailure(String),
    #[error("join rejected: {0}")]
    JoinRejected(String),
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),
}

impl SessionError {
    pub(crate) fn connect_timeout(after: Duration) -> Self {
        SessionError::ConnectionFailure(format!("timed out after {:?}", after))
    }

    pub(crate) fn join_timeout(after: Duration) -> Self {
        SessionError::JoinRejected(format!("no answer within {:?}", after))
    }

    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, SessionError::PreconditionViolation(_))
    }
}
