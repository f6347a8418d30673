//! Session engine error types.
//!
//! Every command either succeeds or fails with one of these kinds while
//! leaving the session state and history untouched. The UI layer is
//! expected to translate kinds into user-facing messages; nothing here
//! carries presentation text.

use thiserror::Error;
use uuid::Uuid;

use crate::session::SessionState;

/// Errors produced by the session engine, store, and manager.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A command was issued in a state that forbids it.
    #[error("'{command}' is not allowed while the session is {state}")]
    InvalidState {
        command: &'static str,
        state: SessionState,
    },

    /// A submission was malformed (wrong question, wrong answer shape).
    #[error("invalid submission: {0}")]
    Validation(String),

    /// Free-text content was rejected by the profanity filter.
    #[error("content rejected: {reason}")]
    ContentRejected { reason: String },

    /// A persisted or imported snapshot failed an integrity check.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// A snapshot declared a schema version newer than we support.
    #[error("unsupported snapshot schema version {found} (max supported: {max})")]
    UnsupportedVersion { found: u32, max: u32 },

    /// The durable store failed; the in-memory session is unaffected.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No live or persisted session exists for this identifier.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// A store operation is in flight for this session; the command was
    /// rejected rather than queued.
    #[error("session {0} has a store operation in flight")]
    SessionBusy(Uuid),

    /// The session identifier is already represented by a live instance.
    #[error("session {0} is already resident in memory")]
    SessionAlreadyLive(Uuid),

    /// The profile already owns a live session.
    #[error("profile '{0}' already has a live session")]
    ProfileBusy(String),

    /// The requested question bank is not registered.
    #[error("question bank not found: {0}")]
    BankNotFound(String),
}

impl SessionError {
    /// Stable machine-readable kind, used for logging and for the UI
    /// layer's message translation.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::InvalidState { .. } => "invalid_state",
            SessionError::Validation(_) => "validation",
            SessionError::ContentRejected { .. } => "content_rejected",
            SessionError::CorruptSnapshot(_) => "corrupt_snapshot",
            SessionError::UnsupportedVersion { .. } => "unsupported_version",
            SessionError::Storage(_) => "storage",
            SessionError::SessionNotFound(_) => "session_not_found",
            SessionError::SessionBusy(_) => "session_busy",
            SessionError::SessionAlreadyLive(_) => "session_already_live",
            SessionError::ProfileBusy(_) => "profile_busy",
            SessionError::BankNotFound(_) => "bank_not_found",
        }
    }

    /// Returns `true` if the command may simply be retried or corrected
    /// by the caller without touching the session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SessionError::CorruptSnapshot(_) | SessionError::UnsupportedVersion { .. }
        )
    }
}

/// Errors from the durable store backend.
///
/// Propagated unchanged through the store and manager so callers can
/// distinguish I/O failure from data corruption.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying I/O operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend is unreachable or refused the operation.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let err = SessionError::Validation("empty answer".into());
        assert_eq!(err.kind(), "validation");

        let err = SessionError::UnsupportedVersion { found: 9, max: 2 };
        assert_eq!(err.kind(), "unsupported_version");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn storage_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SessionError::from(StorageError::from(io));
        assert_eq!(err.kind(), "storage");
        assert!(err.is_recoverable());
    }
}
