//! Error types for px-session.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for px-session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Token signature did not match the configured secret.
    #[error("token integrity check failed")]
    Integrity,

    /// Token bytes could not be interpreted as a session record.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Transported value is not a session identifier.
    #[error("invalid session identifier: {0}")]
    InvalidIdentifier(String),

    /// Caller tried to write or remove an engine-managed key.
    #[error("reserved session key: {0}")]
    ReservedKey(String),

    /// Store I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// A store call offloaded to the blocking pool did not complete.
    #[error("store worker failed: {0}")]
    Worker(String),
}

impl SessionError {
    /// Whether the caller should treat this error as "no session" and start
    /// a fresh one instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::Integrity
                | SessionError::MalformedToken(_)
                | SessionError::InvalidIdentifier(_)
        )
    }
}

/// Convenience Result type for px-session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_display() {
        let err = SessionError::Integrity;
        assert!(err.to_string().contains("integrity"));
    }

    #[test]
    fn test_malformed_display() {
        let err = SessionError::MalformedToken("missing _sid".into());
        assert!(err.to_string().contains("malformed"));
        assert!(err.to_string().contains("missing _sid"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SessionError = io_err.into();
        assert!(matches!(err, SessionError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(SessionError::Integrity.is_recoverable());
        assert!(SessionError::MalformedToken("x".into()).is_recoverable());
        assert!(SessionError::InvalidIdentifier("x".into()).is_recoverable());

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(!SessionError::Io(io_err).is_recoverable());
        assert!(!SessionError::ReservedKey("_sid".into()).is_recoverable());
        assert!(!SessionError::LockPoisoned.is_recoverable());
    }

    #[test]
    fn test_reserved_key_display() {
        let err = SessionError::ReservedKey("_ttl".into());
        assert!(err.to_string().contains("_ttl"));
    }
}
