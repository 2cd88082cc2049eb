//! Session error types.

use thiserror::Error;

/// Errors produced by stores, sessions and propagators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No live session exists for the id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The session exists but has no value under the key.
    #[error("session key not found: {0}")]
    KeyNotFound(String),

    /// The request carried no session identifier.
    #[error("no session cookie named {0}")]
    MissingCookie(String),

    /// The session identifier could not be written to the response.
    #[error("invalid session header value: {0}")]
    InvalidHeader(String),

    /// A backing store failed.
    #[error("session store error: {0}")]
    Store(String),
}

impl SessionError {
    /// Returns `true` when the failure means "there is no session".
    ///
    /// Handlers typically answer these with `401` and everything else with `500`.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MissingCookie(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            SessionError::NotFound("abc".into()).to_string(),
            "session not found: abc"
        );
        assert_eq!(
            SessionError::MissingCookie("sessId".into()).to_string(),
            "no session cookie named sessId"
        );
    }

    #[test]
    fn test_is_missing() {
        assert!(SessionError::NotFound("a".into()).is_missing());
        assert!(SessionError::MissingCookie("sessId".into()).is_missing());
        assert!(!SessionError::KeyNotFound("nickname".into()).is_missing());
        assert!(!SessionError::Store("down".into()).is_missing());
    }
}
