//! Error types for the matchmaking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to tell error kinds apart
//! recover them with `downcast_ref::<MatchmakingError>()`.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Participant is already in the matchmaking queue: {participant_id}")]
    AlreadyQueued { participant_id: String },

    #[error("Participant not found in the matchmaking queue: {participant_id}")]
    NotQueued { participant_id: String },

    #[error("Participant is not in any pairing: {participant_id}")]
    NotInPairing { participant_id: String },

    #[error("Pairing not found: {pairing_id}")]
    PairingNotFound { pairing_id: String },

    #[error("Failed to create session: {reason}")]
    SessionCreationFailed { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Model not found: {model_id}")]
    ModelNotFound { model_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Find the matchmaking error kind carried by an `anyhow::Error`, if any
    pub fn from_anyhow(error: &anyhow::Error) -> Option<&MatchmakingError> {
        error.downcast_ref::<MatchmakingError>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = MatchmakingError::NotQueued {
            participant_id: "p1".to_string(),
        }
        .into();

        assert_eq!(
            MatchmakingError::from_anyhow(&err),
            Some(&MatchmakingError::NotQueued {
                participant_id: "p1".to_string()
            })
        );
        assert_eq!(
            err.to_string(),
            "Participant not found in the matchmaking queue: p1"
        );
    }

    #[test]
    fn test_foreign_error_has_no_kind() {
        let err = anyhow::anyhow!("socket closed");
        assert!(MatchmakingError::from_anyhow(&err).is_none());
    }
}
