//! Utility functions for the matchmaking service

use crate::types::{PairingId, SessionId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique pairing ID
pub fn generate_pairing_id() -> PairingId {
    Uuid::new_v4()
}

/// Generate a new unique session ID to propose to the execution engine
pub fn generate_session_id() -> SessionId {
    format!("session-{}", Uuid::new_v4())
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Reject empty or whitespace-only identifiers
pub fn is_valid_identifier(id: &str) -> bool {
    !id.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_pairing_id();
        let id2 = generate_pairing_id();
        assert_ne!(id1, id2);

        let session1 = generate_session_id();
        let session2 = generate_session_id();
        assert_ne!(session1, session2);
        assert!(session1.starts_with("session-"));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("agent-7"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("   "));
    }
}
