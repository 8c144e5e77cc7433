//! Common types used throughout the matchmaking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for queued participants (agents)
pub type ParticipantId = String;

/// Identifier of the model a participant plays with
pub type ModelId = String;

/// Unique identifier for pairings
pub type PairingId = Uuid;

/// Identifier of a session allocated by the execution engine
pub type SessionId = String;

/// A participant waiting in, or paired out of, the matchmaking queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: ParticipantId,
    pub model_id: ModelId,
    pub joined_at: DateTime<Utc>,
    /// Set once, at the moment the participant is paired
    pub matched_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(participant_id: ParticipantId, model_id: ModelId) -> Self {
        Self {
            participant_id,
            model_id,
            joined_at: Utc::now(),
            matched_at: None,
        }
    }
}

/// Lifecycle of a pairing. Only `Matched` is set by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStatus {
    Matched,
    InProgress,
    Completed,
    Error,
}

impl std::fmt::Display for PairingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairingStatus::Matched => write!(f, "matched"),
            PairingStatus::InProgress => write!(f, "in_progress"),
            PairingStatus::Completed => write!(f, "completed"),
            PairingStatus::Error => write!(f, "error"),
        }
    }
}

/// Role a participant plays inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

/// Two participants joined into an engine session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub pairing_id: PairingId,
    /// The longer-waiting participant (queue head at pairing time)
    pub participant_a: Participant,
    pub participant_b: Participant,
    pub session_id: SessionId,
    pub session_port: u16,
    pub first_participant_id: ParticipantId,
    pub second_participant_id: ParticipantId,
    pub created_at: DateTime<Utc>,
    pub status: PairingStatus,
}

impl Pairing {
    /// Whether the participant is one of the two sides
    pub fn contains(&self, participant_id: &str) -> bool {
        self.participant_a.participant_id == participant_id
            || self.participant_b.participant_id == participant_id
    }

    /// Role assigned to the participant, if they belong to this pairing
    pub fn side_of(&self, participant_id: &str) -> Option<Side> {
        if self.first_participant_id == participant_id {
            Some(Side::First)
        } else if self.second_participant_id == participant_id {
            Some(Side::Second)
        } else {
            None
        }
    }

    /// The other side of the pairing, seen from the given participant
    pub fn opponent_of(&self, participant_id: &str) -> Option<&Participant> {
        if self.participant_a.participant_id == participant_id {
            Some(&self.participant_b)
        } else if self.participant_b.participant_id == participant_id {
            Some(&self.participant_a)
        } else {
            None
        }
    }

    /// Both participant ids, oldest first
    pub fn participant_ids(&self) -> [&str; 2] {
        [
            self.participant_a.participant_id.as_str(),
            self.participant_b.participant_id.as_str(),
        ]
    }
}

/// Result of a status lookup for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStatus {
    pub pairing: Option<Pairing>,
    /// 0-based queue position, or -1 when paired or unknown
    pub queue_position: i64,
}

impl ParticipantStatus {
    pub fn paired(pairing: Pairing) -> Self {
        Self {
            pairing: Some(pairing),
            queue_position: -1,
        }
    }

    pub fn queued(position: usize) -> Self {
        Self {
            pairing: None,
            queue_position: position as i64,
        }
    }

    pub fn unknown() -> Self {
        Self {
            pairing: None,
            queue_position: -1,
        }
    }

    pub fn is_queued(&self) -> bool {
        self.pairing.is_none() && self.queue_position >= 0
    }
}

/// Snapshot of queue occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queue_length: usize,
    pub active_pairings: usize,
}

/// Arguments handed to the session-creation collaborator, in role order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub session_id: SessionId,
    pub first_participant_id: ParticipantId,
    pub first_model_id: ModelId,
    pub second_participant_id: ParticipantId,
    pub second_model_id: ModelId,
}

/// Session allocated by the execution engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub session_port: u16,
}

/// Rating change for one model after a recorded outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub old_rating: i32,
    pub new_rating: i32,
}

impl RatingChange {
    pub fn delta(&self) -> i32 {
        self.new_rating - self.old_rating
    }
}

/// Persisted rating update for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub model_id: ModelId,
    pub change: RatingChange,
}

/// Outcome of a finished session, as reported by the surrounding service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner_model_id: ModelId,
    pub loser_model_id: ModelId,
    /// When set, the two models drew and the winner/loser labels are only ordering
    #[serde(default)]
    pub is_draw: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pairing() -> Pairing {
        let a = Participant::new("alice".to_string(), "m-1".to_string());
        let b = Participant::new("bob".to_string(), "m-2".to_string());
        Pairing {
            pairing_id: Uuid::new_v4(),
            first_participant_id: b.participant_id.clone(),
            second_participant_id: a.participant_id.clone(),
            participant_a: a,
            participant_b: b,
            session_id: "session-1".to_string(),
            session_port: 9000,
            created_at: Utc::now(),
            status: PairingStatus::Matched,
        }
    }

    #[test]
    fn test_side_and_opponent_lookup() {
        let pairing = test_pairing();

        assert_eq!(pairing.side_of("bob"), Some(Side::First));
        assert_eq!(pairing.side_of("alice"), Some(Side::Second));
        assert_eq!(pairing.side_of("carol"), None);

        assert_eq!(pairing.opponent_of("alice").unwrap().model_id, "m-2");
        assert_eq!(pairing.opponent_of("bob").unwrap().model_id, "m-1");
        assert!(pairing.opponent_of("carol").is_none());
        assert!(pairing.contains("alice"));
        assert_eq!(pairing.participant_ids(), ["alice", "bob"]);
    }

    #[test]
    fn test_pairing_status_serialization() {
        let json = serde_json::to_string(&PairingStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(PairingStatus::Matched.to_string(), "matched");
    }

    #[test]
    fn test_participant_status_constructors() {
        assert!(ParticipantStatus::queued(0).is_queued());
        assert!(!ParticipantStatus::unknown().is_queued());
        assert_eq!(ParticipantStatus::unknown().queue_position, -1);
    }

    #[test]
    fn test_match_outcome_draw_defaults_to_false() {
        let outcome: MatchOutcome =
            serde_json::from_str(r#"{"winner_model_id":"a","loser_model_id":"b"}"#).unwrap();
        assert!(!outcome.is_draw);
    }
}
