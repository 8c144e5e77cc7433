//! Matchmaking engine: FIFO pairing of waiting participants
//!
//! The engine is a monitor object. One reader/writer lock guards the queue,
//! the pairing table and the participant index as a unit. Enqueue holds the
//! write guard for its whole duration, including the call to the session
//! creator, so no third participant can be paired with a reserved slot while
//! the engine is allocating a session.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::state::{EngineTotals, MatchmakingState};
use crate::metrics::MetricsCollector;
use crate::session::SessionCreator;
use crate::types::{
    CreateSessionRequest, CreatedSession, Pairing, PairingId, PairingStatus, Participant,
    ParticipantStatus, QueueStats,
};
use crate::utils::{current_timestamp, generate_pairing_id, generate_session_id, is_valid_identifier};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The main matchmaking engine
#[derive(Clone)]
pub struct MatchmakingEngine {
    /// Queue, pairings and index, always locked together
    state: Arc<RwLock<MatchmakingState>>,
    /// Collaborator that allocates sessions in the execution engine
    session_creator: Arc<dyn SessionCreator>,
    /// Optional metrics sink
    metrics_collector: Option<Arc<MetricsCollector>>,
}

impl MatchmakingEngine {
    /// Create a new engine around a session creator
    pub fn new(session_creator: Arc<dyn SessionCreator>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MatchmakingState::default())),
            session_creator,
            metrics_collector: None,
        }
    }

    /// Create a new engine that records into the given metrics collector
    pub fn with_metrics(
        session_creator: Arc<dyn SessionCreator>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            metrics_collector: Some(metrics_collector),
            ..Self::new(session_creator)
        }
    }

    /// Add a participant to the queue and pair the two oldest entries if possible.
    ///
    /// Returns `Ok(None)` when the participant is waiting, or the pairing that
    /// now contains them. A participant that is already paired gets their
    /// existing pairing back without any queue change.
    pub async fn enqueue(&self, participant_id: &str, model_id: &str) -> Result<Option<Pairing>> {
        let start_time = Instant::now();

        if !is_valid_identifier(participant_id) || !is_valid_identifier(model_id) {
            self.record_enqueue("rejected", start_time);
            return Err(MatchmakingError::InvalidInput {
                reason: "participant id and model id must be non-empty".to_string(),
            }
            .into());
        }

        info!(
            "Processing enqueue - participant: '{}', model: '{}'",
            participant_id, model_id
        );

        let mut state = self.state.write().await;

        if let Some(existing) = state.pairing_for(participant_id) {
            info!(
                "Participant '{}' already paired in {}, returning existing pairing",
                participant_id, existing.pairing_id
            );
            let existing = existing.clone();
            drop(state);
            self.record_enqueue("rejoined", start_time);
            return Ok(Some(existing));
        }

        if state.clear_dangling_index(participant_id) {
            warn!(
                "Cleared orphaned pairing index entry for participant '{}'",
                participant_id
            );
        }

        if state.queue_position(participant_id).is_some() {
            drop(state);
            self.record_enqueue("rejected", start_time);
            return Err(MatchmakingError::AlreadyQueued {
                participant_id: participant_id.to_string(),
            }
            .into());
        }

        state.push_back(Participant::new(
            participant_id.to_string(),
            model_id.to_string(),
        ));

        let Some((mut oldest, mut next)) = state.pop_pair() else {
            let stats = state.stats();
            drop(state);
            info!(
                "Participant '{}' queued - queue_length: {}, active_pairings: {}",
                participant_id, stats.queue_length, stats.active_pairings
            );
            self.update_gauges(&stats);
            self.record_enqueue("queued", start_time);
            return Ok(None);
        };

        let pairing_id = generate_pairing_id();
        let now = current_timestamp();
        oldest.matched_at = Some(now);
        next.matched_at = Some(now);

        // Fair coin for the two roles
        let oldest_goes_first = rand::random::<bool>();
        let (first, second) = if oldest_goes_first {
            (&oldest, &next)
        } else {
            (&next, &oldest)
        };

        let request = CreateSessionRequest {
            session_id: generate_session_id(),
            first_participant_id: first.participant_id.clone(),
            first_model_id: first.model_id.clone(),
            second_participant_id: second.participant_id.clone(),
            second_model_id: second.model_id.clone(),
        };

        info!(
            "Pairing '{}' with '{}' - pairing: {}, session: {}, first: '{}'",
            oldest.participant_id,
            next.participant_id,
            pairing_id,
            request.session_id,
            request.first_participant_id
        );

        let session_start = Instant::now();
        let session_result = self
            .session_creator
            .create_session(request.clone())
            .await
            .and_then(validate_created_session);
        self.record_session_request(session_result.is_ok(), session_start);

        let created = match session_result {
            Ok(created) => created,
            Err(e) => {
                // Back to the head, as if never popped. Anyone who joined in
                // between ends up behind them.
                oldest.matched_at = None;
                next.matched_at = None;
                let oldest_id = oldest.participant_id.clone();
                let next_id = next.participant_id.clone();
                state.restore_front(oldest, next);
                let stats = state.stats();
                drop(state);

                warn!(
                    "Session creation failed for '{}' vs '{}', restored to queue head: {:#}",
                    oldest_id, next_id, e
                );
                self.update_gauges(&stats);
                self.record_enqueue("failed", start_time);

                return Err(MatchmakingError::SessionCreationFailed {
                    reason: format!("{:#}", e),
                }
                .into());
            }
        };

        let pairing = Pairing {
            pairing_id,
            first_participant_id: request.first_participant_id,
            second_participant_id: request.second_participant_id,
            participant_a: oldest,
            participant_b: next,
            session_id: created.session_id,
            session_port: created.session_port,
            created_at: now,
            status: PairingStatus::Matched,
        };

        state.insert_pairing(pairing.clone());
        let stats = state.stats();
        drop(state);

        info!(
            "Pairing {} created - session: {}, port: {}, queue_length: {}, active_pairings: {}",
            pairing.pairing_id,
            pairing.session_id,
            pairing.session_port,
            stats.queue_length,
            stats.active_pairings
        );

        if let Some(metrics) = &self.metrics_collector {
            for participant in [&pairing.participant_a, &pairing.participant_b] {
                if let Ok(waited) = (now - participant.joined_at).to_std() {
                    metrics.record_queue_wait(waited);
                }
            }
        }
        self.update_gauges(&stats);
        self.record_enqueue("paired", start_time);

        Ok(Some(pairing))
    }

    /// Look up a participant's pairing, or their 0-based queue position
    pub async fn status(&self, participant_id: &str) -> Result<ParticipantStatus> {
        let state = self.state.read().await;

        if let Some(pairing) = state.pairing_for(participant_id) {
            debug!(
                "Status for '{}': paired in {}",
                participant_id, pairing.pairing_id
            );
            return Ok(ParticipantStatus::paired(pairing.clone()));
        }

        match state.queue_position(participant_id) {
            Some(position) => {
                debug!("Status for '{}': queued at {}", participant_id, position);
                Ok(ParticipantStatus::queued(position))
            }
            None => {
                debug!("Status for '{}': not queued", participant_id);
                Ok(ParticipantStatus::unknown())
            }
        }
    }

    /// Leave the queue. Paired participants cannot withdraw.
    pub async fn withdraw(&self, participant_id: &str) -> Result<()> {
        let mut state = self.state.write().await;

        if state.withdraw(participant_id).is_none() {
            return Err(MatchmakingError::NotQueued {
                participant_id: participant_id.to_string(),
            }
            .into());
        }

        let stats = state.stats();
        drop(state);

        info!(
            "Participant '{}' withdrew - queue_length: {}",
            participant_id, stats.queue_length
        );
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_withdrawal();
        }
        self.update_gauges(&stats);
        Ok(())
    }

    /// Remove a pairing and both participants' index entries
    pub async fn remove_pairing(&self, pairing_id: &PairingId) -> Result<Pairing> {
        let mut state = self.state.write().await;

        let removed =
            state
                .remove_pairing(pairing_id)
                .ok_or_else(|| MatchmakingError::PairingNotFound {
                    pairing_id: pairing_id.to_string(),
                })?;
        let stats = state.stats();
        drop(state);

        info!(
            "Removed pairing {} ('{}' vs '{}') - active_pairings: {}",
            pairing_id,
            removed.participant_a.participant_id,
            removed.participant_b.participant_id,
            stats.active_pairings
        );
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_pairing_removed();
        }
        self.update_gauges(&stats);
        Ok(removed)
    }

    /// Remove the pairing a participant belongs to, both sides at once
    pub async fn remove_participant_pairing(&self, participant_id: &str) -> Result<()> {
        let mut state = self.state.write().await;

        let pairing_id = state.indexed_pairing_id(participant_id).ok_or_else(|| {
            MatchmakingError::NotInPairing {
                participant_id: participant_id.to_string(),
            }
        })?;

        if state.remove_pairing(&pairing_id).is_none() {
            state.clear_dangling_index(participant_id);
            drop(state);
            warn!(
                "Cleared orphaned index entry for '{}' (pairing {} missing)",
                participant_id, pairing_id
            );
            return Ok(());
        }

        let stats = state.stats();
        drop(state);

        info!(
            "Removed pairing {} for participant '{}' - active_pairings: {}",
            pairing_id, participant_id, stats.active_pairings
        );
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_pairing_removed();
        }
        self.update_gauges(&stats);
        Ok(())
    }

    /// Record an externally observed lifecycle state for a pairing
    pub async fn set_pairing_status(
        &self,
        pairing_id: &PairingId,
        status: PairingStatus,
    ) -> Result<Pairing> {
        let mut state = self.state.write().await;

        let pairing =
            state
                .pairing_mut(pairing_id)
                .ok_or_else(|| MatchmakingError::PairingNotFound {
                    pairing_id: pairing_id.to_string(),
                })?;

        let previous = pairing.status;
        pairing.status = status;
        let updated = pairing.clone();
        drop(state);

        info!(
            "Pairing {} status changed: {} -> {}",
            pairing_id, previous, status
        );
        Ok(updated)
    }

    /// Get a pairing by ID
    pub async fn get_pairing(&self, pairing_id: &PairingId) -> Option<Pairing> {
        let state = self.state.read().await;
        state.pairing(pairing_id).cloned()
    }

    /// Snapshot of all active pairings
    pub async fn get_all_pairings(&self) -> Vec<Pairing> {
        let state = self.state.read().await;
        state.pairings()
    }

    /// Snapshot of the waiting queue, oldest first
    pub async fn queued_participants(&self) -> Vec<Participant> {
        let state = self.state.read().await;
        state.queued()
    }

    /// Current queue length and number of active pairings
    pub async fn stats(&self) -> QueueStats {
        let state = self.state.read().await;
        state.stats()
    }

    /// Running totals since the engine was created
    pub async fn totals(&self) -> EngineTotals {
        let state = self.state.read().await;
        state.totals()
    }

    /// Check the cross-structure invariants; used by health checks and tests
    pub async fn verify_invariants(&self) -> Result<()> {
        let state = self.state.read().await;
        match state.invariant_violation() {
            Some(violation) => Err(MatchmakingError::InternalError {
                message: format!("Matchmaking state inconsistent: {}", violation),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn update_gauges(&self, stats: &QueueStats) {
        if let Some(metrics) = &self.metrics_collector {
            metrics.update_from_queue_stats(stats);
        }
    }

    fn record_enqueue(&self, outcome: &str, start_time: Instant) {
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_enqueue(outcome, start_time.elapsed());
        }
    }

    fn record_session_request(&self, success: bool, start_time: Instant) {
        if let Some(metrics) = &self.metrics_collector {
            metrics.record_session_request(success, start_time.elapsed());
        }
    }

    #[cfg(test)]
    async fn corrupt_with_dangling_index(&self, participant_id: &str) -> PairingId {
        let pairing_id = generate_pairing_id();
        self.state
            .write()
            .await
            .insert_dangling_index(participant_id, pairing_id);
        pairing_id
    }
}

/// Enforce the collaborator contract: non-empty session id, positive port
fn validate_created_session(created: CreatedSession) -> Result<CreatedSession> {
    if !is_valid_identifier(&created.session_id) {
        anyhow::bail!("engine returned an empty session id");
    }
    if created.session_port == 0 {
        anyhow::bail!(
            "engine returned port 0 for session {}",
            created.session_id
        );
    }
    Ok(created)
}
