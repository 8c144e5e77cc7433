//! Queue, pairing table and participant index owned by the engine
//!
//! The three collections only change together through the methods here so
//! that a queued participant is never also indexed, and every pairing is
//! reachable from both of its participants.

use crate::types::{Pairing, PairingId, Participant, ParticipantId, QueueStats};
use std::collections::{HashMap, VecDeque};

/// Running totals since the engine was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineTotals {
    /// Participants appended to the queue
    pub participants_enqueued: u64,
    /// Pairings committed after a successful session creation
    pub pairings_created: u64,
    /// Session creation attempts that were rolled back
    pub session_failures: u64,
    /// Participants that left the queue via withdraw
    pub withdrawals: u64,
    /// Pairings removed by cleanup
    pub pairings_removed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct MatchmakingState {
    queue: VecDeque<Participant>,
    pairings: HashMap<PairingId, Pairing>,
    index: HashMap<ParticipantId, PairingId>,
    totals: EngineTotals,
}

impl MatchmakingState {
    pub(crate) fn pairing_for(&self, participant_id: &str) -> Option<&Pairing> {
        self.index
            .get(participant_id)
            .and_then(|pairing_id| self.pairings.get(pairing_id))
    }

    pub(crate) fn pairing(&self, pairing_id: &PairingId) -> Option<&Pairing> {
        self.pairings.get(pairing_id)
    }

    pub(crate) fn pairing_mut(&mut self, pairing_id: &PairingId) -> Option<&mut Pairing> {
        self.pairings.get_mut(pairing_id)
    }

    pub(crate) fn indexed_pairing_id(&self, participant_id: &str) -> Option<PairingId> {
        self.index.get(participant_id).copied()
    }

    /// Drop an index entry whose pairing record no longer exists.
    /// Returns true when an entry was removed.
    pub(crate) fn clear_dangling_index(&mut self, participant_id: &str) -> bool {
        match self.index.get(participant_id) {
            Some(pairing_id) if !self.pairings.contains_key(pairing_id) => {
                self.index.remove(participant_id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn queue_position(&self, participant_id: &str) -> Option<usize> {
        self.queue
            .iter()
            .position(|p| p.participant_id == participant_id)
    }

    pub(crate) fn push_back(&mut self, participant: Participant) {
        self.queue.push_back(participant);
        self.totals.participants_enqueued += 1;
    }

    /// Pop the two oldest entries, or leave the queue untouched
    pub(crate) fn pop_pair(&mut self) -> Option<(Participant, Participant)> {
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;
        Some((first, second))
    }

    /// Put a popped pair back at the head, keeping their relative order
    pub(crate) fn restore_front(&mut self, first: Participant, second: Participant) {
        self.queue.push_front(second);
        self.queue.push_front(first);
        self.totals.session_failures += 1;
    }

    pub(crate) fn insert_pairing(&mut self, pairing: Pairing) {
        let pairing_id = pairing.pairing_id;
        for participant_id in pairing.participant_ids() {
            self.index.insert(participant_id.to_string(), pairing_id);
        }
        self.pairings.insert(pairing_id, pairing);
        self.totals.pairings_created += 1;
    }

    /// Remove a pairing record and both of its index entries
    pub(crate) fn remove_pairing(&mut self, pairing_id: &PairingId) -> Option<Pairing> {
        let pairing = self.pairings.remove(pairing_id)?;
        for participant_id in pairing.participant_ids() {
            // Only drop entries that still point here
            if self.index.get(participant_id) == Some(pairing_id) {
                self.index.remove(participant_id);
            }
        }
        self.totals.pairings_removed += 1;
        Some(pairing)
    }

    /// Remove a waiting participant, keeping everyone else in order
    pub(crate) fn withdraw(&mut self, participant_id: &str) -> Option<Participant> {
        let position = self.queue_position(participant_id)?;
        let removed = self.queue.remove(position);
        if removed.is_some() {
            self.totals.withdrawals += 1;
        }
        removed
    }

    pub(crate) fn stats(&self) -> QueueStats {
        QueueStats {
            queue_length: self.queue.len(),
            active_pairings: self.pairings.len(),
        }
    }

    pub(crate) fn totals(&self) -> EngineTotals {
        self.totals
    }

    pub(crate) fn queued(&self) -> Vec<Participant> {
        self.queue.iter().cloned().collect()
    }

    pub(crate) fn pairings(&self) -> Vec<Pairing> {
        self.pairings.values().cloned().collect()
    }

    /// Describe the first broken cross-structure invariant, if any
    pub(crate) fn invariant_violation(&self) -> Option<String> {
        let mut seen = std::collections::HashSet::new();
        for participant in &self.queue {
            if !seen.insert(participant.participant_id.as_str()) {
                return Some(format!(
                    "participant '{}' queued more than once",
                    participant.participant_id
                ));
            }
            if self.index.contains_key(&participant.participant_id) {
                return Some(format!(
                    "participant '{}' is both queued and paired",
                    participant.participant_id
                ));
            }
        }

        for (pairing_id, pairing) in &self.pairings {
            for participant_id in pairing.participant_ids() {
                if self.index.get(participant_id) != Some(pairing_id) {
                    return Some(format!(
                        "pairing {} not indexed for participant '{}'",
                        pairing_id, participant_id
                    ));
                }
            }
        }

        for (participant_id, pairing_id) in &self.index {
            match self.pairings.get(pairing_id) {
                Some(pairing) if pairing.contains(participant_id) => {}
                Some(_) => {
                    return Some(format!(
                        "participant '{}' indexed to pairing {} that does not contain them",
                        participant_id, pairing_id
                    ))
                }
                None => {
                    return Some(format!(
                        "participant '{}' indexed to missing pairing {}",
                        participant_id, pairing_id
                    ))
                }
            }
        }

        None
    }

    #[cfg(test)]
    pub(crate) fn insert_dangling_index(&mut self, participant_id: &str, pairing_id: PairingId) {
        self.index.insert(participant_id.to_string(), pairing_id);
    }
}
