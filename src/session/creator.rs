//! Session creator trait and an in-process test double

use crate::error::Result;
use crate::types::{CreateSessionRequest, CreatedSession};
use async_trait::async_trait;
use std::sync::Mutex;

/// Capability for allocating a head-to-head session in the execution engine.
///
/// Implementations must bound their own latency and must not leave a
/// partially created session behind when they return an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionCreator: Send + Sync {
    /// Create a session for the two participants, in role order.
    /// Returns the engine's session id and the port clients connect to.
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession>;
}

/// Session creator that records every request and can be told to fail
#[derive(Debug)]
pub struct RecordingSessionCreator {
    requests: Mutex<Vec<CreateSessionRequest>>,
    failures_remaining: Mutex<usize>,
    always_fail: bool,
    base_port: u16,
}

impl RecordingSessionCreator {
    pub fn new() -> Self {
        Self::with_base_port(9000)
    }

    /// Allocate ports starting at `base_port`, one per created session
    pub fn with_base_port(base_port: u16) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failures_remaining: Mutex::new(0),
            always_fail: false,
            base_port,
        }
    }

    /// A creator whose every call fails
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::new()
        }
    }

    /// Make the next `count` calls fail
    pub fn fail_next(&self, count: usize) {
        if let Ok(mut remaining) = self.failures_remaining.lock() {
            *remaining = count;
        }
    }

    /// Get all requests received so far (for testing)
    pub fn get_requests(&self) -> Vec<CreateSessionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of calls received, successful or not
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    fn should_fail(&self) -> bool {
        if self.always_fail {
            return true;
        }
        match self.failures_remaining.lock() {
            Ok(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for RecordingSessionCreator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionCreator for RecordingSessionCreator {
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        let call_index = {
            let mut requests = self.requests.lock().map_err(|_| {
                crate::error::MatchmakingError::InternalError {
                    message: "Failed to acquire session requests lock".to_string(),
                }
            })?;
            requests.push(request.clone());
            requests.len() - 1
        };

        if self.should_fail() {
            anyhow::bail!("engine unavailable for session {}", request.session_id);
        }

        Ok(CreatedSession {
            session_id: request.session_id,
            session_port: self.base_port.wrapping_add(call_index as u16),
        })
    }
}
