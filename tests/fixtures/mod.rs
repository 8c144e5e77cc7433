//! Test fixtures and session creator doubles for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use pairing_room::error::Result;
use pairing_room::session::SessionCreator;
use pairing_room::types::{CreateSessionRequest, CreatedSession};
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Session creator that takes a while and tracks how many calls overlap
#[derive(Debug)]
pub struct SlowSessionCreator {
    delay: Duration,
    next_port: AtomicU16,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<CreateSessionRequest>>,
}

impl SlowSessionCreator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_port: AtomicU16::new(10_000),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Highest number of calls that were running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn get_requests(&self) -> Vec<CreateSessionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionCreator for SlowSessionCreator {
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(CreatedSession {
            session_id: request.session_id,
            session_port: self.next_port.fetch_add(1, Ordering::SeqCst),
        })
    }
}

/// Session creator that fails every `period`-th call (1-based)
#[derive(Debug)]
pub struct FlakySessionCreator {
    period: usize,
    calls: AtomicUsize,
    failures: AtomicUsize,
}

impl FlakySessionCreator {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionCreator for FlakySessionCreator {
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call % self.period == 0 {
            self.failures.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("engine overloaded");
        }

        Ok(CreatedSession {
            session_id: request.session_id,
            session_port: 20_000 + (call % 1000) as u16,
        })
    }
}

/// Participant ids `prefix-0 .. prefix-(count-1)`
pub fn participant_ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}-{}", prefix, i)).collect()
}
