//! Health check functionality
//!
//! This module provides health checks for the pairing-room service,
//! including readiness and liveness probes and a structured health report.

use crate::matchmaking::MatchmakingEngine;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error};

/// How long a probe waits for the matchmaking state before calling it busy
const STATE_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Numeric value exported as the health gauge (2 = healthy)
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn combine(self, other: HealthStatus) -> HealthStatus {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// The parts of a running service that health checks look at
#[derive(Clone)]
pub struct ServiceHandle {
    name: String,
    engine: MatchmakingEngine,
    is_running: Arc<RwLock<bool>>,
    started_at: Instant,
}

impl ServiceHandle {
    pub fn new(name: impl Into<String>, engine: MatchmakingEngine, is_running: Arc<RwLock<bool>>) -> Self {
        Self {
            name: name.into(),
            engine,
            is_running,
            started_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &MatchmakingEngine {
        &self.engine
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Participants currently waiting
    pub queue_length: usize,
    /// Pairings not yet cleaned up
    pub active_pairings: usize,
    /// Participants ever appended to the queue
    pub participants_enqueued: u64,
    /// Pairings created since service start
    pub pairings_created: u64,
    /// Session creation attempts rolled back
    pub session_failures: u64,
    /// Withdrawals since service start
    pub withdrawals: u64,
    /// Pairings removed by cleanup
    pub pairings_removed: u64,
    /// Seconds since the service was assembled
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(handle: &ServiceHandle) -> Result<Self> {
        let service_check = Self::check_service_running(handle).await;
        let state_check = Self::check_matchmaking_state(handle).await;

        let status = service_check.status.combine(state_check.status);
        let stats = Self::gather_service_stats(handle).await;

        Ok(HealthCheck {
            status,
            service: handle.name().to_string(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![service_check, state_check],
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(handle: &ServiceHandle) -> Result<HealthStatus> {
        if handle.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify service can handle requests
    pub async fn readiness_check(handle: &ServiceHandle) -> Result<HealthStatus> {
        if !handle.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }
        Ok(Self::check_matchmaking_state(handle).await.status)
    }

    /// Check if service is running
    async fn check_service_running(handle: &ServiceHandle) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if handle.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Check the queue, pairing table and index agree with each other
    async fn check_matchmaking_state(handle: &ServiceHandle) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) =
            match tokio::time::timeout(STATE_PROBE_TIMEOUT, handle.engine().verify_invariants())
                .await
            {
                Ok(Ok(())) => (HealthStatus::Healthy, None),
                Ok(Err(e)) => {
                    error!("Matchmaking state check failed: {}", e);
                    (HealthStatus::Unhealthy, Some(e.to_string()))
                }
                // An enqueue is holding the lock across a slow session call
                Err(_) => (
                    HealthStatus::Degraded,
                    Some("Matchmaking state busy".to_string()),
                ),
            };

        ComponentCheck {
            name: "matchmaking_state".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Gather current service statistics
    async fn gather_service_stats(handle: &ServiceHandle) -> ServiceStats {
        let engine = handle.engine();
        let read = async { (engine.stats().await, engine.totals().await) };

        match tokio::time::timeout(STATE_PROBE_TIMEOUT, read).await {
            Ok((stats, totals)) => ServiceStats {
                queue_length: stats.queue_length,
                active_pairings: stats.active_pairings,
                participants_enqueued: totals.participants_enqueued,
                pairings_created: totals.pairings_created,
                session_failures: totals.session_failures,
                withdrawals: totals.withdrawals,
                pairings_removed: totals.pairings_removed,
                uptime_seconds: handle.uptime().as_secs(),
            },
            Err(_) => {
                debug!("Timed out reading engine stats for health check");
                ServiceStats {
                    uptime_seconds: handle.uptime().as_secs(),
                    ..ServiceStats::default()
                }
            }
        }
    }
}

/// Convert health check to JSON string
impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
