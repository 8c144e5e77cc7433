//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the pairing-room
//! matchmaking service using Prometheus metrics.

use crate::types::QueueStats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue and pairing metrics
    queue_metrics: QueueMetrics,

    /// Session creation metrics
    session_metrics: SessionMetrics,

    /// Rating update metrics
    rating_metrics: RatingMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Queue and pairing metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Participants currently waiting
    pub queue_length: IntGauge,

    /// Pairings currently held by the engine
    pub active_pairings: IntGauge,

    /// Enqueue calls by outcome (queued, paired, rejoined, rejected, failed)
    pub enqueue_total: IntCounterVec,

    /// Participants that left the queue voluntarily
    pub withdrawals_total: IntCounter,

    /// Pairings removed by cleanup
    pub pairings_removed_total: IntCounter,

    /// Enqueue call duration, including session creation
    pub enqueue_duration: Histogram,

    /// Time a participant waited in the queue before being paired
    pub queue_wait_time_seconds: Histogram,
}

/// Session creation metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Session creation attempts by status
    pub session_requests_total: IntCounterVec,

    /// Session creation call latency
    pub session_request_duration: Histogram,
}

/// Rating update metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Recorded outcomes by kind (win, draw)
    pub rating_updates_total: IntCounterVec,

    /// Rating update failures
    pub rating_update_failures_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            session_metrics,
            rating_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get session metrics
    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    /// Get rating metrics
    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    /// Update gauges from an engine stats snapshot
    pub fn update_from_queue_stats(&self, stats: &QueueStats) {
        self.queue_metrics
            .queue_length
            .set(stats.queue_length as i64);
        self.queue_metrics
            .active_pairings
            .set(stats.active_pairings as i64);
    }

    /// Record one enqueue call
    pub fn record_enqueue(&self, outcome: &str, duration: Duration) {
        self.queue_metrics
            .enqueue_total
            .with_label_values(&[outcome])
            .inc();

        self.queue_metrics
            .enqueue_duration
            .observe(duration.as_secs_f64());
    }

    /// Record how long a participant waited before being paired
    pub fn record_queue_wait(&self, waited: Duration) {
        self.queue_metrics
            .queue_wait_time_seconds
            .observe(waited.as_secs_f64());
    }

    /// Record one session creation call against the engine
    pub fn record_session_request(&self, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };

        self.session_metrics
            .session_requests_total
            .with_label_values(&[status])
            .inc();

        self.session_metrics
            .session_request_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a withdrawal from the queue
    pub fn record_withdrawal(&self) {
        self.queue_metrics.withdrawals_total.inc();
    }

    /// Record a pairing removed by cleanup
    pub fn record_pairing_removed(&self) {
        self.queue_metrics.pairings_removed_total.inc();
    }

    /// Record a persisted rating update
    pub fn record_rating_update(&self, is_draw: bool) {
        let kind = if is_draw { "draw" } else { "win" };
        self.rating_metrics
            .rating_updates_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record a failed rating update
    pub fn record_rating_failure(&self) {
        self.rating_metrics.rating_update_failures_total.inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("pairing_room_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "pairing_room_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("pairing_room_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let queue_length = IntGauge::new(
            "pairing_room_queue_length",
            "Participants currently waiting in the queue",
        )?;
        registry.register(Box::new(queue_length.clone()))?;

        let active_pairings = IntGauge::new(
            "pairing_room_active_pairings",
            "Pairings currently held by the engine",
        )?;
        registry.register(Box::new(active_pairings.clone()))?;

        let enqueue_total = IntCounterVec::new(
            Opts::new("pairing_room_enqueue_total", "Enqueue calls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(enqueue_total.clone()))?;

        let withdrawals_total = IntCounter::new(
            "pairing_room_withdrawals_total",
            "Participants that withdrew from the queue",
        )?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let pairings_removed_total = IntCounter::new(
            "pairing_room_pairings_removed_total",
            "Pairings removed by cleanup",
        )?;
        registry.register(Box::new(pairings_removed_total.clone()))?;

        let enqueue_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pairing_room_enqueue_duration_seconds",
                "Enqueue processing time",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(enqueue_duration.clone()))?;

        let queue_wait_time_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pairing_room_queue_wait_time_seconds",
                "Time spent waiting before being paired",
            )
            .buckets(vec![0.1, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;
        registry.register(Box::new(queue_wait_time_seconds.clone()))?;

        Ok(Self {
            queue_length,
            active_pairings,
            enqueue_total,
            withdrawals_total,
            pairings_removed_total,
            enqueue_duration,
            queue_wait_time_seconds,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let session_requests_total = IntCounterVec::new(
            Opts::new(
                "pairing_room_session_requests_total",
                "Session creation attempts against the engine",
            ),
            &["status"],
        )?;
        registry.register(Box::new(session_requests_total.clone()))?;

        let session_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pairing_room_session_request_duration_seconds",
                "Session creation latency",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(session_request_duration.clone()))?;

        Ok(Self {
            session_requests_total,
            session_request_duration,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_updates_total = IntCounterVec::new(
            Opts::new(
                "pairing_room_rating_updates_total",
                "Recorded outcomes applied to ratings",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(rating_updates_total.clone()))?;

        let rating_update_failures_total = IntCounter::new(
            "pairing_room_rating_update_failures_total",
            "Rating updates that failed",
        )?;
        registry.register(Box::new(rating_update_failures_total.clone()))?;

        Ok(Self {
            rating_updates_total,
            rating_update_failures_total,
        })
    }
}
