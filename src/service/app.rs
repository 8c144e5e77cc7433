//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the matchmaking
//! engine, the engine HTTP client, the rating workflow and metrics together,
//! and runs the background tasks.

use crate::config::AppConfig;
use crate::matchmaking::MatchmakingEngine;
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector, MetricsService};
use crate::rating::{InMemoryRatingStorage, RatingService};
use crate::service::health::{HealthCheck, ServiceHandle};
use crate::session::{HttpSessionCreator, HttpSessionCreatorConfig, SessionCreator};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core matchmaking engine
    engine: MatchmakingEngine,

    /// Rating workflow
    rating_service: RatingService,

    /// Metrics service for monitoring and health checks
    metrics_service: Arc<MetricsService>,

    /// What health checks look at
    handle: ServiceHandle,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with the HTTP session creator from config
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing pairing-room service");
        info!(
            "Configuration: service={}, engine_url={}",
            config.service.name, config.engine.url
        );

        let session_creator = HttpSessionCreator::new(HttpSessionCreatorConfig {
            engine_url: config.engine.url.clone(),
            request_timeout: config.engine_request_timeout(),
        })
        .map_err(|e| ServiceError::Configuration {
            message: format!("Failed to create engine client: {}", e),
        })?;

        Self::with_session_creator(config, Arc::new(session_creator))
    }

    /// Initialize the application around any session creator
    pub fn with_session_creator(
        config: AppConfig,
        session_creator: Arc<dyn SessionCreator>,
    ) -> Result<Self, ServiceError> {
        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let engine = MatchmakingEngine::with_metrics(session_creator, metrics_collector.clone());

        let rating_storage = Arc::new(InMemoryRatingStorage::with_initial_rating(
            config.rating.initial_rating,
        ));
        let rating_service = RatingService::with_metrics(rating_storage, metrics_collector.clone());

        let is_running = Arc::new(RwLock::new(false));
        let handle = ServiceHandle::new(
            config.service.name.clone(),
            engine.clone(),
            is_running.clone(),
        );

        info!(
            "Initializing metrics service on port {}",
            config.service.health_port
        );
        let health_server = HealthServer::new(
            HealthServerConfig {
                port: config.service.health_port,
                host: "0.0.0.0".to_string(),
            },
            metrics_collector.clone(),
        )
        .with_service(handle.clone());
        let metrics_service = Arc::new(MetricsService::new(
            metrics_collector,
            Arc::new(health_server),
        ));

        Ok(Self {
            config,
            engine,
            rating_service,
            metrics_service,
            handle,
            background_tasks: Vec::new(),
            is_running,
        })
    }

    /// Start the health server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting pairing-room service");

        *self.is_running.write().await = true;

        self.start_metrics_service().await?;
        self.start_background_tasks();

        info!("✅ Pairing-room service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of pairing-room service");

        *self.is_running.write().await = false;

        self.stop_background_tasks().await;

        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("✅ Metrics service stopped");
        }

        let final_stats = self.engine.stats().await;
        let totals = self.engine.totals().await;
        info!(
            "Final statistics: {:?}, totals: {:?}",
            final_stats, totals
        );
        info!("✅ Pairing-room service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the matchmaking engine
    pub fn engine(&self) -> &MatchmakingEngine {
        &self.engine
    }

    /// Get the rating workflow
    pub fn rating_service(&self) -> &RatingService {
        &self.rating_service
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    /// Handle used by health checks
    pub fn handle(&self) -> ServiceHandle {
        self.handle.clone()
    }

    /// Start metrics service
    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        info!("Starting metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.config.service.health_port;

        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {:#}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        self.background_tasks.push(metrics_handle);

        // Give the server a moment to bind
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Start background maintenance tasks
    fn start_background_tasks(&mut self) {
        let interval = self.config.metrics_interval();
        info!(
            "Starting metrics refresh task ({}s interval)...",
            interval.as_secs()
        );

        let refresh_task = {
            let handle = self.handle.clone();
            let metrics_collector = self.metrics_service.collector();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(interval);
                info!("Metrics refresh task started");

                while *is_running.read().await {
                    interval.tick().await;

                    let stats = handle.engine().stats().await;
                    debug!(
                        "Updating metrics - queue_length: {}, active_pairings: {}",
                        stats.queue_length, stats.active_pairings
                    );
                    metrics_collector.update_from_queue_stats(&stats);

                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(handle.uptime().as_secs() as i64);

                    match HealthCheck::check(&handle).await {
                        Ok(health) => {
                            metrics_collector.update_health_status(health.status.as_gauge());
                            for check in &health.checks {
                                metrics_collector.update_component_health(
                                    &check.name,
                                    check.status.as_gauge() > 0,
                                );
                            }
                        }
                        Err(e) => warn!("Health check failed during metrics refresh: {}", e),
                    }
                }

                info!("Metrics refresh task stopped");
            })
        };

        self.background_tasks.push(refresh_task);
        info!(
            "{} background tasks running",
            self.background_tasks.len()
        );
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
