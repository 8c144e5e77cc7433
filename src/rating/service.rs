//! Rating workflow: load two ratings, apply Elo, persist both

use crate::error::{MatchmakingError, Result};
use crate::metrics::MetricsCollector;
use crate::rating::elo;
use crate::rating::storage::RatingStorage;
use crate::types::{MatchOutcome, RatingChange, RatingUpdate};
use crate::utils::is_valid_identifier;
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Applies recorded outcomes to stored model ratings
#[derive(Clone)]
pub struct RatingService {
    storage: Arc<dyn RatingStorage>,
    metrics_collector: Option<Arc<MetricsCollector>>,
    /// Held from the first load to the last write of an update
    update_lock: Arc<Mutex<()>>,
}

impl RatingService {
    pub fn new(storage: Arc<dyn RatingStorage>) -> Self {
        Self {
            storage,
            metrics_collector: None,
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_metrics(
        storage: Arc<dyn RatingStorage>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            storage,
            metrics_collector: Some(metrics_collector),
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Record a decisive result. Returns `(winner, loser)` updates.
    pub async fn record_win(
        &self,
        winner_model_id: &str,
        loser_model_id: &str,
    ) -> Result<(RatingUpdate, RatingUpdate)> {
        let result = {
            let _guard = self.update_lock.lock().await;
            self.apply(winner_model_id, loser_model_id, false)
        };
        self.record_metrics(&result, false);
        result
    }

    /// Record a draw. Returns updates in argument order.
    pub async fn record_draw(
        &self,
        model_a_id: &str,
        model_b_id: &str,
    ) -> Result<(RatingUpdate, RatingUpdate)> {
        let result = {
            let _guard = self.update_lock.lock().await;
            self.apply(model_a_id, model_b_id, true)
        };
        self.record_metrics(&result, true);
        result
    }

    /// Record an outcome reported by the surrounding service
    pub async fn record_outcome(&self, outcome: &MatchOutcome) -> Result<(RatingUpdate, RatingUpdate)> {
        if outcome.is_draw {
            self.record_draw(&outcome.winner_model_id, &outcome.loser_model_id)
                .await
        } else {
            self.record_win(&outcome.winner_model_id, &outcome.loser_model_id)
                .await
        }
    }

    /// Current stored rating for a model
    pub fn current_rating(&self, model_id: &str) -> Result<i32> {
        self.load(model_id)
    }

    fn apply(&self, first_id: &str, second_id: &str, is_draw: bool) -> Result<(RatingUpdate, RatingUpdate)> {
        let start_time = Instant::now();

        if !is_valid_identifier(first_id) || !is_valid_identifier(second_id) {
            return Err(MatchmakingError::InvalidInput {
                reason: "model ids must be non-empty".to_string(),
            }
            .into());
        }
        if first_id == second_id {
            return Err(MatchmakingError::InvalidInput {
                reason: format!("model '{}' cannot be rated against itself", first_id),
            }
            .into());
        }

        // Both loads happen before any write
        let first_old = self.load(first_id)?;
        let second_old = self.load(second_id)?;

        let (first_new, second_new) = if is_draw {
            elo::draw(first_old, second_old)
        } else {
            elo::win_loss(first_old, second_old)
        };

        self.storage
            .set_rating(first_id, first_new)
            .with_context(|| format!("Failed to store rating for model '{}'", first_id))?;

        if let Err(e) = self.storage.set_rating(second_id, second_new) {
            // Put the first model back so the pair stays consistent
            if let Err(restore_err) = self.storage.set_rating(first_id, first_old) {
                error!(
                    "Failed to restore rating for '{}' after partial update: {:#}",
                    first_id, restore_err
                );
            }
            return Err(e.context(format!("Failed to store rating for model '{}'", second_id)));
        }

        info!(
            "Recorded {} - '{}': {} -> {}, '{}': {} -> {} ({:.2}ms)",
            if is_draw { "draw" } else { "win" },
            first_id,
            first_old,
            first_new,
            second_id,
            second_old,
            second_new,
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        Ok((
            RatingUpdate {
                model_id: first_id.to_string(),
                change: RatingChange {
                    old_rating: first_old,
                    new_rating: first_new,
                },
            },
            RatingUpdate {
                model_id: second_id.to_string(),
                change: RatingChange {
                    old_rating: second_old,
                    new_rating: second_new,
                },
            },
        ))
    }

    fn load(&self, model_id: &str) -> Result<i32> {
        self.storage
            .get_rating(model_id)
            .with_context(|| format!("Failed to load rating for model '{}'", model_id))?
            .ok_or_else(|| {
                MatchmakingError::ModelNotFound {
                    model_id: model_id.to_string(),
                }
                .into()
            })
    }

    fn record_metrics(&self, result: &Result<(RatingUpdate, RatingUpdate)>, is_draw: bool) {
        let Some(metrics) = &self.metrics_collector else {
            return;
        };
        match result {
            Ok(_) => metrics.record_rating_update(is_draw),
            Err(e) => {
                warn!("Rating update failed: {:#}", e);
                metrics.record_rating_failure();
            }
        }
    }
}
