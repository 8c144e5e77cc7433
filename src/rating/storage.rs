//! Rating storage interface and implementations
//!
//! The rating workflow loads and persists one integer rating per model
//! through this interface; the Elo functions themselves never touch storage.

use crate::error::{MatchmakingError, Result};
use crate::types::ModelId;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for rating storage operations
pub trait RatingStorage: Send + Sync {
    /// Get a model's current rating, `None` when the model is unknown
    fn get_rating(&self, model_id: &str) -> Result<Option<i32>>;

    /// Store a model's rating
    fn set_rating(&self, model_id: &str, rating: i32) -> Result<()>;
}

/// In-memory rating storage implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStorage {
    ratings: RwLock<HashMap<ModelId, i32>>,
    /// Rating handed to unknown models on first lookup, if set
    initial_rating: Option<i32>,
}

impl InMemoryRatingStorage {
    /// Storage that only knows models it was explicitly given
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that seeds unknown models with `initial_rating` on first lookup
    pub fn with_initial_rating(initial_rating: i32) -> Self {
        Self {
            ratings: RwLock::new(HashMap::new()),
            initial_rating: Some(initial_rating),
        }
    }

    /// Number of models with a stored rating
    pub fn model_count(&self) -> Result<usize> {
        let ratings = self.ratings.read().map_err(|_| MatchmakingError::InternalError {
            message: "Failed to acquire ratings read lock".to_string(),
        })?;
        Ok(ratings.len())
    }
}

impl RatingStorage for InMemoryRatingStorage {
    fn get_rating(&self, model_id: &str) -> Result<Option<i32>> {
        {
            let ratings = self.ratings.read().map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire ratings read lock".to_string(),
            })?;
            if let Some(rating) = ratings.get(model_id) {
                return Ok(Some(*rating));
            }
        }

        let Some(initial) = self.initial_rating else {
            return Ok(None);
        };

        let mut ratings = self
            .ratings
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire ratings write lock".to_string(),
            })?;
        Ok(Some(*ratings.entry(model_id.to_string()).or_insert(initial)))
    }

    fn set_rating(&self, model_id: &str, rating: i32) -> Result<()> {
        let mut ratings = self
            .ratings
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire ratings write lock".to_string(),
            })?;
        ratings.insert(model_id.to_string(), rating);
        Ok(())
    }
}

/// Mock rating storage for testing
#[derive(Debug, Default)]
pub struct MockRatingStorage {
    ratings: RwLock<HashMap<ModelId, i32>>,
    set_calls: RwLock<Vec<(ModelId, i32)>>,
    failing_writes: RwLock<Vec<ModelId>>,
}

impl MockRatingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset a rating without recording a call
    pub fn preset_rating(&self, model_id: &str, rating: i32) {
        if let Ok(mut ratings) = self.ratings.write() {
            ratings.insert(model_id.to_string(), rating);
        }
    }

    /// Make every write for `model_id` fail
    pub fn fail_writes_for(&self, model_id: &str) {
        if let Ok(mut failing) = self.failing_writes.write() {
            failing.push(model_id.to_string());
        }
    }

    /// Get all set calls made (for testing)
    pub fn get_set_calls(&self) -> Vec<(ModelId, i32)> {
        self.set_calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl RatingStorage for MockRatingStorage {
    fn get_rating(&self, model_id: &str) -> Result<Option<i32>> {
        let ratings = self.ratings.read().map_err(|_| MatchmakingError::InternalError {
            message: "Failed to acquire ratings read lock".to_string(),
        })?;
        Ok(ratings.get(model_id).copied())
    }

    fn set_rating(&self, model_id: &str, rating: i32) -> Result<()> {
        let should_fail = self
            .failing_writes
            .read()
            .map(|failing| failing.iter().any(|id| id == model_id))
            .unwrap_or(false);
        if should_fail {
            anyhow::bail!("storage unavailable for model {}", model_id);
        }

        if let Ok(mut calls) = self.set_calls.write() {
            calls.push((model_id.to_string(), rating));
        }

        let mut ratings = self
            .ratings
            .write()
            .map_err(|_| MatchmakingError::InternalError {
                message: "Failed to acquire ratings write lock".to_string(),
            })?;
        ratings.insert(model_id.to_string(), rating);
        Ok(())
    }
}
