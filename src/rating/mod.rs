//! Elo rating for models
//!
//! This module provides the pure Elo functions, the storage interface used to
//! persist one rating per model, and the workflow that ties them together.

pub mod elo;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use elo::{draw, win_loss, K_FACTOR, RATING_FLOOR};
pub use service::RatingService;
pub use storage::{InMemoryRatingStorage, MockRatingStorage, RatingStorage};
