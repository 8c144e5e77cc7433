//! Pairing Room - head-to-head matchmaking with Elo ratings
//!
//! This crate pairs waiting participants first-come-first-served, asks an
//! external execution engine for a session per pairing, and updates model
//! ratings once a session has a result.

pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod rating;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use matchmaking::MatchmakingEngine;
pub use rating::RatingService;
pub use session::{HttpSessionCreator, SessionCreator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
