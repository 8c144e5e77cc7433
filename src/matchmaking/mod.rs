//! FIFO matchmaking: queue, pairing table and the engine that drives them

pub mod engine;
mod state;

pub use engine::MatchmakingEngine;
pub use state::EngineTotals;
