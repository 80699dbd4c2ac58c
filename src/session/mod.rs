//! Per-participant betting sessions.

pub mod orchestrator;

pub use orchestrator::{BetRequest, BettingOrchestrator, BettingSession};
