//! Bet records and the per-participant ledger.

pub mod bet;
pub mod store;

pub use bet::{Bet, BetId, BetOutcome, BetStatus};
pub use store::BetLedger;
