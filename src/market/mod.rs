//! Matches and sides.
//!
//! Read-only view of what the settlement ledger knows about each match.

pub mod book;
pub mod types;

pub use book::{MatchBook, ResolutionSource};
pub use types::{Match, MatchId, MatchMetadata, Resolution, Side};
