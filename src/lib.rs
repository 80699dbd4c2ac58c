//! # Cipher Bet
//!
//! Confidential bet pipeline: wagers whose amount and side stay encrypted
//! until the match is adjudicated on the settlement ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CIPHER BET                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                               │
//! │  ├── amount.rs   - Decimal -> base-unit scaling             │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG          │
//! │  └── hash.rs     - Domain-separated SHA-256                 │
//! │                                                             │
//! │  crypto/         - Confidential encoding                    │
//! │  ├── context.rs  - Session encryption key                   │
//! │  ├── service.rs  - EncryptionService trait                  │
//! │  ├── sealed.rs   - x25519 + ChaCha20-Poly1305               │
//! │  └── proof.rs    - Ciphertext-bound proofs                  │
//! │                                                             │
//! │  market/         - Match snapshots and resolution state     │
//! │  ledger/         - Bet lifecycle and per-bettor ledger      │
//! │                                                             │
//! │  chain/          - Settlement ledger (non-deterministic)    │
//! │  ├── client.rs   - Submission client                        │
//! │  ├── signer.rs   - Wallet capability                        │
//! │  ├── rpc.rs      - JSON-RPC over WebSocket                  │
//! │  └── simulated.rs- In-process ledger                        │
//! │                                                             │
//! │  session/        - BettingSession orchestrator              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pipeline
//!
//! `place_bet` validates the request, encrypts amount and side, proves the
//! amount ciphertext, submits the bundle through the participant's signer
//! and records the resulting bet. Validation failures never produce a
//! record; submission failures always do.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod chain;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod market;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use chain::{Address, LocalSigner, Signer, SimulatedLedger, SubmissionClient, WsRpc};
pub use config::{ClientConfig, SessionConfig};
pub use crypto::{DeterministicService, EncryptionContext, EncryptionService, SealedBoxService};
pub use error::{BetError, ErrorKind, Result};
pub use ledger::{Bet, BetId, BetLedger, BetOutcome, BetStatus};
pub use market::{Match, MatchId, MatchMetadata, Side};
pub use session::{BetRequest, BettingOrchestrator, BettingSession};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
