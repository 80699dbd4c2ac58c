//! Settlement ledger access (non-deterministic).
//!
//! ```text
//! SubmissionClient ──► Signer ──► LedgerRpc ──► settlement ledger
//!        │                            ▲
//!        └──── reads ─────────────────┘
//! ```
//!
//! `WsRpc` talks JSON-RPC over a WebSocket; `SimulatedLedger` answers the
//! same calls in-process.

pub mod client;
pub mod protocol;
pub mod rpc;
pub mod signer;
pub mod simulated;

pub use client::{CreatedMatch, SubmissionClient};
pub use protocol::{ContractCall, MatchInfo, SignedTransaction, TransactionRequest, TxReceipt};
pub use rpc::{LedgerRpc, TransportError, WsRpc};
pub use signer::{Address, LocalSigner, Signer, SignerError};
pub use simulated::{Fault, SimulatedLedger};
