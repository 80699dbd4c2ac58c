//! Core primitives.
//!
//! Hashing, reproducible randomness, and amount scaling shared by the
//! encryption, ledger and submission layers.

pub mod amount;
pub mod hash;
pub mod rng;

// Re-export core types
pub use amount::{to_base_units, BASE_UNIT_DECIMALS};
pub use hash::{ciphertext_digest, key_fingerprint, Digest32, DomainHasher};
pub use rng::DeterministicRng;
