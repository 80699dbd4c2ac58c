//! Confidential Encoding
//!
//! Turns plaintext bet amounts and sides into ciphertexts and produces
//! proofs bound to those ciphertexts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CONFIDENTIAL ENCODING                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  context.rs      - Session public key + fingerprint         │
//! │  value.rs        - ConfidentialValue, SchemeTag, Plaintext  │
//! │  proof.rs        - Ciphertext-bound proofs                  │
//! │  service.rs      - EncryptionService capability             │
//! │  sealed.rs       - x25519 + ChaCha20-Poly1305 (production)  │
//! │  deterministic.rs- Seeded double for tests                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod deterministic;
pub mod proof;
pub mod sealed;
pub mod service;
pub mod value;

pub use context::EncryptionContext;
pub use deterministic::DeterministicService;
pub use proof::{Proof, PROOF_LEN};
pub use sealed::SealedBoxService;
pub use service::EncryptionService;
pub use value::{ConfidentialValue, Plaintext, SchemeTag};
