//! Ciphertext-Bound Proofs
//!
//! A proof commits to the plaintext under a secret blinding factor and is
//! bound to the exact ciphertext it attests. The binding is part of the
//! proof bytes, so a proof produced for one ciphertext cannot be replayed
//! against another, even one hiding the same plaintext.
//!
//! ## Layout (128 bytes)
//!
//! ```text
//! ┌──────────────────┬──────────────────┬──────────────────┬──────────────────┐
//! │ ciphertext digest│ key fingerprint  │ plaintext commit │ binding tag      │
//! │ 32 bytes         │ 32 bytes         │ 32 bytes         │ 32 bytes         │
//! └──────────────────┴──────────────────┴──────────────────┴──────────────────┘
//! ```
//!
//! Verifiers check the binding with the ciphertext alone; the plaintext and
//! blinding factor never leave the prover.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::hash::{short_hex, Digest32, DomainHasher};
use crate::crypto::context::EncryptionContext;
use crate::crypto::value::{ConfidentialValue, Plaintext};

/// Domain separator for plaintext commitments.
const COMMIT_DOMAIN: &[u8] = b"CIPHER_BET_PROOF_COMMIT_V1";

/// Domain separator for binding tags.
const BIND_DOMAIN: &[u8] = b"CIPHER_BET_PROOF_BIND_V1";

/// Encoded proof length.
pub const PROOF_LEN: usize = 128;

/// Proof attesting a confidential value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    bytes: Vec<u8>,
    bound_ciphertext: Digest32,
}

impl Proof {
    /// Attest `value` as an encryption of `plaintext` under `ctx`.
    pub fn attest(
        ctx: &EncryptionContext,
        value: &ConfidentialValue,
        plaintext: &Plaintext,
        blinding: &[u8; 32],
    ) -> Self {
        let bound_ciphertext = value.digest();

        let mut commit = DomainHasher::new(COMMIT_DOMAIN);
        commit.update_bytes(ctx.fingerprint());
        commit.update_framed(plaintext.label());
        commit.update_framed(&plaintext.to_bytes());
        commit.update_bytes(blinding);
        let commitment = commit.finalize();

        let binding = binding_tag(&bound_ciphertext, ctx.fingerprint(), &commitment, value);

        let mut bytes = Vec::with_capacity(PROOF_LEN);
        bytes.extend_from_slice(&bound_ciphertext);
        bytes.extend_from_slice(ctx.fingerprint());
        bytes.extend_from_slice(&commitment);
        bytes.extend_from_slice(&binding);

        Self { bytes, bound_ciphertext }
    }

    /// Parse proof bytes received from elsewhere.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != PROOF_LEN {
            return None;
        }
        let mut bound_ciphertext = [0u8; 32];
        bound_ciphertext.copy_from_slice(&bytes[..32]);
        Some(Self {
            bytes: bytes.to_vec(),
            bound_ciphertext,
        })
    }

    /// Encoded proof.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Digest of the ciphertext this proof attests.
    pub fn bound_ciphertext(&self) -> &Digest32 {
        &self.bound_ciphertext
    }

    /// Check that this proof was produced for exactly `value`.
    pub fn is_bound_to(&self, value: &ConfidentialValue) -> bool {
        if self.bytes.len() != PROOF_LEN || value.digest() != self.bound_ciphertext {
            return false;
        }

        let fingerprint = split32(&self.bytes[32..64]);
        let commitment = split32(&self.bytes[64..96]);
        let expected = binding_tag(&self.bound_ciphertext, &fingerprint, &commitment, value);

        self.bytes[96..] == expected
    }

    /// Check the key the proof was produced under.
    pub fn key_fingerprint(&self) -> Option<Digest32> {
        (self.bytes.len() == PROOF_LEN).then(|| split32(&self.bytes[32..64]))
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proof")
            .field("bound_ciphertext", &short_hex(&self.bound_ciphertext))
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn binding_tag(
    ciphertext: &Digest32,
    fingerprint: &Digest32,
    commitment: &Digest32,
    value: &ConfidentialValue,
) -> Digest32 {
    let mut bind = DomainHasher::new(BIND_DOMAIN);
    bind.update_bytes(ciphertext);
    bind.update_u8(value.scheme().code());
    bind.update_bytes(fingerprint);
    bind.update_bytes(commitment);
    bind.finalize()
}

fn split32(bytes: &[u8]) -> Digest32 {
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    out
}
