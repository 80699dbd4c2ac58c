//! Confidential values and the plaintexts they hide.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::hash::{ciphertext_digest, short_hex, Digest32};
use crate::market::Side;

/// Which scheme produced a ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeTag {
    /// x25519 ephemeral key agreement + ChaCha20-Poly1305.
    SealedBox,
    /// Seeded test double. Not confidential.
    Deterministic,
}

impl SchemeTag {
    /// Byte used when the tag takes part in a hash.
    pub const fn code(self) -> u8 {
        match self {
            SchemeTag::SealedBox => 1,
            SchemeTag::Deterministic => 0xFF,
        }
    }
}

/// Opaque ciphertext plus the scheme that made it.
///
/// Nothing in the pipeline decodes these.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidentialValue {
    ciphertext: Vec<u8>,
    scheme: SchemeTag,
}

impl ConfidentialValue {
    /// Wrap ciphertext bytes.
    pub fn new(ciphertext: Vec<u8>, scheme: SchemeTag) -> Self {
        Self { ciphertext, scheme }
    }

    /// Raw ciphertext.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Producing scheme.
    pub fn scheme(&self) -> SchemeTag {
        self.scheme
    }

    /// Digest that proofs bind to.
    pub fn digest(&self) -> Digest32 {
        ciphertext_digest(&self.ciphertext)
    }
}

impl fmt::Debug for ConfidentialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfidentialValue")
            .field("scheme", &self.scheme)
            .field("digest", &short_hex(&self.digest()))
            .field("len", &self.ciphertext.len())
            .finish()
    }
}

/// Cleartext behind a confidential value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plaintext {
    /// Amount in base units.
    Amount(u128),
    /// Chosen side.
    Side(Side),
}

impl Plaintext {
    /// Associated-data label; an amount ciphertext never opens as a side.
    pub fn label(&self) -> &'static [u8] {
        match self {
            Plaintext::Amount(_) => b"amount",
            Plaintext::Side(_) => b"side",
        }
    }

    /// Fixed-width byte encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Plaintext::Amount(units) => units.to_le_bytes().to_vec(),
            Plaintext::Side(side) => vec![side.code()],
        }
    }
}
