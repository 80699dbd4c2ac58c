//! Encryption context.
//!
//! Holds the settlement network's public encryption key for one session.

use std::fmt;

use crate::core::hash::{key_fingerprint, short_hex, Digest32};
use crate::error::{BetError, Result};

/// Active public key for a session. Immutable once created.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    public_key: Vec<u8>,
    fingerprint: Digest32,
}

impl EncryptionContext {
    /// Create a context from the network's public key.
    ///
    /// An empty key is treated as no key at all.
    pub fn initialize(public_key: impl AsRef<[u8]>) -> Result<Self> {
        let public_key = public_key.as_ref();
        if public_key.is_empty() {
            return Err(BetError::UninitializedKey);
        }

        Ok(Self {
            public_key: public_key.to_vec(),
            fingerprint: key_fingerprint(public_key),
        })
    }

    /// Raw public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Domain-separated hash of the public key.
    pub fn fingerprint(&self) -> &Digest32 {
        &self.fingerprint
    }

    /// Public key as a fixed 32-byte array, if it has that length.
    pub fn public_key_32(&self) -> Result<[u8; 32]> {
        <[u8; 32]>::try_from(self.public_key.as_slice()).map_err(|_| BetError::MalformedKey {
            expected: 32,
            got: self.public_key.len(),
        })
    }
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("fingerprint", &short_hex(&self.fingerprint))
            .field("key_len", &self.public_key.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            EncryptionContext::initialize(b""),
            Err(BetError::UninitializedKey)
        ));
    }

    #[test]
    fn test_fingerprint_tracks_key() {
        let a = EncryptionContext::initialize(b"k1").unwrap();
        let b = EncryptionContext::initialize(b"k1").unwrap();
        let c = EncryptionContext::initialize(b"k2").unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.public_key(), b"k1");
    }

    #[test]
    fn test_public_key_32() {
        let short = EncryptionContext::initialize(b"k1").unwrap();
        assert!(matches!(
            short.public_key_32(),
            Err(BetError::MalformedKey { expected: 32, got: 2 })
        ));

        let full = EncryptionContext::initialize([7u8; 32]).unwrap();
        assert_eq!(full.public_key_32().unwrap(), [7u8; 32]);
    }

    #[test]
    fn test_debug_hides_key() {
        let ctx = EncryptionContext::initialize(b"super-secret-looking-key").unwrap();
        let rendered = format!("{:?}", ctx);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("fingerprint"));
    }
}
