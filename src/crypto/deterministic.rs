//! Deterministic encryption double.
//!
//! Replays the same ciphertext stream for the same key and seed, which keeps
//! tests reproducible. Successive encodings still differ because the noise
//! generator advances on every call. Provides no confidentiality.
//!
//! Ciphertext layout: `noise (16) || plaintext XOR pad(noise)`.

use parking_lot::Mutex;

use crate::core::hash::DomainHasher;
use crate::core::rng::DeterministicRng;
use crate::crypto::context::EncryptionContext;
use crate::crypto::service::EncryptionService;
use crate::crypto::value::{ConfidentialValue, Plaintext, SchemeTag};
use crate::error::Result;

const PAD_DOMAIN: &[u8] = b"CIPHER_BET_TEST_PAD_V1";
const NOISE_LEN: usize = 16;

/// Seeded, reproducible encryption service for tests and demos.
pub struct DeterministicService {
    rng: Mutex<DeterministicRng>,
}

impl DeterministicService {
    /// Create with a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(DeterministicRng::new(seed)),
        }
    }

    /// Create with a seed bound to a context's key, so two keys never share
    /// a noise stream.
    pub fn for_context(ctx: &EncryptionContext, seed: u64) -> Self {
        Self {
            rng: Mutex::new(DeterministicRng::for_key(ctx.fingerprint(), seed)),
        }
    }

    /// Recover the plaintext bytes. Test-side only.
    pub fn reveal(ctx: &EncryptionContext, value: &ConfidentialValue) -> Option<Vec<u8>> {
        let bytes = value.ciphertext();
        if value.scheme() != SchemeTag::Deterministic || bytes.len() < NOISE_LEN {
            return None;
        }
        let (noise, masked) = bytes.split_at(NOISE_LEN);
        let pad = pad(ctx, noise);
        Some(masked.iter().zip(pad.iter()).map(|(m, p)| m ^ p).collect())
    }
}

impl EncryptionService for DeterministicService {
    fn scheme(&self) -> SchemeTag {
        SchemeTag::Deterministic
    }

    fn seal(&self, ctx: &EncryptionContext, plaintext: &Plaintext) -> Result<ConfidentialValue> {
        let mut noise = [0u8; NOISE_LEN];
        self.rng.lock().fill_bytes(&mut noise);

        let pad = pad(ctx, &noise);
        let msg = plaintext.to_bytes();

        let mut ciphertext = Vec::with_capacity(NOISE_LEN + msg.len());
        ciphertext.extend_from_slice(&noise);
        ciphertext.extend(msg.iter().zip(pad.iter()).map(|(m, p)| m ^ p));

        Ok(ConfidentialValue::new(ciphertext, SchemeTag::Deterministic))
    }

    fn blinding(&self) -> [u8; 32] {
        let mut blinding = [0u8; 32];
        self.rng.lock().fill_bytes(&mut blinding);
        blinding
    }
}

fn pad(ctx: &EncryptionContext, noise: &[u8]) -> [u8; 32] {
    let mut hasher = DomainHasher::new(PAD_DOMAIN);
    hasher.update_bytes(ctx.fingerprint());
    hasher.update_bytes(noise);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BetError;
    use crate::market::Side;
    use rust_decimal_macros::dec;

    #[test]
    fn test_same_amount_twice_differs() {
        let ctx = EncryptionContext::initialize(b"k1").unwrap();
        let service = DeterministicService::new(1);

        let c1 = service.encode_amount(&ctx, dec!(2.5)).unwrap();
        let c2 = service.encode_amount(&ctx, dec!(2.5)).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_replays_for_same_seed() {
        let ctx = EncryptionContext::initialize(b"k1").unwrap();
        let a = DeterministicService::new(7);
        let b = DeterministicService::new(7);

        assert_eq!(
            a.encode_side(&ctx, Side::SideA).unwrap(),
            b.encode_side(&ctx, Side::SideA).unwrap()
        );
    }

    #[test]
    fn test_context_bound_streams_differ() {
        let k1 = EncryptionContext::initialize(b"k1").unwrap();
        let k2 = EncryptionContext::initialize(b"k2").unwrap();

        let a = DeterministicService::for_context(&k1, 5).blinding();
        let b = DeterministicService::for_context(&k2, 5).blinding();
        assert_ne!(a, b);
        assert_eq!(a, DeterministicService::for_context(&k1, 5).blinding());
    }

    #[test]
    fn test_reveal() {
        let ctx = EncryptionContext::initialize(b"k1").unwrap();
        let service = DeterministicService::new(3);

        let side = service.encode_side(&ctx, Side::SideB).unwrap();
        assert_eq!(DeterministicService::reveal(&ctx, &side), Some(vec![2]));

        let amount = service.encode_amount(&ctx, dec!(1)).unwrap();
        let revealed = DeterministicService::reveal(&ctx, &amount).unwrap();
        assert_eq!(revealed, 1_000_000_000_000_000_000u128.to_le_bytes().to_vec());
    }

    #[test]
    fn test_invalid_amounts() {
        let ctx = EncryptionContext::initialize(b"k1").unwrap();
        let service = DeterministicService::new(3);

        assert!(matches!(service.encode_amount(&ctx, dec!(0)), Err(BetError::InvalidAmount(_))));
        assert!(matches!(service.encode_amount(&ctx, dec!(-2)), Err(BetError::InvalidAmount(_))));
    }

    #[test]
    fn test_proof_from_double_is_bound() {
        let ctx = EncryptionContext::initialize(b"k1").unwrap();
        let service = DeterministicService::new(11);

        let value = service.encode_amount(&ctx, dec!(1)).unwrap();
        let other = service.encode_amount(&ctx, dec!(1)).unwrap();
        let proof = service
            .prove(&ctx, &value, &Plaintext::Amount(1_000_000_000_000_000_000))
            .unwrap();

        assert!(proof.is_bound_to(&value));
        assert!(!proof.is_bound_to(&other));
    }
}
