//! Sealed-box encryption using x25519 + ChaCha20-Poly1305.
//!
//! Each value is sealed to the network key with a fresh ephemeral keypair
//! and a fresh nonce, so equal plaintexts never share a ciphertext.
//!
//! Ciphertext layout: `ephemeral_pubkey (32) || nonce (12) || aead (len + 16)`.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::core::hash::{Digest32, DomainHasher};
use crate::crypto::context::EncryptionContext;
use crate::crypto::service::EncryptionService;
use crate::crypto::value::{ConfidentialValue, Plaintext, SchemeTag};
use crate::error::{BetError, Result};

/// Domain separator for key derivation.
const SEAL_DOMAIN: &[u8] = b"CIPHER_BET_SEAL_V1";

const EPK_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Production encryption service.
#[derive(Debug, Default, Clone, Copy)]
pub struct SealedBoxService;

impl SealedBoxService {
    /// Create the service.
    pub fn new() -> Self {
        Self
    }

    /// Open a sealed value with the network's secret key.
    ///
    /// This is the adjudicator's side of the scheme; the betting pipeline
    /// never calls it.
    pub fn open(
        secret: &[u8; 32],
        ctx: &EncryptionContext,
        value: &ConfidentialValue,
        label: &[u8],
    ) -> Result<Vec<u8>> {
        let bytes = value.ciphertext();
        if bytes.len() < EPK_LEN + NONCE_LEN {
            return Err(BetError::Encryption);
        }

        let mut epk = [0u8; EPK_LEN];
        epk.copy_from_slice(&bytes[..EPK_LEN]);
        let nonce = &bytes[EPK_LEN..EPK_LEN + NONCE_LEN];
        let sealed = &bytes[EPK_LEN + NONCE_LEN..];

        let shared = StaticSecret::from(*secret).diffie_hellman(&PublicKey::from(epk));
        let key = derive_key(shared.as_bytes(), &epk);
        let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| BetError::Encryption)?;

        let aad = associated_data(ctx, label);
        cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad: &aad })
            .map_err(|_| BetError::Encryption)
    }
}

impl EncryptionService for SealedBoxService {
    fn scheme(&self) -> SchemeTag {
        SchemeTag::SealedBox
    }

    fn seal(&self, ctx: &EncryptionContext, plaintext: &Plaintext) -> Result<ConfidentialValue> {
        let network_pk = PublicKey::from(ctx.public_key_32()?);

        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral_secret);
        let shared = ephemeral_secret.diffie_hellman(&network_pk);
        let key = derive_key(shared.as_bytes(), ephemeral_public.as_bytes());

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| BetError::Encryption)?;
        let msg = plaintext.to_bytes();
        let aad = associated_data(ctx, plaintext.label());
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: &msg, aad: &aad })
            .map_err(|_| BetError::Encryption)?;

        let mut ciphertext = Vec::with_capacity(EPK_LEN + NONCE_LEN + sealed.len());
        ciphertext.extend_from_slice(ephemeral_public.as_bytes());
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&sealed);

        Ok(ConfidentialValue::new(ciphertext, SchemeTag::SealedBox))
    }

    fn blinding(&self) -> [u8; 32] {
        let mut blinding = [0u8; 32];
        OsRng.fill_bytes(&mut blinding);
        blinding
    }
}

/// Derive the symmetric key from the shared secret and ephemeral pubkey.
fn derive_key(shared_secret: &[u8], epk: &[u8]) -> Digest32 {
    let mut hasher = DomainHasher::new(SEAL_DOMAIN);
    hasher.update_bytes(shared_secret);
    hasher.update_bytes(epk);
    hasher.finalize()
}

fn associated_data(ctx: &EncryptionContext, label: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(32 + label.len());
    aad.extend_from_slice(ctx.fingerprint());
    aad.extend_from_slice(label);
    aad
}
