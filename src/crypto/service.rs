//! Encryption service capability.

use rust_decimal::Decimal;

use crate::core::amount::to_base_units;
use crate::crypto::context::EncryptionContext;
use crate::crypto::proof::Proof;
use crate::crypto::value::{ConfidentialValue, Plaintext, SchemeTag};
use crate::error::Result;
use crate::market::Side;

/// Encodes plaintexts into confidential values and proves them.
///
/// Implementations supply the sealing step and a source of blinding
/// factors; validation and proof construction are shared.
///
/// Every encoding is randomized: sealing the same plaintext twice under the
/// same context yields different ciphertexts.
pub trait EncryptionService: Send + Sync {
    /// Scheme tag stamped on produced values.
    fn scheme(&self) -> SchemeTag;

    /// Encrypt a plaintext under the context key.
    fn seal(&self, ctx: &EncryptionContext, plaintext: &Plaintext) -> Result<ConfidentialValue>;

    /// Fresh secret blinding factor for a proof.
    fn blinding(&self) -> [u8; 32];

    /// Encode a bet amount. Fails with `InvalidAmount` unless `amount > 0`.
    fn encode_amount(&self, ctx: &EncryptionContext, amount: Decimal) -> Result<ConfidentialValue> {
        let units = to_base_units(amount)?;
        self.seal(ctx, &Plaintext::Amount(units))
    }

    /// Encode a side choice.
    fn encode_side(&self, ctx: &EncryptionContext, side: Side) -> Result<ConfidentialValue> {
        self.seal(ctx, &Plaintext::Side(side))
    }

    /// Prove that `value` encrypts `plaintext`. The proof is bound to `value`.
    fn prove(
        &self,
        ctx: &EncryptionContext,
        value: &ConfidentialValue,
        plaintext: &Plaintext,
    ) -> Result<Proof> {
        Ok(Proof::attest(ctx, value, plaintext, &self.blinding()))
    }
}
