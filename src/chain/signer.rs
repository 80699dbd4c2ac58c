//! Transaction signing.
//!
//! A [`Signer`] is the participant's wallet: it owns the identity bets are
//! recorded under and the only path for state-changing transactions.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::chain::protocol::{HexBytes, SignedTransaction, TransactionRequest, TxReceipt, SEND_TRANSACTION_METHOD};
use crate::chain::rpc::{LedgerRpc, TransportError};
use crate::core::hash::hash_with_domain;

/// Domain separator for address derivation.
const ADDRESS_DOMAIN: &[u8] = b"CIPHER_BET_ADDRESS_V1";

/// Participant address. Compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into().to_ascii_lowercase())
    }

    /// Address as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address controlled by an ed25519 key: `0x` + first 20 bytes of its hash.
pub fn address_for(key: &VerifyingKey) -> Address {
    let digest = hash_with_domain(ADDRESS_DOMAIN, key.as_bytes());
    Address(format!("0x{}", hex::encode(&digest[..20])))
}

/// Signing failures.
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    /// Wallet is not connected.
    #[error("signer disconnected")]
    Disconnected,

    /// Transaction could not be encoded.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Ledger transport failed or answered with an error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Wallet capability.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Whether the wallet can sign right now.
    fn is_connected(&self) -> bool;

    /// Address the wallet signs as.
    fn address(&self) -> Address;

    /// Sign and broadcast, returning the ledger's receipt.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxReceipt, SignerError>;
}

/// In-process ed25519 wallet that broadcasts through a [`LedgerRpc`].
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
    rpc: Arc<dyn LedgerRpc>,
    connected: AtomicBool,
}

impl LocalSigner {
    /// Wallet over an existing key.
    pub fn new(key: SigningKey, rpc: Arc<dyn LedgerRpc>) -> Self {
        let address = address_for(&key.verifying_key());
        Self {
            key,
            address,
            rpc,
            connected: AtomicBool::new(true),
        }
    }

    /// Wallet over a fresh random key.
    pub fn generate(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self::new(SigningKey::generate(&mut OsRng), rpc)
    }

    /// Stop signing.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Resume signing.
    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Sign without broadcasting.
    pub fn sign(&self, tx: &TransactionRequest) -> Result<SignedTransaction, SignerError> {
        let digest = tx
            .signing_digest()
            .map_err(|e| SignerError::Encoding(e.to_string()))?;
        let signature = self.key.sign(&digest);

        Ok(SignedTransaction {
            from: self.address.clone(),
            request: tx.clone(),
            public_key: HexBytes(self.key.verifying_key().to_bytes().to_vec()),
            signature: HexBytes(signature.to_bytes().to_vec()),
        })
    }
}

#[async_trait]
impl Signer for LocalSigner {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn address(&self) -> Address {
        self.address.clone()
    }

    #[instrument(skip(self, tx), fields(from = %self.address, function = tx.call.function()))]
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxReceipt, SignerError> {
        if !self.is_connected() {
            return Err(SignerError::Disconnected);
        }

        let signed = self.sign(tx)?;
        let params = serde_json::to_value(&signed).map_err(|e| SignerError::Encoding(e.to_string()))?;
        let result = self.rpc.request(SEND_TRANSACTION_METHOD, params).await?;

        let receipt: TxReceipt = serde_json::from_value(result).map_err(TransportError::from)?;
        debug!(tx = %receipt.transaction_id, "transaction accepted");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::protocol::ContractCall;
    use crate::chain::SimulatedLedger;
    use crate::market::MatchMetadata;

    fn create_match_tx() -> TransactionRequest {
        let metadata = MatchMetadata {
            game: "Valorant".into(),
            tournament: "Champions".into(),
            side_a: "Sentinels".into(),
            side_b: "Fnatic".into(),
        };
        TransactionRequest {
            chain_id: 11155111,
            to: "0xcontract".into(),
            value: 0,
            call: ContractCall::create_match(&metadata, 1_700_000_000, 7200),
        }
    }

    #[test]
    fn test_address_normalized() {
        assert_eq!(Address::new("0xABCD"), Address::new("0xabcd"));
        assert_eq!(Address::new("0xABCD").to_string(), "0xabcd");
    }

    #[test]
    fn test_signature_verifies() {
        let signer = LocalSigner::generate(Arc::new(SimulatedLedger::new()));
        let signed = signer.sign(&create_match_tx()).unwrap();

        assert_eq!(signed.from, signer.address());
        assert!(signed.verify());
    }

    #[test]
    fn test_tampered_transaction_fails_verification() {
        let signer = LocalSigner::generate(Arc::new(SimulatedLedger::new()));
        let mut signed = signer.sign(&create_match_tx()).unwrap();
        signed.request.value = 1;
        assert!(!signed.verify());

        let mut spoofed = signer.sign(&create_match_tx()).unwrap();
        spoofed.from = Address::new("0xsomeoneelse");
        assert!(!spoofed.verify());
    }

    #[tokio::test]
    async fn test_send_through_ledger() {
        let ledger = Arc::new(SimulatedLedger::new());
        let signer = LocalSigner::generate(ledger.clone());

        let receipt = signer.send_transaction(&create_match_tx()).await.unwrap();
        assert!(receipt.transaction_id.starts_with("0x"));
        assert_eq!(receipt.match_id, Some(1));
        assert_eq!(ledger.request_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_signer_sends_nothing() {
        let ledger = Arc::new(SimulatedLedger::new());
        let signer = LocalSigner::generate(ledger.clone());
        signer.disconnect();

        let err = signer.send_transaction(&create_match_tx()).await.unwrap_err();
        assert!(matches!(err, SignerError::Disconnected));
        assert_eq!(ledger.request_count(), 0);

        signer.reconnect();
        assert!(signer.is_connected());
    }
}
