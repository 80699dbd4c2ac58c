//! Submission client.
//!
//! Turns encoded bets and match requests into signed contract calls, and
//! reads match state back. Every call runs under a caller-supplied deadline
//! and is attempted exactly once.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::chain::protocol::{
    ContractCall, HexBytes, MatchInfo, TransactionRequest, TxReceipt, CALL_METHOD, NOT_FOUND_CODE,
    REJECTED_CODE,
};
use crate::chain::rpc::{LedgerRpc, TransportError};
use crate::chain::signer::{Signer, SignerError};
use crate::config::ClientConfig;
use crate::core::amount::to_base_units;
use crate::core::hash::{short_hex, Digest32};
use crate::crypto::{ConfidentialValue, Proof};
use crate::error::{BetError, Result};
use crate::market::{Match, MatchId, MatchMetadata};

/// Receipt for a newly created match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedMatch {
    /// Ledger transaction id.
    pub transaction_id: String,
    /// Id the ledger assigned.
    pub match_id: MatchId,
}

/// Sends signed transactions and reads to the settlement ledger.
pub struct SubmissionClient {
    rpc: Arc<dyn LedgerRpc>,
    config: ClientConfig,
    /// Digests of every ciphertext handed to the ledger, successful or not.
    submitted: Mutex<HashSet<Digest32>>,
}

impl SubmissionClient {
    /// Client over a transport.
    pub fn new(rpc: Arc<dyn LedgerRpc>, config: ClientConfig) -> Self {
        Self {
            rpc,
            config,
            submitted: Mutex::new(HashSet::new()),
        }
    }

    /// Connection settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit an encoded bet with `transfer_amount` attached.
    ///
    /// Ciphertexts already used in an earlier submission are refused with
    /// `CiphertextReused` before anything is sent.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(match_id = %match_id))]
    pub async fn submit_bet(
        &self,
        match_id: MatchId,
        encrypted_amount: &ConfidentialValue,
        encrypted_side: &ConfidentialValue,
        proof: &Proof,
        transfer_amount: Decimal,
        signer: Option<&dyn Signer>,
        timeout: Duration,
    ) -> Result<String> {
        let signer = connected(signer)?;
        let value = to_base_units(transfer_amount)?;

        let digests = [encrypted_amount.digest(), encrypted_side.digest()];
        {
            let mut submitted = self.submitted.lock();
            if digests.iter().any(|d| submitted.contains(d)) {
                warn!(amount_ct = %short_hex(&digests[0]), "refusing ciphertext reuse");
                return Err(BetError::CiphertextReused);
            }
            submitted.extend(digests);
        }

        let tx = TransactionRequest {
            chain_id: self.config.chain_id,
            to: self.config.contract.clone(),
            value,
            call: ContractCall::PlaceBet {
                match_id: match_id.get(),
                amount: HexBytes::from(encrypted_amount.ciphertext()),
                side: HexBytes::from(encrypted_side.ciphertext()),
                proof: HexBytes::from(proof.as_bytes()),
                scheme: encrypted_amount.scheme(),
            },
        };

        let receipt = self.send(signer, &tx, timeout).await?;
        info!(tx = %receipt.transaction_id, "bet submitted");
        Ok(receipt.transaction_id)
    }

    /// Create a match. The id comes from the ledger's receipt.
    #[instrument(skip_all, fields(game = %metadata.game))]
    pub async fn create_match(
        &self,
        metadata: &MatchMetadata,
        start_time: u64,
        duration: u64,
        signer: Option<&dyn Signer>,
        timeout: Duration,
    ) -> Result<CreatedMatch> {
        let signer = connected(signer)?;

        let tx = TransactionRequest {
            chain_id: self.config.chain_id,
            to: self.config.contract.clone(),
            value: 0,
            call: ContractCall::create_match(metadata, start_time, duration),
        };

        let receipt = self.send(signer, &tx, timeout).await?;
        let match_id = receipt
            .match_id
            .map(MatchId)
            .ok_or_else(|| BetError::Rejected("ledger did not assign a match id".to_string()))?;

        info!(match_id = %match_id, tx = %receipt.transaction_id, "match created");
        Ok(CreatedMatch {
            transaction_id: receipt.transaction_id,
            match_id,
        })
    }

    /// Read a match snapshot.
    #[instrument(skip(self), fields(match_id = %match_id))]
    pub async fn query_match(&self, match_id: MatchId, timeout: Duration) -> Result<Match> {
        let params = ContractCall::GetMatchInfo { match_id: match_id.get() }
            .to_value()
            .map_err(|e| BetError::NetworkError(e.to_string()))?;

        let result = tokio::time::timeout(timeout, self.rpc.request(CALL_METHOD, params))
            .await
            .map_err(|_| BetError::Timeout(timeout))?
            .map_err(|e| match e {
                TransportError::Rpc { code: NOT_FOUND_CODE, .. } => BetError::NotFound(match_id.get()),
                other => transport_error(other),
            })?;

        let info: MatchInfo =
            serde_json::from_value(result).map_err(|e| BetError::NetworkError(format!("malformed match info: {}", e)))?;
        debug!(active = info.is_active, resolved = info.is_resolved, "match read");
        info.into_match(match_id)
            .map_err(|e| BetError::NetworkError(format!("malformed match info: {}", e)))
    }

    async fn send(&self, signer: &dyn Signer, tx: &TransactionRequest, timeout: Duration) -> Result<TxReceipt> {
        match tokio::time::timeout(timeout, signer.send_transaction(tx)).await {
            Ok(result) => result.map_err(signer_error),
            Err(_) => {
                warn!(?timeout, "transaction deadline elapsed, outcome unknown");
                Err(BetError::Timeout(timeout))
            }
        }
    }
}

fn connected(signer: Option<&dyn Signer>) -> Result<&dyn Signer> {
    match signer {
        Some(s) if s.is_connected() => Ok(s),
        _ => Err(BetError::NotConnected),
    }
}

fn signer_error(e: SignerError) -> BetError {
    match e {
        SignerError::Disconnected => BetError::NotConnected,
        SignerError::Encoding(reason) => BetError::NetworkError(reason),
        SignerError::Transport(t) => transport_error(t),
    }
}

fn transport_error(e: TransportError) -> BetError {
    match e {
        TransportError::Rpc { code: REJECTED_CODE, message } => BetError::Rejected(message),
        other => BetError::NetworkError(other.to_string()),
    }
}
