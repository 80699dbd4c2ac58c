//! In-process settlement ledger.
//!
//! Speaks the same JSON-RPC surface as the real ledger so the full pipeline
//! runs without a network. Verifies signatures and proof binding, refuses
//! ciphertext reuse, and lets tests inject transport faults or stalls.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chain::protocol::{
    ContractCall, MatchInfo, SignedTransaction, TxReceipt, CALL_METHOD, INVALID_PARAMS_CODE,
    METHOD_NOT_FOUND_CODE, NOT_FOUND_CODE, REJECTED_CODE, SEND_TRANSACTION_METHOD,
};
use crate::chain::rpc::{LedgerRpc, TransportError};
use crate::core::hash::{ciphertext_digest, key_fingerprint, Digest32, DomainHasher};
use crate::crypto::{ConfidentialValue, Proof};
use crate::market::{Match, MatchId, MatchMetadata, Side};

const TX_ID_DOMAIN: &[u8] = b"CIPHER_BET_SIM_TX_V1";

/// Chain id the simulator answers to by default.
pub const SIMULATED_CHAIN_ID: u64 = 11155111;

/// Injected misbehavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Every request fails at the transport.
    Network,
    /// Every transaction is refused with this reason. Reads still work.
    Reject(String),
    /// Requests never complete.
    Stall,
}

/// An accepted `placeBet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBet {
    /// Sender.
    pub from: String,
    /// Target match.
    pub match_id: MatchId,
    /// Attached value in base units.
    pub value: u128,
    /// Transaction id issued.
    pub transaction_id: String,
}

#[derive(Default)]
struct LedgerState {
    matches: BTreeMap<u64, Match>,
    next_match_id: u64,
    seen_ciphertexts: HashSet<Digest32>,
    placed: Vec<PlacedBet>,
    tx_counter: u64,
}

/// Simulated settlement ledger.
pub struct SimulatedLedger {
    chain_id: u64,
    network_key: Option<Digest32>,
    state: Mutex<LedgerState>,
    fault: Mutex<Option<Fault>>,
    requests: AtomicUsize,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLedger {
    /// Empty ledger on [`SIMULATED_CHAIN_ID`] accepting proofs under any key.
    pub fn new() -> Self {
        Self {
            chain_id: SIMULATED_CHAIN_ID,
            network_key: None,
            state: Mutex::new(LedgerState {
                next_match_id: 1,
                ..LedgerState::default()
            }),
            fault: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    /// Only accept proofs made under `public_key`.
    pub fn with_network_key(mut self, public_key: &[u8]) -> Self {
        self.network_key = Some(key_fingerprint(public_key));
        self
    }

    /// Answer to a different chain id.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Inject a fault for all subsequent requests.
    pub fn inject(&self, fault: Fault) {
        *self.fault.lock() = Some(fault);
    }

    /// Back to normal operation.
    pub fn clear_fault(&self) {
        *self.fault.lock() = None;
    }

    /// Requests received, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Register a match directly, as if created by `organizer`.
    pub fn seed_match(&self, metadata: MatchMetadata, organizer: &str, start_time: u64, duration: u64) -> MatchId {
        let mut state = self.state.lock();
        insert_match(&mut state, metadata, organizer, start_time, duration)
    }

    /// Adjudicate a match. `None` records a void result.
    pub fn resolve_match(&self, match_id: MatchId, winner: Option<Side>) -> bool {
        let mut state = self.state.lock();
        let Some(m) = state.matches.get_mut(&match_id.get()) else {
            return false;
        };
        m.is_active = false;
        m.is_resolved = true;
        m.winning_side = winner;
        info!(match_id = %match_id, ?winner, "match resolved");
        true
    }

    /// Stop accepting bets on a match without resolving it.
    pub fn close_match(&self, match_id: MatchId) -> bool {
        let mut state = self.state.lock();
        match state.matches.get_mut(&match_id.get()) {
            Some(m) => {
                m.is_active = false;
                true
            }
            None => false,
        }
    }

    /// Accepted bets, in order.
    pub fn placed_bets(&self) -> Vec<PlacedBet> {
        self.state.lock().placed.clone()
    }

    /// Total value attached to bets on a match.
    pub fn escrow(&self, match_id: MatchId) -> u128 {
        self.state
            .lock()
            .placed
            .iter()
            .filter(|b| b.match_id == match_id)
            .map(|b| b.value)
            .sum()
    }

    fn read(&self, params: Value) -> Result<Value, TransportError> {
        let call: ContractCall = serde_json::from_value(params).map_err(|e| invalid_params(e.to_string()))?;
        match call {
            ContractCall::GetMatchInfo { match_id } => {
                let state = self.state.lock();
                let m = state
                    .matches
                    .get(&match_id)
                    .ok_or_else(|| rpc_error(NOT_FOUND_CODE, format!("match {} not found", match_id)))?;
                Ok(serde_json::to_value(MatchInfo::from(m))?)
            }
            other => Err(invalid_params(format!("{} is not a read", other.function()))),
        }
    }

    fn transact(&self, params: Value) -> Result<Value, TransportError> {
        let signed: SignedTransaction =
            serde_json::from_value(params).map_err(|e| invalid_params(e.to_string()))?;

        if let Some(Fault::Reject(reason)) = self.fault.lock().clone() {
            return Err(rejected(reason));
        }
        if !signed.verify() {
            return Err(rejected("invalid signature"));
        }
        if signed.request.chain_id != self.chain_id {
            return Err(rejected(format!("wrong chain id {}", signed.request.chain_id)));
        }

        let from = signed.from.as_str().to_string();
        let value = signed.request.value;
        let mut state = self.state.lock();

        let receipt = match signed.request.call {
            ContractCall::PlaceBet { match_id, amount, side, proof, scheme } => {
                let m = state
                    .matches
                    .get(&match_id)
                    .ok_or_else(|| rejected(format!("unknown match {}", match_id)))?;
                if !m.is_open() {
                    return Err(rejected("match is not accepting bets"));
                }
                if value == 0 {
                    return Err(rejected("bet carries no value"));
                }

                let encrypted_amount = ConfidentialValue::new(amount.0, scheme);
                let proof = Proof::from_bytes(proof.as_slice()).ok_or_else(|| rejected("malformed proof"))?;
                if !proof.is_bound_to(&encrypted_amount) {
                    return Err(rejected("proof does not attest the amount ciphertext"));
                }
                if let Some(expected) = self.network_key {
                    if proof.key_fingerprint() != Some(expected) {
                        return Err(rejected("proof made under a foreign key"));
                    }
                }

                let digests = [encrypted_amount.digest(), ciphertext_digest(side.as_slice())];
                if digests.iter().any(|d| state.seen_ciphertexts.contains(d)) {
                    return Err(rejected("ciphertext reused"));
                }
                state.seen_ciphertexts.extend(digests);

                let transaction_id = next_transaction_id(&mut state, &from);
                state.placed.push(PlacedBet {
                    from: from.clone(),
                    match_id: MatchId(match_id),
                    value,
                    transaction_id: transaction_id.clone(),
                });
                debug!(%from, match_id, tx = %transaction_id, "bet placed");
                TxReceipt { transaction_id, match_id: None }
            }

            ContractCall::CreateMatch { game, tournament, side_a, side_b, start_time, duration } => {
                let metadata = MatchMetadata { game, tournament, side_a, side_b };
                let id = insert_match(&mut state, metadata, &from, start_time, duration);
                let transaction_id = next_transaction_id(&mut state, &from);
                TxReceipt { transaction_id, match_id: Some(id.get()) }
            }

            ContractCall::GetMatchInfo { .. } => {
                return Err(invalid_params("getMatchInfo is not a transaction"));
            }
        };

        Ok(serde_json::to_value(receipt)?)
    }
}

#[async_trait]
impl LedgerRpc for SimulatedLedger {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let fault = self.fault.lock().clone();
        match fault {
            Some(Fault::Network) => {
                warn!(method, "simulated transport failure");
                return Err(TransportError::Closed);
            }
            Some(Fault::Stall) => {
                debug!(method, "simulated stall");
                std::future::pending::<()>().await;
            }
            _ => {}
        }

        match method {
            CALL_METHOD => self.read(params),
            SEND_TRANSACTION_METHOD => self.transact(params),
            other => Err(rpc_error(METHOD_NOT_FOUND_CODE, format!("unknown method {}", other))),
        }
    }
}

fn insert_match(
    state: &mut LedgerState,
    metadata: MatchMetadata,
    organizer: &str,
    start_time: u64,
    duration: u64,
) -> MatchId {
    let id = MatchId(state.next_match_id);
    state.next_match_id += 1;
    state.matches.insert(
        id.get(),
        Match {
            id,
            metadata,
            organizer: organizer.to_string(),
            start_time,
            end_time: start_time.saturating_add(duration),
            is_active: true,
            is_resolved: false,
            winning_side: None,
        },
    );
    id
}

fn next_transaction_id(state: &mut LedgerState, from: &str) -> String {
    state.tx_counter += 1;
    let mut hasher = DomainHasher::new(TX_ID_DOMAIN);
    hasher.update_framed(from.as_bytes());
    hasher.update_u64(state.tx_counter);
    format!("0x{}", hex::encode(hasher.finalize()))
}

fn rpc_error(code: i64, message: impl Into<String>) -> TransportError {
    TransportError::Rpc {
        code,
        message: message.into(),
    }
}

fn rejected(reason: impl Into<String>) -> TransportError {
    rpc_error(REJECTED_CODE, reason)
}

fn invalid_params(reason: impl Into<String>) -> TransportError {
    rpc_error(INVALID_PARAMS_CODE, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::protocol::HexBytes;
    use serde_json::json;

    fn metadata() -> MatchMetadata {
        MatchMetadata {
            game: "Valorant".into(),
            tournament: "Champions".into(),
            side_a: "Sentinels".into(),
            side_b: "Fnatic".into(),
        }
    }

    #[tokio::test]
    async fn test_get_match_info() {
        let ledger = SimulatedLedger::new();
        let id = ledger.seed_match(metadata(), "0xorg", 100, 50);

        let result = ledger
            .request(CALL_METHOD, json!({"function": "getMatchInfo", "match_id": id.get()}))
            .await
            .unwrap();
        let info: MatchInfo = serde_json::from_value(result).unwrap();
        assert_eq!(info.end_time, 150);
        assert!(info.is_active);
        assert_eq!(info.winner, 0);
    }

    #[tokio::test]
    async fn test_unknown_match_not_found() {
        let ledger = SimulatedLedger::new();
        let err = ledger
            .request(CALL_METHOD, json!({"function": "getMatchInfo", "match_id": 99}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rpc { code: NOT_FOUND_CODE, .. }));
    }

    #[tokio::test]
    async fn test_resolution_visible_in_reads() {
        let ledger = SimulatedLedger::new();
        let id = ledger.seed_match(metadata(), "0xorg", 100, 50);
        assert!(ledger.resolve_match(id, Some(Side::SideB)));
        assert!(!ledger.resolve_match(MatchId(42), None));

        let result = ledger
            .request(CALL_METHOD, json!({"function": "getMatchInfo", "match_id": id.get()}))
            .await
            .unwrap();
        let info: MatchInfo = serde_json::from_value(result).unwrap();
        assert!(info.is_resolved);
        assert!(!info.is_active);
        assert_eq!(info.winner, 2);
    }

    #[tokio::test]
    async fn test_unsigned_transaction_rejected() {
        let ledger = SimulatedLedger::new();
        let forged = json!({
            "from": "0xforged",
            "chain_id": SIMULATED_CHAIN_ID,
            "to": "0xcontract",
            "value": "0",
            "call": {"function": "createMatch", "game": "g", "tournament": "t",
                     "side_a": "a", "side_b": "b", "start_time": 1, "duration": 1},
            "public_key": HexBytes(vec![0; 32]),
            "signature": HexBytes(vec![0; 64]),
        });

        let err = ledger.request(SEND_TRANSACTION_METHOD, forged).await.unwrap_err();
        assert!(matches!(err, TransportError::Rpc { code: REJECTED_CODE, .. }));
    }

    #[tokio::test]
    async fn test_network_fault() {
        let ledger = SimulatedLedger::new();
        ledger.inject(Fault::Network);

        let err = ledger.request(CALL_METHOD, Value::Null).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        assert_eq!(ledger.request_count(), 1);

        ledger.clear_fault();
        let err = ledger.request("eth_chainId", Value::Null).await.unwrap_err();
        assert!(matches!(err, TransportError::Rpc { code: METHOD_NOT_FOUND_CODE, .. }));
    }

    #[tokio::test]
    async fn test_stall_never_completes() {
        let ledger = SimulatedLedger::new();
        ledger.inject(Fault::Stall);

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            ledger.request(CALL_METHOD, Value::Null),
        )
        .await;
        assert!(result.is_err());
    }
}
