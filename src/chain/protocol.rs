//! Settlement Ledger Wire Format
//!
//! Contract calls, transactions and receipts exchanged with the settlement
//! ledger over JSON-RPC. Byte fields travel as `0x`-prefixed hex and `u128`
//! values as decimal strings so nothing loses precision in JSON.

use std::fmt;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::chain::signer::{address_for, Address};
use crate::core::hash::{Digest32, DomainHasher};
use crate::crypto::SchemeTag;
use crate::error::Result;
use crate::market::{Match, MatchId, MatchMetadata, Side};

// =============================================================================
// RPC SURFACE
// =============================================================================

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Read-only contract call.
pub const CALL_METHOD: &str = "bet_call";

/// Signed, state-changing transaction.
pub const SEND_TRANSACTION_METHOD: &str = "bet_sendTransaction";

/// Error code: requested entity does not exist.
pub const NOT_FOUND_CODE: i64 = -32004;

/// Error code: ledger refused the transaction.
pub const REJECTED_CODE: i64 = -32003;

/// Error code: params did not decode.
pub const INVALID_PARAMS_CODE: i64 = -32602;

/// Error code: unknown method.
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Domain separator for transaction signing digests.
const TX_DOMAIN: &[u8] = b"CIPHER_BET_TX_V1";

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always "2.0".
    pub jsonrpc: String,
    /// Correlation id.
    pub id: u64,
    /// Method name.
    pub method: String,
    /// Method params.
    pub params: Value,
}

impl RpcRequest {
    /// Build a request.
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Incoming JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Correlation id.
    pub id: u64,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Error code.
    pub code: i64,
    /// Human-readable reason.
    pub message: String,
}

// =============================================================================
// FIELD ENCODINGS
// =============================================================================

/// Byte string encoded as `0x`-prefixed hex.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    /// Underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(digits).map(HexBytes).map_err(de::Error::custom)
    }
}

/// `u128` as a decimal string.
mod u128_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// =============================================================================
// CONTRACT CALLS
// =============================================================================

/// Settlement contract functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "camelCase")]
pub enum ContractCall {
    /// Place an encrypted bet. Value-bearing.
    PlaceBet {
        /// Target match.
        match_id: u64,
        /// Encrypted amount.
        amount: HexBytes,
        /// Encrypted side.
        side: HexBytes,
        /// Proof over the encrypted amount.
        proof: HexBytes,
        /// Scheme both ciphertexts were sealed with.
        scheme: SchemeTag,
    },

    /// Open a new match.
    CreateMatch {
        /// Game title.
        game: String,
        /// Tournament name.
        tournament: String,
        /// First side.
        side_a: String,
        /// Second side.
        side_b: String,
        /// Start time (unix seconds).
        start_time: u64,
        /// Length in seconds.
        duration: u64,
    },

    /// Read a match.
    GetMatchInfo {
        /// Match to read.
        match_id: u64,
    },
}

impl ContractCall {
    /// Function name as the contract knows it.
    pub fn function(&self) -> &'static str {
        match self {
            ContractCall::PlaceBet { .. } => "placeBet",
            ContractCall::CreateMatch { .. } => "createMatch",
            ContractCall::GetMatchInfo { .. } => "getMatchInfo",
        }
    }

    /// Build a `createMatch` call.
    pub fn create_match(metadata: &MatchMetadata, start_time: u64, duration: u64) -> Self {
        ContractCall::CreateMatch {
            game: metadata.game.clone(),
            tournament: metadata.tournament.clone(),
            side_a: metadata.side_a.clone(),
            side_b: metadata.side_b.clone(),
            start_time,
            duration,
        }
    }

    /// Serialize to a JSON-RPC params value.
    pub fn to_value(&self) -> std::result::Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Target chain.
    pub chain_id: u64,
    /// Contract address.
    pub to: String,
    /// Attached transfer value in base units.
    #[serde(with = "u128_string")]
    pub value: u128,
    /// Contract call.
    pub call: ContractCall,
}

impl TransactionRequest {
    /// Digest a signer commits to.
    pub fn signing_digest(&self) -> std::result::Result<Digest32, serde_json::Error> {
        let call = serde_json::to_vec(&self.call)?;
        let mut hasher = DomainHasher::new(TX_DOMAIN);
        hasher.update_u64(self.chain_id);
        hasher.update_framed(self.to.as_bytes());
        hasher.update_u128(self.value);
        hasher.update_framed(&call);
        Ok(hasher.finalize())
    }
}

/// Transaction plus sender and ed25519 signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Sender address.
    pub from: Address,
    /// Signed body.
    #[serde(flatten)]
    pub request: TransactionRequest,
    /// Sender's verifying key.
    pub public_key: HexBytes,
    /// Signature over [`TransactionRequest::signing_digest`].
    pub signature: HexBytes,
}

impl SignedTransaction {
    /// Check the signature and that `from` belongs to `public_key`.
    pub fn verify(&self) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(self.public_key.as_slice()) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(self.signature.as_slice()) else {
            return false;
        };
        let Ok(digest) = self.request.signing_digest() else {
            return false;
        };

        address_for(&key) == self.from && key.verify(&digest, &signature).is_ok()
    }
}

/// Result of an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Ledger transaction id.
    pub transaction_id: String,
    /// Match id assigned by `createMatch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<u64>,
}

// =============================================================================
// READS
// =============================================================================

/// `getMatchInfo` result tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    /// Game title.
    pub game: String,
    /// Tournament name.
    pub tournament: String,
    /// First side.
    pub side_a: String,
    /// Second side.
    pub side_b: String,
    /// Accepting bets.
    pub is_active: bool,
    /// Adjudicated.
    pub is_resolved: bool,
    /// Creator address.
    pub organizer: String,
    /// Start time (unix seconds).
    pub start_time: u64,
    /// End time (unix seconds).
    pub end_time: u64,
    /// Winner code; 0 while undecided.
    pub winner: u8,
}

impl MatchInfo {
    /// Snapshot for `match_id`. Fails on a winner code outside the side domain.
    pub fn into_match(self, match_id: MatchId) -> Result<Match> {
        Ok(Match {
            id: match_id,
            winning_side: Side::from_winner_code(self.winner)?,
            metadata: MatchMetadata {
                game: self.game,
                tournament: self.tournament,
                side_a: self.side_a,
                side_b: self.side_b,
            },
            organizer: self.organizer,
            start_time: self.start_time,
            end_time: self.end_time,
            is_active: self.is_active,
            is_resolved: self.is_resolved,
        })
    }
}

impl From<&Match> for MatchInfo {
    fn from(m: &Match) -> Self {
        Self {
            game: m.metadata.game.clone(),
            tournament: m.metadata.tournament.clone(),
            side_a: m.metadata.side_a.clone(),
            side_b: m.metadata.side_b.clone(),
            is_active: m.is_active,
            is_resolved: m.is_resolved,
            organizer: m.organizer.clone(),
            start_time: m.start_time,
            end_time: m.end_time,
            winner: m.winning_side.map_or(0, Side::code),
        }
    }
}
