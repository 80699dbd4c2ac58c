//! Bet records and their lifecycle.
//!
//! ```text
//! Created ──► Submitting ──┬──► Confirmed
//!                          ├──► Failed
//!                          └──► Unknown   (timed out, outcome unknown)
//! ```
//!
//! Ciphertexts and the proof are fixed at creation. Only the status and
//! transaction id move, and only forward.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::chain::signer::Address;
use crate::crypto::{ConfidentialValue, Proof};
use crate::error::{BetError, Result};
use crate::market::{MatchId, Resolution, Side};

/// Stable bet identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BetId(pub Uuid);

impl BetId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    /// Encoded and proven, not yet sent.
    Created,
    /// Handed to the submission client.
    Submitting,
    /// Ledger returned a transaction id.
    Confirmed,
    /// Submission failed with a known outcome.
    Failed,
    /// Submission timed out; the transaction may or may not have applied.
    Unknown,
}

impl BetStatus {
    /// No further transitions allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::Unknown)
    }

    /// Whether `self -> next` is a legal forward step.
    pub fn can_transition_to(self, next: BetStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Submitting)
                | (Self::Submitting, Self::Confirmed)
                | (Self::Submitting, Self::Failed)
                | (Self::Submitting, Self::Unknown)
        )
    }
}

/// What a bet means for the bettor right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetOutcome {
    /// Confirmed; match not resolved (or no snapshot yet).
    Pending,
    /// Confirmed on the winning side.
    Won,
    /// Confirmed on a match that resolved otherwise.
    Lost,
    /// Never reached the ledger.
    Void,
    /// Submission timed out; check the ledger.
    Unknown,
}

/// A confidential wager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    id: BetId,
    bettor: Address,
    match_id: MatchId,
    side: Side,
    amount: Decimal,
    encrypted_amount: ConfidentialValue,
    encrypted_side: ConfidentialValue,
    proof: Proof,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    status: BetStatus,
}

impl Bet {
    /// New bet in `Created` state.
    pub fn new(
        bettor: Address,
        match_id: MatchId,
        side: Side,
        amount: Decimal,
        encrypted_amount: ConfidentialValue,
        encrypted_side: ConfidentialValue,
        proof: Proof,
    ) -> Self {
        Self {
            id: BetId::new(),
            bettor,
            match_id,
            side,
            amount,
            encrypted_amount,
            encrypted_side,
            proof,
            transaction_id: None,
            created_at: Utc::now(),
            status: BetStatus::Created,
        }
    }

    /// Bet id.
    pub fn id(&self) -> BetId {
        self.id
    }

    /// Bettor address.
    pub fn bettor(&self) -> &Address {
        &self.bettor
    }

    /// Match the bet is on.
    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Chosen side.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Wagered amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Encrypted amount.
    pub fn encrypted_amount(&self) -> &ConfidentialValue {
        &self.encrypted_amount
    }

    /// Encrypted side.
    pub fn encrypted_side(&self) -> &ConfidentialValue {
        &self.encrypted_side
    }

    /// Proof over the encrypted amount.
    pub fn proof(&self) -> &Proof {
        &self.proof
    }

    /// Ledger transaction id, once confirmed.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Lifecycle state.
    pub fn status(&self) -> BetStatus {
        self.status
    }

    /// `Created -> Submitting`.
    pub fn begin_submission(&mut self) -> Result<()> {
        self.advance(BetStatus::Submitting)
    }

    /// `Submitting -> Confirmed` with the ledger's transaction id.
    pub fn confirm(&mut self, transaction_id: String) -> Result<()> {
        self.advance(BetStatus::Confirmed)?;
        self.transaction_id = Some(transaction_id);
        Ok(())
    }

    /// `Submitting -> Failed`.
    pub fn fail(&mut self) -> Result<()> {
        self.advance(BetStatus::Failed)
    }

    /// `Submitting -> Unknown`.
    pub fn mark_unknown(&mut self) -> Result<()> {
        self.advance(BetStatus::Unknown)
    }

    /// `Submitting ->` a terminal status. Only `Confirmed` carries a
    /// transaction id.
    pub fn settle(&mut self, status: BetStatus, transaction_id: Option<String>) -> Result<()> {
        match (status, transaction_id) {
            (BetStatus::Confirmed, Some(tx)) => self.confirm(tx),
            (BetStatus::Failed, None) => self.fail(),
            (BetStatus::Unknown, None) => self.mark_unknown(),
            (to, _) => Err(BetError::InvalidTransition { from: self.status, to }),
        }
    }

    /// Outcome given the match's resolution, if known.
    pub fn outcome(&self, resolution: Option<Resolution>) -> BetOutcome {
        match self.status {
            BetStatus::Failed => BetOutcome::Void,
            BetStatus::Unknown => BetOutcome::Unknown,
            BetStatus::Created | BetStatus::Submitting => BetOutcome::Pending,
            BetStatus::Confirmed => match resolution {
                Some(Resolution::Settled { winner }) if winner == Some(self.side) => BetOutcome::Won,
                Some(Resolution::Settled { .. }) => BetOutcome::Lost,
                Some(Resolution::Pending) | None => BetOutcome::Pending,
            },
        }
    }

    fn advance(&mut self, next: BetStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(BetError::InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }
}
