//! Error taxonomy for the bet pipeline.
//!
//! Every failure a caller can observe is a [`BetError`] variant. Callers that
//! only need the category match on [`BetError::kind`].

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::ledger::bet::BetStatus;

/// Pipeline errors.
#[derive(Debug, Clone, Error)]
pub enum BetError {
    /// Amount is zero, negative, too precise, or too large to transfer.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Side code outside the two-sided domain.
    #[error("invalid side code: {0}")]
    InvalidSide(u8),

    /// Match identifier could not be parsed.
    #[error("invalid match id: {0}")]
    InvalidMatchId(String),

    /// No encryption context (or an empty key).
    #[error("encryption key not initialized")]
    UninitializedKey,

    /// Key bytes do not fit the active scheme.
    #[error("malformed encryption key: expected {expected} bytes, got {got}")]
    MalformedKey {
        /// Length the scheme requires.
        expected: usize,
        /// Length supplied.
        got: usize,
    },

    /// AEAD sealing failed.
    #[error("encryption failed")]
    Encryption,

    /// Signer absent or disconnected.
    #[error("signer not connected")]
    NotConnected,

    /// Transport failure talking to the settlement ledger.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The settlement ledger refused the transaction.
    #[error("rejected by settlement ledger: {0}")]
    Rejected(String),

    /// Deadline elapsed; the remote transaction may or may not have applied.
    #[error("timed out after {0:?}, outcome unknown")]
    Timeout(Duration),

    /// The ledger has no such match.
    #[error("match {0} not found")]
    NotFound(u64),

    /// A bet with this id is already recorded.
    #[error("duplicate bet id {0}")]
    DuplicateId(Uuid),

    /// No recorded bet has this id.
    #[error("unknown bet {0}")]
    UnknownBet(Uuid),

    /// Ciphertext was already part of an earlier submission.
    #[error("ciphertext already submitted in an earlier transaction")]
    CiphertextReused,

    /// Bet lifecycle only moves forward.
    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status.
        from: BetStatus,
        /// Requested status.
        to: BetStatus,
    },
}

/// Fieldless error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`BetError::InvalidAmount`].
    InvalidAmount,
    /// See [`BetError::InvalidSide`].
    InvalidSide,
    /// See [`BetError::InvalidMatchId`].
    InvalidMatchId,
    /// See [`BetError::UninitializedKey`].
    UninitializedKey,
    /// See [`BetError::MalformedKey`].
    MalformedKey,
    /// See [`BetError::Encryption`].
    Encryption,
    /// See [`BetError::NotConnected`].
    NotConnected,
    /// See [`BetError::NetworkError`].
    NetworkError,
    /// See [`BetError::Rejected`].
    Rejected,
    /// See [`BetError::Timeout`].
    Timeout,
    /// See [`BetError::NotFound`].
    NotFound,
    /// See [`BetError::DuplicateId`].
    DuplicateId,
    /// See [`BetError::UnknownBet`].
    UnknownBet,
    /// See [`BetError::CiphertextReused`].
    CiphertextReused,
    /// See [`BetError::InvalidTransition`].
    InvalidTransition,
}

impl BetError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::InvalidSide(_) => ErrorKind::InvalidSide,
            Self::InvalidMatchId(_) => ErrorKind::InvalidMatchId,
            Self::UninitializedKey => ErrorKind::UninitializedKey,
            Self::MalformedKey { .. } => ErrorKind::MalformedKey,
            Self::Encryption => ErrorKind::Encryption,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::NetworkError(_) => ErrorKind::NetworkError,
            Self::Rejected(_) => ErrorKind::Rejected,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateId(_) => ErrorKind::DuplicateId,
            Self::UnknownBet(_) => ErrorKind::UnknownBet,
            Self::CiphertextReused => ErrorKind::CiphertextReused,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
        }
    }

    /// Detected locally before any cryptographic or network work.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidAmount
                | ErrorKind::InvalidSide
                | ErrorKind::InvalidMatchId
                | ErrorKind::UninitializedKey
                | ErrorKind::MalformedKey
                | ErrorKind::NotConnected
        )
    }

    /// The remote side may have applied the transaction.
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, BetError>;
