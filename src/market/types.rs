//! Match and side types.
//!
//! Matches are owned by the settlement ledger; the pipeline only holds
//! read snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{BetError, Result};

/// The outcome a bet backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// First listed participant.
    SideA,
    /// Second listed participant.
    SideB,
}

impl Side {
    /// Wire code used by the settlement contract.
    pub const fn code(self) -> u8 {
        match self {
            Side::SideA => 1,
            Side::SideB => 2,
        }
    }

    /// Decode the contract's `winner` field, where 0 means no winner yet.
    pub fn from_winner_code(code: u8) -> Result<Option<Side>> {
        match code {
            0 => Ok(None),
            other => Side::try_from(other).map(Some),
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = BetError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Side::SideA),
            2 => Ok(Side::SideB),
            other => Err(BetError::InvalidSide(other)),
        }
    }
}

/// Ledger-assigned match identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl MatchId {
    /// Create from raw value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MatchId {
    type Err = BetError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(MatchId)
            .map_err(|_| BetError::InvalidMatchId(s.to_string()))
    }
}

/// Descriptive fields of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMetadata {
    /// Game title.
    pub game: String,
    /// Tournament or league.
    pub tournament: String,
    /// Name of side A.
    pub side_a: String,
    /// Name of side B.
    pub side_b: String,
}

/// Read snapshot of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match identifier.
    pub id: MatchId,
    /// Descriptive fields.
    pub metadata: MatchMetadata,
    /// Address that created the match.
    pub organizer: String,
    /// Start time (unix seconds).
    pub start_time: u64,
    /// End time (unix seconds).
    pub end_time: u64,
    /// Accepting bets.
    pub is_active: bool,
    /// Adjudicated.
    pub is_resolved: bool,
    /// Winner, once resolved with a winner.
    pub winning_side: Option<Side>,
}

impl Match {
    /// Active and not yet resolved.
    pub fn is_open(&self) -> bool {
        self.is_active && !self.is_resolved
    }

    /// Resolution state of this snapshot.
    pub fn resolution(&self) -> Resolution {
        if self.is_resolved {
            Resolution::Settled { winner: self.winning_side }
        } else {
            Resolution::Pending
        }
    }

    /// Display name of a side.
    pub fn side_name(&self, side: Side) -> &str {
        match side {
            Side::SideA => &self.metadata.side_a,
            Side::SideB => &self.metadata.side_b,
        }
    }
}

/// Adjudication state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Not adjudicated yet.
    Pending,
    /// Adjudicated. `winner` is `None` for a void result.
    Settled {
        /// Winning side.
        winner: Option<Side>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_match;

    #[test]
    fn test_side_codes() {
        assert_eq!(Side::SideA.code(), 1);
        assert_eq!(Side::SideB.code(), 2);
        assert_eq!(Side::try_from(1).unwrap(), Side::SideA);
        assert_eq!(Side::try_from(2).unwrap(), Side::SideB);
    }

    #[test]
    fn test_invalid_side_code() {
        assert!(matches!(Side::try_from(0), Err(BetError::InvalidSide(0))));
        assert!(matches!(Side::try_from(3), Err(BetError::InvalidSide(3))));
    }

    #[test]
    fn test_winner_code() {
        assert_eq!(Side::from_winner_code(0).unwrap(), None);
        assert_eq!(Side::from_winner_code(2).unwrap(), Some(Side::SideB));
        assert!(Side::from_winner_code(9).is_err());
    }

    #[test]
    fn test_match_id_parse() {
        assert_eq!("1".parse::<MatchId>().unwrap(), MatchId(1));
        assert_eq!(" 42 ".parse::<MatchId>().unwrap(), MatchId(42));
        assert!(matches!("abc".parse::<MatchId>(), Err(BetError::InvalidMatchId(_))));
        assert!(matches!("-1".parse::<MatchId>(), Err(BetError::InvalidMatchId(_))));
    }

    #[test]
    fn test_resolution() {
        let mut m = sample_match(1);
        assert!(m.is_open());
        assert_eq!(m.resolution(), Resolution::Pending);

        m.is_resolved = true;
        m.winning_side = Some(Side::SideA);
        assert!(!m.is_open());
        assert_eq!(m.resolution(), Resolution::Settled { winner: Some(Side::SideA) });
        assert_eq!(m.side_name(Side::SideA), "Sentinels");
    }
}
