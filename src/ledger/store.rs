//! Per-participant bet storage.
//!
//! Bets live in an append-only arena with an id index and a per-bettor
//! index of arena slots. A single write lock covers an append or a status
//! change, so readers see either the whole bet or none of it. Reads return
//! owned snapshots.

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::chain::signer::Address;
use crate::error::{BetError, Result};
use crate::ledger::bet::{Bet, BetId, BetOutcome, BetStatus};
use crate::market::{Resolution, ResolutionSource};

#[derive(Default)]
struct Arena {
    bets: Vec<Bet>,
    by_id: HashMap<BetId, usize>,
    by_bettor: HashMap<Address, Vec<usize>>,
}

impl Arena {
    fn for_bettor<'a>(&'a self, bettor: &Address) -> impl Iterator<Item = &'a Bet> + 'a {
        self.by_bettor
            .get(bettor)
            .into_iter()
            .flat_map(move |slots| slots.iter().map(move |&slot| &self.bets[slot]))
    }
}

/// Append-only bet store with aggregate queries.
#[derive(Default)]
pub struct BetLedger {
    arena: RwLock<Arena>,
}

impl BetLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bet. Fails with `DuplicateId` if the id is already present.
    pub fn record(&self, bet: Bet) -> Result<()> {
        let mut arena = self.arena.write();
        let id = bet.id();
        if arena.by_id.contains_key(&id) {
            return Err(BetError::DuplicateId(id.0));
        }

        let slot = arena.bets.len();
        arena.by_id.insert(id, slot);
        arena.by_bettor.entry(bet.bettor().clone()).or_default().push(slot);
        debug!(bet = %id, status = ?bet.status(), "recorded bet");
        arena.bets.push(bet);
        Ok(())
    }

    /// Move a recorded bet to a terminal status and return the result.
    pub fn settle(&self, id: BetId, status: BetStatus, transaction_id: Option<String>) -> Result<Bet> {
        let mut arena = self.arena.write();
        let slot = *arena.by_id.get(&id).ok_or(BetError::UnknownBet(id.0))?;
        let bet = &mut arena.bets[slot];
        bet.settle(status, transaction_id)?;
        debug!(bet = %id, ?status, "settled bet");
        Ok(bet.clone())
    }

    /// Bets placed by `bettor`, in insertion order.
    pub fn list_bets(&self, bettor: &Address) -> Vec<Bet> {
        self.arena.read().for_bettor(bettor).cloned().collect()
    }

    /// Sum of amounts over every recorded bet, whatever its status.
    pub fn total_wagered(&self, bettor: &Address) -> Decimal {
        self.arena.read().for_bettor(bettor).map(Bet::amount).sum()
    }

    /// Number of recorded bets.
    pub fn bet_count(&self, bettor: &Address) -> usize {
        self.arena
            .read()
            .by_bettor
            .get(bettor)
            .map_or(0, Vec::len)
    }

    /// Fraction of confirmed bets on resolved matches that picked the winner.
    ///
    /// Returns 0.0 when there are no such bets. Matches the source knows
    /// nothing about count as unresolved.
    pub fn win_rate(&self, bettor: &Address, resolutions: &impl ResolutionSource) -> f64 {
        let arena = self.arena.read();
        let mut settled = 0u32;
        let mut won = 0u32;

        for bet in arena.for_bettor(bettor) {
            if bet.status() != BetStatus::Confirmed {
                continue;
            }
            if let Some(Resolution::Settled { winner }) = resolutions.resolution(bet.match_id()) {
                settled += 1;
                if winner == Some(bet.side()) {
                    won += 1;
                }
            }
        }

        if settled == 0 {
            0.0
        } else {
            f64::from(won) / f64::from(settled)
        }
    }

    /// Bet by id.
    pub fn get(&self, id: BetId) -> Option<Bet> {
        let arena = self.arena.read();
        arena.by_id.get(&id).map(|&slot| arena.bets[slot].clone())
    }

    /// Outcome of a recorded bet.
    pub fn outcome(&self, id: BetId, resolutions: &impl ResolutionSource) -> Option<BetOutcome> {
        let arena = self.arena.read();
        let bet = &arena.bets[*arena.by_id.get(&id)?];
        Some(bet.outcome(resolutions.resolution(bet.match_id())))
    }

    /// Bets across all bettors.
    pub fn len(&self) -> usize {
        self.arena.read().bets.len()
    }

    /// No bets recorded.
    pub fn is_empty(&self) -> bool {
        self.arena.read().bets.is_empty()
    }
}
