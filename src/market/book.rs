//! Session-owned cache of match snapshots.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::types::{Match, MatchId, Resolution};

/// Anything that can report how a match was adjudicated.
pub trait ResolutionSource {
    /// `None` when no snapshot of the match is available.
    fn resolution(&self, match_id: MatchId) -> Option<Resolution>;
}

impl ResolutionSource for HashMap<MatchId, Match> {
    fn resolution(&self, match_id: MatchId) -> Option<Resolution> {
        self.get(&match_id).map(Match::resolution)
    }
}

impl ResolutionSource for BTreeMap<MatchId, Match> {
    fn resolution(&self, match_id: MatchId) -> Option<Resolution> {
        self.get(&match_id).map(Match::resolution)
    }
}

/// Latest known snapshot per match.
///
/// Snapshots are replaced wholesale; the book never edits a match itself.
#[derive(Default)]
pub struct MatchBook {
    matches: RwLock<BTreeMap<MatchId, Match>>,
}

impl MatchBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a snapshot.
    pub fn upsert(&self, snapshot: Match) {
        self.matches.write().insert(snapshot.id, snapshot);
    }

    /// Snapshot of one match.
    pub fn get(&self, id: MatchId) -> Option<Match> {
        self.matches.read().get(&id).cloned()
    }

    /// Matches still accepting bets, ordered by id.
    pub fn active(&self) -> Vec<Match> {
        self.matches
            .read()
            .values()
            .filter(|m| m.is_open())
            .cloned()
            .collect()
    }

    /// Number of cached matches.
    pub fn len(&self) -> usize {
        self.matches.read().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.matches.read().is_empty()
    }
}

impl ResolutionSource for MatchBook {
    fn resolution(&self, match_id: MatchId) -> Option<Resolution> {
        self.matches.read().get(&match_id).map(Match::resolution)
    }
}
