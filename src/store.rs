use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::Surface;

/// Query referenced a player that was never registered. Recoverable: the
/// caller gets no data and the store is untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlayer(pub String);

impl fmt::Display for UnknownPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown player {:?}", self.0)
    }
}

impl std::error::Error for UnknownPlayer {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceTally {
    pub wins: u32,
    pub games: u32,
}

/// Running totals for one player. `recent_outcomes` is append-only storage;
/// readers only ever look at its suffix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerAggregate {
    pub points_diff_total: i64,
    pub sets_played_total: u32,
    pub matches_played_total: u32,
    pub recent_outcomes: Vec<u8>,
    pub surface: [SurfaceTally; 3],
}

impl PlayerAggregate {
    pub fn surface_tally(&self, surface: Surface) -> SurfaceTally {
        self.surface[surface.index()]
    }

    pub(crate) fn surface_tally_mut(&mut self, surface: Surface) -> &mut SurfaceTally {
        &mut self.surface[surface.index()]
    }
}

/// Head-to-head record for one *ordered* pair; `outcomes` is from the first
/// player's perspective. The reversed key always holds the complement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub outcomes: Vec<u8>,
    pub matches: u32,
}

static EMPTY_PAIR: HeadToHead = HeadToHead {
    outcomes: Vec::new(),
    matches: 0,
};

/// Ordered pair of player names; (A, B) and (B, A) are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub first: String,
    pub second: String,
}

impl PairKey {
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            first: self.second.clone(),
            second: self.first.clone(),
        }
    }
}

/// All running per-player and per-pair statistics. Reads go through
/// `aggregate_of`/`pair_of`; every write goes through `update::apply` so the
/// cross-player invariants live in one place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatStore {
    players: HashMap<String, PlayerAggregate>,
    pairs: HashMap<PairKey, HeadToHead>,
}

impl StatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-initializes aggregates for every given player. Idempotent:
    /// already-registered players keep their accumulated state. Pairwise
    /// records are materialized lazily on first meeting; `pair_of` reports
    /// the zero record for registered pairs that never played.
    pub fn register<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.players
                .entry(name.as_ref().to_string())
                .or_insert_with(PlayerAggregate::default);
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn aggregate_of(&self, name: &str) -> Result<&PlayerAggregate, UnknownPlayer> {
        self.players
            .get(name)
            .ok_or_else(|| UnknownPlayer(name.to_string()))
    }

    pub fn pair_of(&self, first: &str, second: &str) -> Result<&HeadToHead, UnknownPlayer> {
        // Both endpoints must be known even when the pair never met.
        self.aggregate_of(first)?;
        self.aggregate_of(second)?;
        Ok(self
            .pairs
            .get(&PairKey::new(first, second))
            .unwrap_or(&EMPTY_PAIR))
    }

    pub(crate) fn aggregate_mut(&mut self, name: &str) -> Result<&mut PlayerAggregate, UnknownPlayer> {
        self.players
            .get_mut(name)
            .ok_or_else(|| UnknownPlayer(name.to_string()))
    }

    pub(crate) fn pair_mut(&mut self, key: PairKey) -> &mut HeadToHead {
        self.pairs.entry(key).or_default()
    }

    pub(crate) fn iter_players(&self) -> impl Iterator<Item = (&String, &PlayerAggregate)> {
        self.players.iter()
    }

    pub(crate) fn iter_pairs(&self) -> impl Iterator<Item = (&PairKey, &HeadToHead)> {
        self.pairs.iter()
    }

    pub(crate) fn from_parts(
        players: HashMap<String, PlayerAggregate>,
        pairs: HashMap<PairKey, HeadToHead>,
    ) -> Self {
        Self { players, pairs }
    }
}
