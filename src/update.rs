use crate::record::{MatchRecord, Winner};
use crate::store::{PairKey, StatStore, UnknownPlayer};

/// Default eligibility gate: matches between players more than this many
/// ranking points apart do not feed the rolling form or surface stats.
pub const DEFAULT_MAX_POINTS_GAP: f64 = 500.0;

#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// One threshold shared by the rolling win record and the surface
    /// tallies.
    pub max_points_gap: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_points_gap: DEFAULT_MAX_POINTS_GAP,
        }
    }
}

/// Folds one completed match into the store. Callers must apply each match
/// exactly once, in chronological order; no match identity is tracked here.
pub fn apply(store: &mut StatStore, rec: &MatchRecord, gate: &GateConfig) -> Result<(), UnknownPlayer> {
    // Validate both endpoints before touching anything so a failed call
    // leaves the store unchanged.
    store.aggregate_of(&rec.player_a)?;
    store.aggregate_of(&rec.player_b)?;

    let diff_a = rec.points_diff_a();
    let sets = rec.sets_played();
    let gated = rec.points_gap() <= gate.max_points_gap;
    let (won_a, won_b): (u8, u8) = match rec.winner {
        Winner::A => (1, 0),
        Winner::B => (0, 1),
    };

    {
        let a = store.aggregate_mut(&rec.player_a)?;
        a.matches_played_total += 1;
        a.points_diff_total += diff_a;
        a.sets_played_total += sets;
        if gated {
            a.recent_outcomes.push(won_a);
            let tally = a.surface_tally_mut(rec.surface);
            tally.games += 1;
            tally.wins += u32::from(won_a);
        }
    }
    {
        let b = store.aggregate_mut(&rec.player_b)?;
        b.matches_played_total += 1;
        b.points_diff_total -= diff_a;
        b.sets_played_total += sets;
        if gated {
            b.recent_outcomes.push(won_b);
            let tally = b.surface_tally_mut(rec.surface);
            tally.games += 1;
            tally.wins += u32::from(won_b);
        }
    }

    // Head-to-head is unconditional and kept complementary in both orders.
    let forward = store.pair_mut(PairKey::new(&rec.player_a, &rec.player_b));
    forward.matches += 1;
    forward.outcomes.push(won_a);

    let reverse = store.pair_mut(PairKey::new(&rec.player_b, &rec.player_a));
    reverse.matches += 1;
    reverse.outcomes.push(won_b);

    Ok(())
}
