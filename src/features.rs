use crate::record::Surface;
use crate::store::{StatStore, UnknownPlayer};

/// Rolling window for both the form ratio and the head-to-head ratio.
pub const FORM_WINDOW: usize = 10;

/// What to do when a ratio's denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DenominatorPolicy {
    /// Emit NaN so the consumer can tell "no data" from a measured zero.
    #[default]
    Sentinel,
    /// Treat the denominator as 1. Kept only for parity with the legacy
    /// inference path; it reports a fabricated ratio for unseen players.
    NeutralOne,
}

/// Point-in-time feature set for one prospective match-up. Ratios with no
/// supporting data are NaN under the default policy; the `*_matches` and
/// `*_games` fields carry the support counts behind each ratio.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    pub p1: String,
    pub p2: String,
    pub p1_avg: f64,
    pub p2_avg: f64,
    pub diff_avg: f64,
    pub p1_matches: u32,
    pub p2_matches: u32,
    pub p1_wr: f64,
    pub p2_wr: f64,
    pub diff_wr: f64,
    pub h2h: f64,
    pub h2h_matches: u32,
    pub p1_swr: f64,
    pub p2_swr: f64,
    pub diff_swr: f64,
    pub p1_surface_games: u32,
    pub p2_surface_games: u32,
}

impl FeatureVector {
    /// Resolves a model feature by its exported column name.
    pub fn value(&self, name: &str) -> Option<f64> {
        Some(match name {
            "P1_Avg" => self.p1_avg,
            "P2_Avg" => self.p2_avg,
            "DIFF_Avg" => self.diff_avg,
            "P1_Wr" => self.p1_wr,
            "P2_Wr" => self.p2_wr,
            "DIFF_Wr" => self.diff_wr,
            "P1P2_H2H" => self.h2h,
            "P1_SWr" => self.p1_swr,
            "P2_SWr" => self.p2_swr,
            "DIFF_SWr" => self.diff_swr,
            "P1_Matches" => f64::from(self.p1_matches),
            "P2_Matches" => f64::from(self.p2_matches),
            "H2H_Matches" => f64::from(self.h2h_matches),
            _ => return None,
        })
    }
}

/// Derives the feature vector for (p1, p2) on `surface` from the state
/// accumulated so far. Pure read: the store is never touched.
pub fn build(
    store: &StatStore,
    p1: &str,
    p2: &str,
    surface: Surface,
    policy: DenominatorPolicy,
) -> Result<FeatureVector, UnknownPlayer> {
    let a = store.aggregate_of(p1)?;
    let b = store.aggregate_of(p2)?;
    let pair = store.pair_of(p1, p2)?;

    let p1_avg = ratio(a.points_diff_total as f64, a.sets_played_total, policy);
    let p2_avg = ratio(b.points_diff_total as f64, b.sets_played_total, policy);

    let p1_wr = window_mean(&a.recent_outcomes);
    let p2_wr = window_mean(&b.recent_outcomes);

    let h2h_used = (pair.matches as usize).min(FORM_WINDOW).min(pair.outcomes.len());
    let h2h = if h2h_used == 0 {
        f64::NAN
    } else {
        mean(&pair.outcomes[pair.outcomes.len() - h2h_used..])
    };

    let sa = a.surface_tally(surface);
    let sb = b.surface_tally(surface);
    let p1_swr = ratio(f64::from(sa.wins), sa.games, policy);
    let p2_swr = ratio(f64::from(sb.wins), sb.games, policy);

    Ok(FeatureVector {
        p1: p1.to_string(),
        p2: p2.to_string(),
        p1_avg: round2(p1_avg),
        p2_avg: round2(p2_avg),
        diff_avg: round2(p1_avg - p2_avg),
        p1_matches: a.matches_played_total,
        p2_matches: b.matches_played_total,
        p1_wr: round2(p1_wr),
        p2_wr: round2(p2_wr),
        diff_wr: round2(p1_wr - p2_wr),
        h2h: round2(h2h),
        h2h_matches: h2h_used as u32,
        p1_swr: round2(p1_swr),
        p2_swr: round2(p2_swr),
        diff_swr: round2(p1_swr - p2_swr),
        p1_surface_games: sa.games,
        p2_surface_games: sb.games,
    })
}

fn ratio(numer: f64, denom: u32, policy: DenominatorPolicy) -> f64 {
    if denom > 0 {
        numer / f64::from(denom)
    } else {
        match policy {
            DenominatorPolicy::Sentinel => f64::NAN,
            DenominatorPolicy::NeutralOne => numer,
        }
    }
}

/// Mean of the last `FORM_WINDOW` outcomes; NaN when there are none. The
/// window never widens no matter how long the history grows.
fn window_mean(outcomes: &[u8]) -> f64 {
    let start = outcomes.len().saturating_sub(FORM_WINDOW);
    let tail = &outcomes[start..];
    if tail.is_empty() { f64::NAN } else { mean(tail) }
}

fn mean(outcomes: &[u8]) -> f64 {
    let sum: u32 = outcomes.iter().map(|o| u32::from(*o)).sum();
    f64::from(sum) / outcomes.len() as f64
}

/// Two-decimal rounding for reported values only; NaN passes through.
fn round2(x: f64) -> f64 {
    if x.is_finite() { (x * 100.0).round() / 100.0 } else { x }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::record::{MatchRecord, Winner};
    use crate::update::{self, GateConfig};

    fn played(a: &str, b: &str, winner: Winner, surface: Surface) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            surface,
            player_a: a.to_string(),
            player_b: b.to_string(),
            pts_a: 1200.0,
            pts_b: 1100.0,
            sets_a: [6, 6, 0, 0, 0],
            sets_b: [4, 4, 0, 0, 0],
            winner,
            odds_a: None,
            odds_b: None,
        }
    }

    #[test]
    fn zero_support_yields_nan_not_zero() {
        let mut store = StatStore::new();
        store.register(["Fresh A", "Fresh B"]);
        let v = build(&store, "Fresh A", "Fresh B", Surface::Hard, DenominatorPolicy::Sentinel)
            .unwrap();
        assert!(v.p1_avg.is_nan());
        assert!(v.diff_avg.is_nan());
        assert!(v.p1_wr.is_nan());
        assert!(v.h2h.is_nan());
        assert!(v.p1_swr.is_nan());
        assert_eq!(v.h2h_matches, 0);
        assert_eq!(v.p1_surface_games, 0);
    }

    #[test]
    fn neutral_one_policy_fills_avg_and_surface_only() {
        let mut store = StatStore::new();
        store.register(["Fresh A", "Fresh B"]);
        let v = build(&store, "Fresh A", "Fresh B", Surface::Hard, DenominatorPolicy::NeutralOne)
            .unwrap();
        assert_eq!(v.p1_avg, 0.0);
        assert_eq!(v.p1_swr, 0.0);
        // The form and head-to-head ratios stay sentinels in both modes.
        assert!(v.p1_wr.is_nan());
        assert!(v.h2h.is_nan());
    }

    #[test]
    fn window_mean_reads_only_the_suffix() {
        let mut outcomes = vec![0u8; 90];
        outcomes.extend([1u8; 10]);
        assert_eq!(window_mean(&outcomes), 1.0);
        assert_eq!(window_mean(&[1, 0]), 0.5);
        assert!(window_mean(&[]).is_nan());
    }

    #[test]
    fn averages_come_from_accumulated_points() {
        let mut store = StatStore::new();
        store.register(["X", "Y"]);
        update::apply(&mut store, &played("X", "Y", Winner::A, Surface::Hard), &GateConfig::default())
            .unwrap();

        let v = build(&store, "X", "Y", Surface::Hard, DenominatorPolicy::Sentinel).unwrap();
        // +4 games over 2 sets on each side.
        assert_eq!(v.p1_avg, 2.0);
        assert_eq!(v.p2_avg, -2.0);
        assert_eq!(v.diff_avg, 4.0);
        assert_eq!(v.p1_wr, 1.0);
        assert_eq!(v.h2h, 1.0);
        assert_eq!(v.h2h_matches, 1);
        assert_eq!(v.p1_swr, 1.0);
        assert_eq!(v.p2_swr, 0.0);
    }

    #[test]
    fn surface_ratio_is_per_surface() {
        let mut store = StatStore::new();
        store.register(["X", "Y"]);
        update::apply(&mut store, &played("X", "Y", Winner::A, Surface::Clay), &GateConfig::default())
            .unwrap();

        let v = build(&store, "X", "Y", Surface::Hard, DenominatorPolicy::Sentinel).unwrap();
        assert!(v.p1_swr.is_nan());
        let v = build(&store, "X", "Y", Surface::Clay, DenominatorPolicy::Sentinel).unwrap();
        assert_eq!(v.p1_swr, 1.0);
    }

    #[test]
    fn reported_values_are_rounded_to_two_decimals() {
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert!(round2(f64::NAN).is_nan());
    }
}
