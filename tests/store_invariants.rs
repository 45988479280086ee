use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use atp_edge::features::{self, DenominatorPolicy};
use atp_edge::record::{MatchRecord, Surface, Winner};
use atp_edge::store::StatStore;
use atp_edge::update::{self, GateConfig};

fn rec(a: &str, b: &str, winner: Winner, surface: Surface) -> MatchRecord {
    MatchRecord {
        date: NaiveDate::from_ymd_opt(2023, 9, 4).unwrap(),
        surface,
        player_a: a.to_string(),
        player_b: b.to_string(),
        pts_a: 2000.0,
        pts_b: 1900.0,
        sets_a: [6, 3, 7, 0, 0],
        sets_b: [4, 6, 5, 0, 0],
        winner,
        odds_a: None,
        odds_b: None,
    }
}

#[test]
fn pair_records_stay_symmetric_under_random_sequences() {
    let names = ["A", "B", "C", "D"];
    let mut store = StatStore::new();
    store.register(names);

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let i = rng.gen_range(0..names.len());
        let mut j = rng.gen_range(0..names.len());
        while j == i {
            j = rng.gen_range(0..names.len());
        }
        let winner = if rng.gen_bool(0.5) { Winner::A } else { Winner::B };
        let surface = match rng.gen_range(0..3) {
            0 => Surface::Hard,
            1 => Surface::Clay,
            _ => Surface::Grass,
        };
        update::apply(
            &mut store,
            &rec(names[i], names[j], winner, surface),
            &GateConfig::default(),
        )
        .unwrap();
    }

    for a in names {
        for b in names {
            if a == b {
                continue;
            }
            let fwd = store.pair_of(a, b).unwrap();
            let rev = store.pair_of(b, a).unwrap();
            assert_eq!(fwd.matches, rev.matches);
            assert_eq!(fwd.outcomes.len(), rev.outcomes.len());
            for (f, r) in fwd.outcomes.iter().zip(&rev.outcomes) {
                assert_eq!(f + r, 1, "pair ({a}, {b}) lost complementarity");
            }
        }
    }
}

#[test]
fn ratios_never_average_more_than_ten_entries() {
    let mut store = StatStore::new();
    store.register(["Grinder", "Wall"]);

    // 10,000 losses, then 10 wins: with an unbounded window the ratio would
    // be vanishingly small.
    for _ in 0..10_000 {
        update::apply(
            &mut store,
            &rec("Grinder", "Wall", Winner::B, Surface::Hard),
            &GateConfig::default(),
        )
        .unwrap();
    }
    for _ in 0..10 {
        update::apply(
            &mut store,
            &rec("Grinder", "Wall", Winner::A, Surface::Hard),
            &GateConfig::default(),
        )
        .unwrap();
    }

    let v = features::build(&store, "Grinder", "Wall", Surface::Hard, DenominatorPolicy::Sentinel)
        .unwrap();
    assert_eq!(v.p1_wr, 1.0);
    assert_eq!(v.h2h, 1.0);
    assert_eq!(v.h2h_matches, 10);
    // Storage is append-only; only the read is windowed.
    assert_eq!(
        store.aggregate_of("Grinder").unwrap().recent_outcomes.len(),
        10_010
    );
}

#[test]
fn totals_balance_across_all_players() {
    let names = ["A", "B", "C"];
    let mut store = StatStore::new();
    store.register(names);

    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let i = rng.gen_range(0..names.len());
        let mut j = rng.gen_range(0..names.len());
        while j == i {
            j = rng.gen_range(0..names.len());
        }
        let winner = if rng.gen_bool(0.5) { Winner::A } else { Winner::B };
        update::apply(
            &mut store,
            &rec(names[i], names[j], winner, Surface::Clay),
            &GateConfig::default(),
        )
        .unwrap();
    }

    // Every match credits and debits the same games, so the system sums
    // to zero.
    let total: i64 = names
        .iter()
        .map(|n| store.aggregate_of(n).unwrap().points_diff_total)
        .sum();
    assert_eq!(total, 0);
}
