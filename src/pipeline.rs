use anyhow::Result;
use chrono::NaiveDate;

use crate::features::{self, DenominatorPolicy, FeatureVector};
use crate::record::{MalformedRow, MatchRecord, Surface};
use crate::update::{self, GateConfig};
use crate::store::StatStore;

/// One scored match: the features derived *before* its result was applied,
/// plus the label and pass-through market context for later calibration.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub features: FeatureVector,
    pub p1_pts: f64,
    pub p2_pts: f64,
    pub diff_pts: f64,
    pub surface: Surface,
    pub winner: u8,
    pub p1_odds: Option<f64>,
    pub p2_odds: Option<f64>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub rows: Vec<FeatureRow>,
    pub warmup_applied: usize,
    pub scored: usize,
    pub malformed_skipped: usize,
}

/// Registers every player appearing in the well-formed rows, so the sweep
/// starts from a store where all participants exist at zero.
pub fn register_participants(store: &mut StatStore, rows: &[Result<MatchRecord, MalformedRow>]) {
    for row in rows.iter().flatten() {
        store.register([row.player_a.as_str(), row.player_b.as_str()]);
    }
}

/// Drives the chronological sweep: matches `[0, split)` warm the store up
/// with no output, matches `[split, n)` are scored by building features
/// first and only then applying the result. A malformed row is skipped with
/// a warning but still occupies its sequence position.
pub fn run(
    store: &mut StatStore,
    rows: &[Result<MatchRecord, MalformedRow>],
    split: usize,
    gate: &GateConfig,
    policy: DenominatorPolicy,
) -> Result<RunReport> {
    let split = split.min(rows.len());
    let mut report = RunReport::default();

    for (idx, row) in rows.iter().enumerate() {
        let rec = match row {
            Ok(rec) => rec,
            Err(bad) => {
                eprintln!("[WARN] skipping malformed {bad}");
                report.malformed_skipped += 1;
                continue;
            }
        };

        if idx >= split {
            let features = features::build(store, &rec.player_a, &rec.player_b, rec.surface, policy)?;
            report.rows.push(FeatureRow {
                date: rec.date,
                features,
                p1_pts: rec.pts_a,
                p2_pts: rec.pts_b,
                diff_pts: round2(rec.pts_a - rec.pts_b),
                surface: rec.surface,
                winner: rec.winner.label(),
                p1_odds: rec.odds_a,
                p2_odds: rec.odds_b,
            });
            report.scored += 1;
        } else {
            report.warmup_applied += 1;
        }

        update::apply(store, rec, gate)?;
    }

    Ok(report)
}

fn round2(x: f64) -> f64 {
    if x.is_finite() { (x * 100.0).round() / 100.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Winner;

    fn rec(a: &str, b: &str, winner: Winner) -> Result<MatchRecord, MalformedRow> {
        Ok(MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            surface: Surface::Hard,
            player_a: a.to_string(),
            player_b: b.to_string(),
            pts_a: 1000.0,
            pts_b: 950.0,
            sets_a: [6, 6, 0, 0, 0],
            sets_b: [4, 4, 0, 0, 0],
            winner,
            odds_a: Some(1.5),
            odds_b: Some(2.6),
        })
    }

    #[test]
    fn warmup_emits_no_rows() {
        let rows = vec![rec("A", "B", Winner::A), rec("A", "B", Winner::A)];
        let mut store = StatStore::new();
        register_participants(&mut store, &rows);

        let report = run(
            &mut store,
            &rows,
            rows.len(),
            &GateConfig::default(),
            DenominatorPolicy::Sentinel,
        )
        .unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.warmup_applied, 2);
        // Updates still happened.
        assert_eq!(store.aggregate_of("A").unwrap().matches_played_total, 2);
    }

    #[test]
    fn malformed_row_consumes_its_position() {
        let rows = vec![
            rec("A", "B", Winner::A),
            Err(MalformedRow {
                line: 2,
                reason: "missing surface".to_string(),
            }),
            rec("A", "B", Winner::B),
        ];
        let mut store = StatStore::new();
        register_participants(&mut store, &rows);

        // Split after the malformed row: only the third match is scored.
        let report = run(
            &mut store,
            &rows,
            2,
            &GateConfig::default(),
            DenominatorPolicy::Sentinel,
        )
        .unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.malformed_skipped, 1);
        assert_eq!(report.warmup_applied, 1);
        // The skipped row advanced nothing: only the first match fed state.
        assert_eq!(report.rows[0].features.p1_matches, 1);
    }

    #[test]
    fn split_beyond_input_is_all_warmup() {
        let rows = vec![rec("A", "B", Winner::A)];
        let mut store = StatStore::new();
        register_participants(&mut store, &rows);
        let report = run(
            &mut store,
            &rows,
            10,
            &GateConfig::default(),
            DenominatorPolicy::Sentinel,
        )
        .unwrap();
        assert!(report.rows.is_empty());
    }
}
