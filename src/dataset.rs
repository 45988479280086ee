use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Deserialize;

use crate::pipeline::FeatureRow;
use crate::record::{MalformedRow, MatchRecord, SET_SLOTS, Surface, Winner};

pub const TRAINING_HEADERS: [&str; 22] = [
    "P1", "P2", "DIFF_Pts", "P1_Avg", "P2_Avg", "DIFF_Avg", "P1_Matches", "P2_Matches", "P1_Wr",
    "P2_Wr", "DIFF_Wr", "P1P2_H2H", "H2H_Matches", "P1_SWr", "P2_SWr", "DIFF_SWr", "P1_SGames",
    "P2_SGames", "Surface", "Winner", "P1_Odds", "P2_Odds",
];

/// One line of a raw season file, winner-first as published. Everything is
/// optional here; validation decides what is malformed.
#[derive(Debug, Deserialize)]
struct RawSeasonRow {
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Surface", default)]
    surface: Option<String>,
    #[serde(rename = "Winner", default)]
    winner: Option<String>,
    #[serde(rename = "Loser", default)]
    loser: Option<String>,
    #[serde(rename = "WPts", default)]
    w_pts: Option<f64>,
    #[serde(rename = "LPts", default)]
    l_pts: Option<f64>,
    #[serde(rename = "W1", default)]
    w1: Option<u16>,
    #[serde(rename = "L1", default)]
    l1: Option<u16>,
    #[serde(rename = "W2", default)]
    w2: Option<u16>,
    #[serde(rename = "L2", default)]
    l2: Option<u16>,
    #[serde(rename = "W3", default)]
    w3: Option<u16>,
    #[serde(rename = "L3", default)]
    l3: Option<u16>,
    #[serde(rename = "W4", default)]
    w4: Option<u16>,
    #[serde(rename = "L4", default)]
    l4: Option<u16>,
    #[serde(rename = "W5", default)]
    w5: Option<u16>,
    #[serde(rename = "L5", default)]
    l5: Option<u16>,
    #[serde(rename = "AvgW", default)]
    avg_w: Option<f64>,
    #[serde(rename = "AvgL", default)]
    avg_l: Option<f64>,
}

#[derive(Debug, Default)]
pub struct LoadSummary {
    pub files_found: Vec<PathBuf>,
    pub files_missing: Vec<PathBuf>,
    pub rows: Vec<Result<MatchRecord, MalformedRow>>,
}

impl LoadSummary {
    pub fn well_formed(&self) -> usize {
        self.rows.iter().filter(|r| r.is_ok()).count()
    }
}

/// Reads `<dir>/<year>.csv` for each year, in order. Missing files are
/// skipped with a warning, like the original yearly spreadsheets. Rows keep
/// their sequence positions; unparseable ones come back as `MalformedRow`.
///
/// Raw files list the winner's columns first, so the orientation of every
/// record is flipped with probability 1/2 (seeded for reproducibility) —
/// otherwise the column order itself would leak the label.
pub fn load_season_files(dir: &Path, years: &[i32], seed: u64) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();
    let mut rng = StdRng::seed_from_u64(seed);

    for year in years {
        let path = dir.join(format!("{year}.csv"));
        if !path.exists() {
            eprintln!("[WARN] file {} not found, skipping", path.display());
            summary.files_missing.push(path);
            continue;
        }
        read_season_file(&path, &mut rng, &mut summary.rows)
            .with_context(|| format!("read season file {}", path.display()))?;
        summary.files_found.push(path);
    }

    Ok(summary)
}

fn read_season_file(
    path: &Path,
    rng: &mut StdRng,
    out: &mut Vec<Result<MatchRecord, MalformedRow>>,
) -> Result<()> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for (idx, row) in rdr.deserialize::<RawSeasonRow>().enumerate() {
        let line = idx + 2; // header occupies line 1
        out.push(match row {
            Ok(raw) => validate_row(raw, &name, line, rng.r#gen()),
            Err(err) => Err(MalformedRow {
                line,
                reason: format!("{name}: {err}"),
            }),
        });
    }
    Ok(())
}

fn validate_row(
    raw: RawSeasonRow,
    file: &str,
    line: usize,
    flip: bool,
) -> Result<MatchRecord, MalformedRow> {
    let bad = |reason: String| MalformedRow {
        line,
        reason: format!("{file}: {reason}"),
    };

    let date = raw
        .date
        .as_deref()
        .ok_or_else(|| bad("missing date".to_string()))
        .and_then(|d| parse_date(d).ok_or_else(|| bad(format!("bad date {d:?}"))))?;
    let surface: Surface = raw
        .surface
        .as_deref()
        .ok_or_else(|| bad("missing surface".to_string()))?
        .parse()
        .map_err(|e: String| bad(e))?;
    let winner_name = non_empty(raw.winner).ok_or_else(|| bad("missing winner name".to_string()))?;
    let loser_name = non_empty(raw.loser).ok_or_else(|| bad("missing loser name".to_string()))?;
    if winner_name == loser_name {
        return Err(bad(format!("player listed on both sides: {winner_name:?}")));
    }
    let w_pts = raw.w_pts.ok_or_else(|| bad("missing WPts".to_string()))?;
    let l_pts = raw.l_pts.ok_or_else(|| bad("missing LPts".to_string()))?;

    let mut winner_sets = [0u16; SET_SLOTS];
    let mut loser_sets = [0u16; SET_SLOTS];
    let w = [raw.w1, raw.w2, raw.w3, raw.w4, raw.w5];
    let l = [raw.l1, raw.l2, raw.l3, raw.l4, raw.l5];
    for i in 0..SET_SLOTS {
        winner_sets[i] = w[i].unwrap_or(0);
        loser_sets[i] = l[i].unwrap_or(0);
    }

    Ok(if flip {
        MatchRecord {
            date,
            surface,
            player_a: loser_name,
            player_b: winner_name,
            pts_a: l_pts,
            pts_b: w_pts,
            sets_a: loser_sets,
            sets_b: winner_sets,
            winner: Winner::B,
            odds_a: raw.avg_l,
            odds_b: raw.avg_w,
        }
    } else {
        MatchRecord {
            date,
            surface,
            player_a: winner_name,
            player_b: loser_name,
            pts_a: w_pts,
            pts_b: l_pts,
            sets_a: winner_sets,
            sets_b: loser_sets,
            winner: Winner::A,
            odds_a: raw.avg_w,
            odds_b: raw.avg_l,
        }
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

fn non_empty(v: Option<String>) -> Option<String> {
    let v = v?;
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Writes the scored rows as the training table. Row formatting is
/// independent per row, so it runs on the rayon pool; the write itself is
/// sequential and ordered.
pub fn write_training_csv(rows: &[FeatureRow], path: &Path) -> Result<usize> {
    let formatted: Vec<Vec<String>> = rows.par_iter().map(format_training_row).collect();

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("create training table {}", path.display()))?;
    wtr.write_record(TRAINING_HEADERS)
        .context("write training header")?;
    for record in &formatted {
        wtr.write_record(record).context("write training row")?;
    }
    wtr.flush().context("flush training table")?;
    Ok(formatted.len())
}

fn format_training_row(row: &FeatureRow) -> Vec<String> {
    let f = &row.features;
    vec![
        f.p1.clone(),
        f.p2.clone(),
        fmt_num(row.diff_pts),
        fmt_num(f.p1_avg),
        fmt_num(f.p2_avg),
        fmt_num(f.diff_avg),
        f.p1_matches.to_string(),
        f.p2_matches.to_string(),
        fmt_num(f.p1_wr),
        fmt_num(f.p2_wr),
        fmt_num(f.diff_wr),
        fmt_num(f.h2h),
        f.h2h_matches.to_string(),
        fmt_num(f.p1_swr),
        fmt_num(f.p2_swr),
        fmt_num(f.diff_swr),
        f.p1_surface_games.to_string(),
        f.p2_surface_games.to_string(),
        row.surface.as_str().to_string(),
        row.winner.to_string(),
        row.p1_odds.map(fmt_num).unwrap_or_default(),
        row.p2_odds.map(fmt_num).unwrap_or_default(),
    ]
}

/// NaN sentinels become empty cells so downstream tooling sees "missing",
/// never a fabricated number.
fn fmt_num(x: f64) -> String {
    if x.is_nan() { String::new() } else { format!("{x}") }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str, surface: &str, winner: &str, loser: &str) -> RawSeasonRow {
        RawSeasonRow {
            date: Some(date.to_string()),
            surface: Some(surface.to_string()),
            winner: Some(winner.to_string()),
            loser: Some(loser.to_string()),
            w_pts: Some(2000.0),
            l_pts: Some(1800.0),
            w1: Some(6),
            l1: Some(4),
            w2: Some(6),
            l2: Some(3),
            w3: None,
            l3: None,
            w4: None,
            l4: None,
            w5: None,
            l5: None,
            avg_w: Some(1.45),
            avg_l: Some(2.75),
        }
    }

    #[test]
    fn unflipped_row_keeps_winner_first() {
        let rec = validate_row(raw("2024-01-15", "Hard", "W", "L"), "t.csv", 2, false).unwrap();
        assert_eq!(rec.player_a, "W");
        assert_eq!(rec.winner, Winner::A);
        assert_eq!(rec.sets_a, [6, 6, 0, 0, 0]);
        assert_eq!(rec.odds_a, Some(1.45));
    }

    #[test]
    fn flipped_row_swaps_everything_consistently() {
        let rec = validate_row(raw("2024-01-15", "Hard", "W", "L"), "t.csv", 2, true).unwrap();
        assert_eq!(rec.player_a, "L");
        assert_eq!(rec.player_b, "W");
        assert_eq!(rec.winner, Winner::B);
        assert_eq!(rec.sets_b, [6, 6, 0, 0, 0]);
        assert_eq!(rec.pts_a, 1800.0);
        assert_eq!(rec.odds_b, Some(1.45));
        // The result itself is unchanged either way.
        assert_eq!(rec.points_diff_a(), -5);
    }

    #[test]
    fn missing_fields_are_malformed_not_fatal() {
        let mut r = raw("2024-01-15", "Hard", "W", "L");
        r.w_pts = None;
        assert!(validate_row(r, "t.csv", 3, false).is_err());

        let mut r = raw("2024-01-15", "Hard", "W", "L");
        r.surface = Some("Carpet".to_string());
        assert!(validate_row(r, "t.csv", 4, false).is_err());

        let r = raw("not a date", "Hard", "W", "L");
        assert!(validate_row(r, "t.csv", 5, false).is_err());
    }

    #[test]
    fn both_date_formats_parse() {
        assert!(parse_date("2023-10-02").is_some());
        assert!(parse_date("02/10/2023").is_some());
        assert!(parse_date("October 2nd").is_none());
    }

    #[test]
    fn nan_formats_as_empty_cell() {
        assert_eq!(fmt_num(f64::NAN), "");
        assert_eq!(fmt_num(0.33), "0.33");
    }
}
