use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use atp_edge::features::DenominatorPolicy;
use atp_edge::store::StatStore;
use atp_edge::update::GateConfig;
use atp_edge::{dataset, match_db, pipeline, snapshot};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        bail!("usage: preprocess <db_path> <split_index> <training_csv> <snapshot_json>");
    }

    let db_path = PathBuf::from(&args[0]);
    let split: usize = args[1].parse().context("split_index must be a number")?;
    let training_out = PathBuf::from(&args[2]);
    let snapshot_out = PathBuf::from(&args[3]);

    let gate = GateConfig {
        max_points_gap: std::env::var("ATP_EDGE_POINTS_GAP")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(GateConfig::default().max_points_gap),
    };

    let conn = match_db::open_db(&db_path)?;
    let matches = match_db::load_all(&conn)?;
    if matches.is_empty() {
        bail!("archive {} holds no matches; run ingest first", db_path.display());
    }
    if split >= matches.len() {
        bail!(
            "split index {split} leaves nothing to score ({} matches archived)",
            matches.len()
        );
    }

    let rows: Vec<_> = matches.into_iter().map(Ok).collect();

    let mut store = StatStore::new();
    pipeline::register_participants(&mut store, &rows);
    println!("{} players registered, {} matches loaded", store.player_count(), rows.len());

    let report = pipeline::run(&mut store, &rows, split, &gate, DenominatorPolicy::Sentinel)?;
    println!(
        "warm-up {} matches, scored {} matches",
        report.warmup_applied, report.scored
    );

    let written = dataset::write_training_csv(&report.rows, &training_out)?;
    println!("wrote {written} training rows to {}", training_out.display());

    snapshot::save(&store, &snapshot_out)?;
    println!("snapshot saved to {}", snapshot_out.display());
    Ok(())
}
