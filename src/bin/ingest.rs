use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use atp_edge::dataset;
use atp_edge::match_db::{self, ArchiveIngestSummary};

const DEFAULT_SEED: u64 = 42;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: ingest <data_dir> <first_year> <last_year> [db_path]");
    }

    let data_dir = PathBuf::from(&args[0]);
    let first_year: i32 = args[1].parse().context("first_year must be a number")?;
    let last_year: i32 = args[2].parse().context("last_year must be a number")?;
    if last_year < first_year {
        bail!("last_year {last_year} is before first_year {first_year}");
    }
    let db_path = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("matches.sqlite"));

    let seed = std::env::var("ATP_EDGE_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);

    let mut conn = match_db::open_db(&db_path)?;
    let mut summary = ArchiveIngestSummary {
        seasons: Vec::new(),
        rows_inserted: 0,
        rows_malformed: 0,
    };

    for year in first_year..=last_year {
        // Per-season seed keeps row orientation stable under re-ingest.
        let loaded = dataset::load_season_files(&data_dir, &[year], seed.wrapping_add(year as u64))?;
        if loaded.files_found.is_empty() {
            continue;
        }
        let (inserted, malformed) = match_db::replace_season(&mut conn, &year.to_string(), &loaded.rows)?;
        println!("season {year}: {inserted} matches, {malformed} malformed rows skipped");
        summary.seasons.push(year.to_string());
        summary.rows_inserted += inserted;
        summary.rows_malformed += malformed;
    }

    if summary.seasons.is_empty() {
        bail!("no season files found under {}", data_dir.display());
    }

    match_db::record_ingest_run(&conn, &summary)?;
    println!(
        "ingested {} seasons ({} matches) into {}",
        summary.seasons.len(),
        summary.rows_inserted,
        db_path.display()
    );
    Ok(())
}
