use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use atp_edge::features::DenominatorPolicy;
use atp_edge::model::{self, LogisticModel, WinProb};
use atp_edge::store::StatStore;
use atp_edge::update::GateConfig;
use atp_edge::{match_db, pipeline};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: backtest <db_path> <split_index> <model_json>");
    }

    let db_path = PathBuf::from(&args[0]);
    let split: usize = args[1].parse().context("split_index must be a number")?;
    let model = LogisticModel::load(&PathBuf::from(&args[2]))?;

    let conn = match_db::open_db(&db_path)?;
    let matches = match_db::load_all(&conn)?;
    if split >= matches.len() {
        bail!("split index {split} leaves nothing to score");
    }
    let rows: Vec<_> = matches.into_iter().map(Ok).collect();

    let mut store = StatStore::new();
    pipeline::register_participants(&mut store, &rows);
    let report = pipeline::run(
        &mut store,
        &rows,
        split,
        &GateConfig::default(),
        DenominatorPolicy::Sentinel,
    )?;

    let predictions: Vec<WinProb> = report.rows.iter().map(|r| model.predict_row(r)).collect();
    let winners: Vec<u8> = report.rows.iter().map(|r| r.winner).collect();
    let metrics = model::evaluate(&predictions, &winners);

    println!("model over {} scored matches:", metrics.samples);
    println!("  brier    {:.4}", metrics.brier);
    println!("  log loss {:.4}", metrics.log_loss);
    println!("  accuracy {:.1}%", metrics.accuracy * 100.0);

    // Market baseline from the bundled closing odds, where both are present.
    let mut market_preds = Vec::new();
    let mut market_winners = Vec::new();
    for row in &report.rows {
        let (Some(o1), Some(o2)) = (row.p1_odds, row.p2_odds) else {
            continue;
        };
        if o1 <= 1.0 || o2 <= 1.0 {
            continue;
        }
        let (q1, q2) = (1.0 / o1, 1.0 / o2);
        let sum = q1 + q2;
        market_preds.push(WinProb {
            p1: q1 / sum,
            p2: q2 / sum,
        });
        market_winners.push(row.winner);
    }
    if !market_preds.is_empty() {
        let market = model::evaluate(&market_preds, &market_winners);
        println!("market baseline over {} matches:", market.samples);
        println!("  brier    {:.4}", market.brier);
        println!("  log loss {:.4}", market.log_loss);
        println!("  accuracy {:.1}%", market.accuracy * 100.0);
    }

    Ok(())
}
