use std::path::PathBuf;

use anyhow::{Result, bail};

use atp_edge::features::{self, DenominatorPolicy};
use atp_edge::model::{self, LogisticModel};
use atp_edge::record::Surface;
use atp_edge::snapshot;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 5 {
        bail!("usage: predict <snapshot_json> <model_json> <player1> <player2> <surface>");
    }

    let snapshot_path = PathBuf::from(&args[0]);
    let model_path = PathBuf::from(&args[1]);
    let p1 = &args[2];
    let p2 = &args[3];
    let surface: Surface = match args[4].parse() {
        Ok(s) => s,
        Err(e) => bail!("{e} (expected Hard, Clay or Grass)"),
    };

    // Legacy inference parity: treat zero denominators as 1 instead of
    // propagating the missing-value sentinel.
    let policy = if std::env::var("ATP_EDGE_NEUTRAL_DENOM").is_ok() {
        DenominatorPolicy::NeutralOne
    } else {
        DenominatorPolicy::Sentinel
    };

    let store = snapshot::load(&snapshot_path)?;
    let model = LogisticModel::load(&model_path)?;

    let vector = features::build(&store, p1, p2, surface, policy)?;
    // The match-level points differential is unknown ahead of time; the
    // model imputes it at its training mean.
    let win = model.predict(|name| vector.value(name));

    println!("{p1} vs {p2} on {surface}:");
    print_side(p1, win.p1);
    print_side(p2, win.p2);
    Ok(())
}

fn print_side(name: &str, prob: f64) {
    match model::decimal_odds(prob) {
        Some(odds) => println!("  {name}: {:.1}% (decimal odds {odds:.2})", prob * 100.0),
        None => println!("  {name}: 0.0% (odds unbounded)"),
    }
}
