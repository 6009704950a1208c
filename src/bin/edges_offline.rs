use std::path::PathBuf;

use anyhow::Context;
use ncaab_edges::canon::Canonicalizer;
use ncaab_edges::config::ModelConfig;
use ncaab_edges::model::signed_points;
use ncaab_edges::pipeline::run_pipeline;
use ncaab_edges::sources::file::{CsvLinesFile, CsvRatingsFile};
use ncaab_edges::sources::{LineSource, RatingsSource};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let ratings_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/torvik_team_results.csv"));
    let lines_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/lines.csv"));

    let cfg = ModelConfig::from_lookup(&|key: &str| std::env::var(key).ok())
        .context("invalid model settings")?;
    let ratings = CsvRatingsFile::new(&ratings_path).fetch()?;
    let lines = CsvLinesFile::new(&lines_path).fetch()?;

    // No network and no artifacts: load two files, print the ranked slate.
    let report = run_pipeline(&ratings, &lines, &Canonicalizer::default(), &cfg);

    let cell = |v: Option<f64>| v.map(signed_points).unwrap_or_else(|| "-".to_string());
    println!(
        "{:<24} {:<24} {:>7} {:>7} {:>7} {:>7}  {}",
        "home", "away", "spread", "model", "market", "edge", "pick"
    );
    for game in &report.games {
        println!(
            "{:<24} {:<24} {:>7} {:>7} {:>7} {:>7}  {}",
            game.home_team,
            game.away_team,
            cell(game.home_spread),
            cell(game.model_home_margin),
            cell(game.market_home_margin),
            cell(game.edge_pts),
            if game.is_pick() { game.ticket.as_str() } else { "PASS" },
        );
    }

    let diag = &report.diagnostics;
    println!();
    println!("Lined games: {}", diag.lined_games);
    println!("Modeled: {}", diag.modeled_games);
    println!("Picks: {}", diag.recommendations);
    if !diag.unresolved_teams.is_empty() {
        println!("Unresolved: {}", diag.unresolved_teams.join(", "));
    }

    Ok(())
}
