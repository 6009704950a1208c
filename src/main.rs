use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use ncaab_edges::canon::Canonicalizer;
use ncaab_edges::config::{LineProvider, RunConfig, parse_run_date};
use ncaab_edges::logging::init_logging;
use ncaab_edges::pipeline::run_pipeline;
use ncaab_edges::report::{write_all, write_index_html};
use ncaab_edges::sources::bovada::BovadaLines;
use ncaab_edges::sources::espn::EspnLines;
use ncaab_edges::sources::file::{CsvLinesFile, CsvRatingsFile};
use ncaab_edges::sources::torvik::TorvikRatings;
use ncaab_edges::sources::{LineSource, RatingsSource, collect_lines, first_ratings};

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let mut cfg = match RunConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(arg) = std::env::args().nth(1) {
        let Some(date) = parse_run_date(&arg) else {
            eprintln!("error: expected a date as YYYY-MM-DD, got {arg:?}");
            return ExitCode::FAILURE;
        };
        cfg.run_date = date;
    }

    if let Err(err) = init_logging(&cfg.output_dir) {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }

    match run(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "build failed");
            if let Err(err) = write_index_html(&cfg.output_dir, &[], None, Utc::now()) {
                error!(error = %format!("{err:#}"), "could not write fallback index");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: &RunConfig) -> Result<()> {
    info!(
        date = %cfg.run_date,
        output = %cfg.output_dir.display(),
        home_court = cfg.model.home_court_points(),
        threshold = cfg.model.edge_threshold(),
        "building edges"
    );

    let lines = collect_lines(&line_sources(cfg))?;
    if lines.is_empty() {
        warn!("no lines for this slate, writing index only");
        return write_index_html(&cfg.output_dir, &[], None, Utc::now());
    }

    let ratings = first_ratings(&ratings_sources(cfg))?;
    let canon = Canonicalizer::default();
    let report = run_pipeline(&ratings, &lines, &canon, &cfg.model);

    for game in report.games.iter().filter(|g| g.is_pick()).take(10) {
        info!(
            ticket = %game.ticket,
            edge = game.edge_pts.unwrap_or_default(),
            "{} vs {}",
            game.home_team,
            game.away_team
        );
    }

    write_all(&cfg.output_dir, &report, Utc::now())
}

fn ratings_sources(cfg: &RunConfig) -> Vec<Box<dyn RatingsSource>> {
    if let Some(path) = cfg.ratings_file.as_ref() {
        return vec![Box::new(CsvRatingsFile::new(path))];
    }
    let mut sources: Vec<Box<dyn RatingsSource>> =
        vec![Box::new(TorvikRatings::for_date(cfg.run_date, cfg.http_cache))];
    match cfg.ratings_backup.as_ref() {
        Some(path) if path.exists() => sources.push(Box::new(CsvRatingsFile::new(path))),
        Some(path) => warn!(path = %path.display(), "ratings backup not found"),
        None => {}
    }
    sources
}

fn line_sources(cfg: &RunConfig) -> Vec<Box<dyn LineSource>> {
    if let Some(path) = cfg.lines_file.as_ref() {
        return vec![Box::new(CsvLinesFile::new(path))];
    }
    cfg.line_providers
        .iter()
        .map(|provider| -> Box<dyn LineSource> {
            match provider {
                LineProvider::Espn => Box::new(EspnLines::new(cfg.run_date, cfg.http_cache)),
                LineProvider::Bovada => Box::new(BovadaLines::new(cfg.http_cache)),
            }
        })
        .collect()
}
