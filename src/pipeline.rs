use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::info;

use crate::canon::Canonicalizer;
use crate::config::ModelConfig;
use crate::join::{Resolution, SideMatch, join_lines};
use crate::lines::{LineRecord, MarketLineTable};
use crate::model::{MatchedGame, evaluate, rank};
use crate::ratings::{RatingRecord, RatingsTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatchNote {
    pub raw: String,
    pub key: String,
    pub score: f64,
}

/// Run summary written next to the edge tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub ratings_rows: usize,
    pub ratings_dropped: usize,
    pub ratings_duplicates: usize,
    pub line_rows: usize,
    pub duplicate_lines: usize,
    pub joined_rows: usize,
    pub lined_games: usize,
    pub modeled_games: usize,
    pub recommendations: usize,
    pub likely_non_board: usize,
    pub fuzzy_matches: Vec<FuzzyMatchNote>,
    pub unresolved_teams: Vec<String>,
    pub home_court_points: f64,
    pub edge_threshold: f64,
    pub fuzzy_cutoff: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeReport {
    pub games: Vec<MatchedGame>,
    pub diagnostics: Diagnostics,
}

/// Ratings and lines in, ranked edges out. No I/O.
pub fn run_pipeline(
    ratings: &[RatingRecord],
    lines: &[LineRecord],
    canon: &Canonicalizer,
    cfg: &ModelConfig,
) -> EdgeReport {
    let table = RatingsTable::from_records(ratings, canon);
    let market = MarketLineTable::from_records(lines, canon);
    let joined = join_lines(market.lines(), &table, canon, cfg.fuzzy_cutoff());

    let mut fuzzy_matches = Vec::new();
    let mut fuzzy_seen: HashSet<String> = HashSet::new();
    let mut unresolved: BTreeSet<String> = BTreeSet::new();
    let mut likely_non_board = 0usize;

    for matchup in &joined.matchups {
        if matchup.line.likely_non_board {
            likely_non_board += 1;
        }
        for side in [&matchup.home, &matchup.away] {
            note_side(side, &mut fuzzy_matches, &mut fuzzy_seen, &mut unresolved);
        }
    }

    let mut games: Vec<MatchedGame> = joined
        .matchups
        .iter()
        .map(|m| evaluate(m, cfg))
        .collect();
    rank(&mut games);

    let diagnostics = Diagnostics {
        ratings_rows: ratings.len(),
        ratings_dropped: table.dropped(),
        ratings_duplicates: table.duplicates(),
        line_rows: lines.len(),
        duplicate_lines: joined.duplicates,
        joined_rows: games.len(),
        lined_games: games.iter().filter(|g| g.has_line()).count(),
        modeled_games: games.iter().filter(|g| g.model_home_margin.is_some()).count(),
        recommendations: games.iter().filter(|g| g.is_pick()).count(),
        likely_non_board,
        fuzzy_matches,
        unresolved_teams: unresolved.into_iter().collect(),
        home_court_points: cfg.home_court_points(),
        edge_threshold: cfg.edge_threshold(),
        fuzzy_cutoff: cfg.fuzzy_cutoff(),
    };

    info!(
        ratings = table.len(),
        lines = lines.len(),
        games = diagnostics.joined_rows,
        lined = diagnostics.lined_games,
        modeled = diagnostics.modeled_games,
        picks = diagnostics.recommendations,
        unresolved = diagnostics.unresolved_teams.len(),
        "edge pipeline complete"
    );

    EdgeReport { games, diagnostics }
}

fn note_side(
    side: &SideMatch,
    fuzzy_matches: &mut Vec<FuzzyMatchNote>,
    fuzzy_seen: &mut HashSet<String>,
    unresolved: &mut BTreeSet<String>,
) {
    match &side.resolution {
        Resolution::Exact => {}
        Resolution::Fuzzy { key, score } => {
            if fuzzy_seen.insert(side.raw.clone()) {
                fuzzy_matches.push(FuzzyMatchNote {
                    raw: side.raw.clone(),
                    key: key.clone(),
                    score: *score,
                });
            }
        }
        Resolution::Unresolved => {
            unresolved.insert(side.raw.clone());
        }
    }
}
