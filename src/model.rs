use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::join::Matchup;
use crate::ratings::TeamRating;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Home,
    Away,
    Pass,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Home => "HOME",
            Recommendation::Away => "AWAY",
            Recommendation::Pass => "PASS",
        }
    }
}

/// One output row. Every numeric field is optional so a missing rating or
/// line stays visibly absent instead of becoming zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedGame {
    #[serde(rename = "home")]
    pub home_team: String,
    #[serde(rename = "away")]
    pub away_team: String,
    pub home_spread: Option<f64>,
    pub h_adj_offense: Option<f64>,
    pub h_adj_defense: Option<f64>,
    pub a_adj_offense: Option<f64>,
    pub a_adj_defense: Option<f64>,
    pub model_home_margin: Option<f64>,
    pub market_home_margin: Option<f64>,
    pub edge_pts: Option<f64>,
    pub recommendation: Recommendation,
    pub ticket: String,
}

impl MatchedGame {
    pub fn has_line(&self) -> bool {
        self.market_home_margin.is_some()
    }

    pub fn is_pick(&self) -> bool {
        self.recommendation != Recommendation::Pass
    }
}

/// Net-efficiency differential plus the home-court bump.
pub fn model_home_margin(home: &TeamRating, away: &TeamRating, home_court_points: f64) -> f64 {
    (home.adj_offense - away.adj_defense) - (away.adj_offense - home.adj_defense)
        + home_court_points
}

/// Both boundaries are inclusive: an edge of exactly the threshold bets.
pub fn recommend(edge_pts: Option<f64>, edge_threshold: f64) -> Recommendation {
    match edge_pts {
        Some(edge) if edge >= edge_threshold => Recommendation::Home,
        Some(edge) if edge <= -edge_threshold => Recommendation::Away,
        _ => Recommendation::Pass,
    }
}

pub fn ticket(
    recommendation: Recommendation,
    home_team: &str,
    away_team: &str,
    home_spread: Option<f64>,
) -> String {
    let Some(spread) = home_spread else {
        return String::new();
    };
    match recommendation {
        Recommendation::Home => format!("{home_team} {}", signed_points(spread)),
        Recommendation::Away => format!("{away_team} {}", signed_points(-spread)),
        Recommendation::Pass => String::new(),
    }
}

/// `+5.0` / `-3.5`; zero always prints as `+0.0`.
pub fn signed_points(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:+.1}")
}

pub fn evaluate(matchup: &Matchup, cfg: &ModelConfig) -> MatchedGame {
    let line = &matchup.line;
    let home = matchup.home.rating.as_ref();
    let away = matchup.away.rating.as_ref();

    let model = match (home, away) {
        (Some(h), Some(a)) => Some(model_home_margin(h, a, cfg.home_court_points())),
        _ => None,
    };
    let edge = match (model, line.market_home_margin) {
        (Some(m), Some(market)) => Some(m - market),
        _ => None,
    };
    let recommendation = recommend(edge, cfg.edge_threshold());

    MatchedGame {
        home_team: line.home_team.clone(),
        away_team: line.away_team.clone(),
        home_spread: line.home_spread,
        h_adj_offense: home.map(|r| r.adj_offense),
        h_adj_defense: home.map(|r| r.adj_defense),
        a_adj_offense: away.map(|r| r.adj_offense),
        a_adj_defense: away.map(|r| r.adj_defense),
        model_home_margin: model,
        market_home_margin: line.market_home_margin,
        edge_pts: edge,
        recommendation,
        ticket: ticket(recommendation, &line.home_team, &line.away_team, line.home_spread),
    }
}

/// Lined games first, then edge descending with missing edges last. Stable.
pub fn rank(games: &mut [MatchedGame]) {
    games.sort_by(|a, b| {
        b.has_line()
            .cmp(&a.has_line())
            .then_with(|| edge_desc(a.edge_pts, b.edge_pts))
    });
}

fn edge_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
