use serde::{Deserialize, Serialize};

use crate::canon::Canonicalizer;

/// Name fragments of programs outside Division I that show up on scoreboards
/// but never on the betting board.
pub const DEFAULT_NON_DI_KEYWORDS: &[&str] = &[
    "catawba",
    "suny delhi",
    "oakwood",
    "wilson college",
    "pensacola christian",
    "bethesda",
    "southwestern adventist",
    "southwestern christian",
    "lincoln university",
    "iu columbus",
    "cleary",
    "new mexico highlands",
    "coastal georgia",
];

/// One row as delivered by a line source. `home_spread` follows the
/// negative-means-home-favored convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_spread: Option<f64>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketLine {
    pub home_team: String,
    pub away_team: String,
    pub home_spread: Option<f64>,
    /// Home team's expected margin of victory: always `-home_spread`.
    pub market_home_margin: Option<f64>,
    pub likely_non_board: bool,
    pub source: String,
}

impl MarketLine {
    pub fn new(home_team: &str, away_team: &str, home_spread: Option<f64>) -> Self {
        let home_spread = home_spread.filter(|s| s.is_finite());
        Self {
            home_team: home_team.trim().to_string(),
            away_team: away_team.trim().to_string(),
            home_spread,
            market_home_margin: home_spread.map(|s| -s),
            likely_non_board: false,
            source: String::new(),
        }
    }

    pub fn has_line(&self) -> bool {
        self.market_home_margin.is_some()
    }
}

/// Market lines for one run, in source order.
#[derive(Debug, Clone, Default)]
pub struct MarketLineTable {
    lines: Vec<MarketLine>,
}

impl MarketLineTable {
    pub fn from_records(records: &[LineRecord], canon: &Canonicalizer) -> Self {
        Self::with_non_board_keywords(records, canon, DEFAULT_NON_DI_KEYWORDS)
    }

    pub fn with_non_board_keywords(
        records: &[LineRecord],
        canon: &Canonicalizer,
        keywords: &[&str],
    ) -> Self {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| canon.canonicalize(k))
            .filter(|k| !k.is_empty())
            .collect();

        let lines = records
            .iter()
            .map(|record| {
                let mut line = MarketLine::new(&record.home_team, &record.away_team, record.home_spread);
                line.source = record.source.clone();
                line.likely_non_board = [&record.home_team, &record.away_team].iter().any(|name| {
                    let key = canon.canonicalize(name);
                    keywords.iter().any(|k| key.contains(k.as_str()))
                });
                line
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[MarketLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
