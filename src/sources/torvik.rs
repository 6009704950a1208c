use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::http_cache::fetch_text;
use crate::ratings::RatingRecord;
use crate::sources::{RatingsSource, find_column, normalize_header, parse_number};

const ENDPOINT_TEMPLATES: &[&str] = &[
    "https://barttorvik.com/{year}_team_results.csv",
    "https://barttorvik.com/{year}_fffinal.csv",
];

const TEAM_COLUMNS: &[&str] = &["team", "ncaa team", "name", "school"];
const OFFENSE_COLUMNS: &[&str] = &[
    "adjoe",
    "adjo",
    "adj off",
    "adj o",
    "adj offensive",
    "offensive efficiency",
    "off eff",
];
const DEFENSE_COLUMNS: &[&str] = &[
    "adjde",
    "adjd",
    "adj def",
    "adj d",
    "adj defensive",
    "defensive efficiency",
    "def eff",
];

/// College seasons are labeled by their spring year (2025-26 is 2026).
pub fn season_year_for_date(date: NaiveDate) -> i32 {
    if date.month() >= 7 {
        date.year() + 1
    } else {
        date.year()
    }
}

#[derive(Debug, Clone)]
pub struct TorvikRatings {
    season: i32,
    use_cache: bool,
}

impl TorvikRatings {
    pub fn for_date(date: NaiveDate, use_cache: bool) -> Self {
        Self {
            season: season_year_for_date(date),
            use_cache,
        }
    }

    pub fn endpoints(&self) -> Vec<String> {
        ENDPOINT_TEMPLATES
            .iter()
            .map(|tmpl| tmpl.replace("{year}", &self.season.to_string()))
            .collect()
    }
}

impl RatingsSource for TorvikRatings {
    fn name(&self) -> &str {
        "torvik"
    }

    fn fetch(&self) -> Result<Vec<RatingRecord>> {
        let mut last_err: Option<anyhow::Error> = None;
        for url in self.endpoints() {
            let attempt = fetch_text(&url, &[], self.use_cache).and_then(|body| parse_ratings_csv(&body));
            match attempt {
                Ok(rows) if !rows.is_empty() => return Ok(rows),
                Ok(_) => {
                    warn!(url = %url, "torvik endpoint returned no teams");
                    last_err = Some(anyhow::anyhow!("{url}: no teams"));
                }
                Err(err) => {
                    warn!(url = %url, error = %format!("{err:#}"), "torvik endpoint failed");
                    last_err = Some(err);
                }
            }
        }
        Err(anyhow::anyhow!(
            "could not load Torvik efficiencies for {}: {}",
            self.season,
            last_err.map(|e| format!("{e:#}")).unwrap_or_default()
        ))
    }
}

/// Parses a ratings CSV with loose header detection. Rows whose efficiencies
/// don't parse are dropped; a missing column is an error for the whole file.
pub fn parse_ratings_csv(text: &str) -> Result<Vec<RatingRecord>> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let raw_headers: Vec<String> = reader
        .headers()
        .context("ratings csv has no header row")?
        .iter()
        .map(str::to_string)
        .collect();
    let headers: Vec<String> = raw_headers.iter().map(|h| normalize_header(h)).collect();

    let team_idx = find_column(&headers, TEAM_COLUMNS).context("team column not found")?;
    let off_idx = find_column(&headers, OFFENSE_COLUMNS)
        .or_else(|| scan_prefix(&headers, "adjo", "adj o"))
        .context("adjusted offense column not found")?;
    let def_idx = find_column(&headers, DEFENSE_COLUMNS)
        .or_else(|| scan_prefix(&headers, "adjd", "adj d"))
        .context("adjusted defense column not found")?;

    let mut out = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let Ok(record) = record else {
            dropped += 1;
            continue;
        };
        let team = record.get(team_idx).unwrap_or("").trim();
        if team.is_empty() {
            dropped += 1;
            continue;
        }
        let offense = record.get(off_idx).and_then(parse_number);
        let defense = record.get(def_idx).and_then(parse_number);
        let (Some(adj_offense), Some(adj_defense)) = (offense, defense) else {
            dropped += 1;
            continue;
        };
        out.push(RatingRecord {
            team_name: team.to_string(),
            adj_offense,
            adj_defense,
        });
    }
    if dropped > 0 {
        debug!(dropped, "ratings rows skipped");
    }
    Ok(out)
}

fn scan_prefix(headers: &[String], prefix: &str, spaced: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.starts_with(prefix) || h.contains(spaced))
}
