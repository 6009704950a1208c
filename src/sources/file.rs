//! Local CSV inputs: the ratings backup and offline line sheets.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use csv::ReaderBuilder;

use crate::lines::LineRecord;
use crate::ratings::RatingRecord;
use crate::sources::torvik::parse_ratings_csv;
use crate::sources::{LineSource, RatingsSource, find_column, normalize_header, parse_number};

const HOME_COLUMNS: &[&str] = &["home", "home team"];
const AWAY_COLUMNS: &[&str] = &["away", "away team"];
const SPREAD_COLUMNS: &[&str] = &["home spread", "spread", "line"];
const SOURCE_COLUMNS: &[&str] = &["source"];

#[derive(Debug, Clone)]
pub struct CsvRatingsFile {
    path: PathBuf,
}

impl CsvRatingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RatingsSource for CsvRatingsFile {
    fn name(&self) -> &str {
        "ratings file"
    }

    fn fetch(&self) -> Result<Vec<RatingRecord>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        parse_ratings_csv(&text).with_context(|| format!("failed parsing {}", self.path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct CsvLinesFile {
    path: PathBuf,
}

impl CsvLinesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LineSource for CsvLinesFile {
    fn name(&self) -> &str {
        "lines file"
    }

    fn fetch(&self) -> Result<Vec<LineRecord>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        parse_lines_csv(&text, "file").with_context(|| format!("failed parsing {}", self.path.display()))
    }
}

/// Rows need both team names; a blank or unparsable spread makes the row
/// unlined rather than dropping it. A `source` column overrides `default_source`.
pub fn parse_lines_csv(text: &str, default_source: &str) -> Result<Vec<LineRecord>> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("lines csv has no header row")?
        .iter()
        .map(normalize_header)
        .collect();

    let home_idx = find_column(&headers, HOME_COLUMNS).context("home column not found")?;
    let away_idx = find_column(&headers, AWAY_COLUMNS).context("away column not found")?;
    let spread_idx = find_column(&headers, SPREAD_COLUMNS);
    let source_idx = find_column(&headers, SOURCE_COLUMNS);

    let mut out = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };
        let home = record.get(home_idx).unwrap_or("");
        let away = record.get(away_idx).unwrap_or("");
        if home.is_empty() || away.is_empty() {
            continue;
        }
        let source = source_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .unwrap_or(default_source);
        out.push(LineRecord {
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_spread: spread_idx.and_then(|i| record.get(i)).and_then(parse_number),
            source: source.to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::parse_lines_csv;

    #[test]
    fn parses_lines_with_blank_spreads() {
        let csv = "home,away,home_spread\nDuke,UNC,-5.5\nDavidson,Catawba,\nKansas,Baylor,pk\n";
        let rows = parse_lines_csv(csv, "file").expect("valid csv");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].home_spread, Some(-5.5));
        assert_eq!(rows[1].home_spread, None);
        assert_eq!(rows[2].home_spread, Some(0.0));
        assert!(rows.iter().all(|r| r.source == "file"));
    }

    #[test]
    fn source_column_overrides_default() {
        let csv = "Home Team,Away Team,Spread,Source\nIowa,Drake,+2,espn\nUtah,BYU,1,\n";
        let rows = parse_lines_csv(csv, "file").expect("valid csv");
        assert_eq!(rows[0].source, "espn");
        assert_eq!(rows[0].home_spread, Some(2.0));
        assert_eq!(rows[1].source, "file");
    }

    #[test]
    fn skips_rows_missing_a_team() {
        let csv = "home,away,home_spread\n,UNC,-1\nDuke,,2\n";
        assert!(parse_lines_csv(csv, "file").expect("valid csv").is_empty());
    }

    #[test]
    fn missing_team_columns_is_an_error() {
        assert!(parse_lines_csv("team,spread\nDuke,-1\n", "file").is_err());
    }
}
