//! Upstream feeds. Each implementation turns one provider's format into plain
//! [`RatingRecord`] / [`LineRecord`] rows; nothing downstream knows where a
//! row came from beyond its `source` label.

use anyhow::Result;
use tracing::{info, warn};

use crate::lines::LineRecord;
use crate::ratings::RatingRecord;

pub mod bovada;
pub mod espn;
pub mod file;
pub mod torvik;

pub trait RatingsSource {
    fn name(&self) -> &str;
    fn fetch(&self) -> Result<Vec<RatingRecord>>;
}

pub trait LineSource {
    fn name(&self) -> &str;
    fn fetch(&self) -> Result<Vec<LineRecord>>;
}

/// First source that yields any rows wins.
pub fn first_ratings(sources: &[Box<dyn RatingsSource>]) -> Result<Vec<RatingRecord>> {
    let mut failures: Vec<String> = Vec::new();
    for source in sources {
        match source.fetch() {
            Ok(rows) if !rows.is_empty() => {
                info!(source = source.name(), rows = rows.len(), "loaded ratings");
                return Ok(rows);
            }
            Ok(_) => {
                warn!(source = source.name(), "ratings source returned no rows");
                failures.push(format!("{}: no rows", source.name()));
            }
            Err(err) => {
                warn!(source = source.name(), error = %format!("{err:#}"), "ratings source failed");
                failures.push(format!("{}: {err:#}", source.name()));
            }
        }
    }
    Err(anyhow::anyhow!(
        "unable to load ratings ({})",
        if failures.is_empty() {
            "no sources configured".to_string()
        } else {
            failures.join("; ")
        }
    ))
}

/// Concatenates every source in order. Fails only when no source succeeded.
pub fn collect_lines(sources: &[Box<dyn LineSource>]) -> Result<Vec<LineRecord>> {
    let mut out = Vec::new();
    let mut any_ok = false;
    let mut failures: Vec<String> = Vec::new();
    for source in sources {
        match source.fetch() {
            Ok(rows) => {
                info!(source = source.name(), rows = rows.len(), "loaded lines");
                any_ok = true;
                out.extend(rows);
            }
            Err(err) => {
                warn!(source = source.name(), error = %format!("{err:#}"), "line source failed");
                failures.push(format!("{}: {err:#}", source.name()));
            }
        }
    }
    if !any_ok {
        return Err(anyhow::anyhow!(
            "no line source succeeded ({})",
            failures.join("; ")
        ));
    }
    Ok(out)
}

/// Lenient number parsing for scraped cells. Pick'em spellings are zero;
/// anything else non-numeric is absent.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if matches!(lower.as_str(), "pk" | "pick" | "pickem" | "pick'em" | "even" | "ev") {
        return Some(0.0);
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    unsigned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column-header normalization shared by the CSV parsers.
pub(crate) fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().trim_start_matches('\u{feff}').to_lowercase();
    lowered
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|cand| headers.iter().position(|h| h == cand))
}
