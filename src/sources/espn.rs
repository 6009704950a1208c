use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::http_cache::fetch_text;
use crate::lines::LineRecord;
use crate::sources::{LineSource, parse_number};

const SCOREBOARD_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/basketball/mens-college-basketball/scoreboard";
const SOURCE: &str = "espn";

#[derive(Debug, Clone)]
pub struct EspnLines {
    date: NaiveDate,
    use_cache: bool,
}

impl EspnLines {
    pub fn new(date: NaiveDate, use_cache: bool) -> Self {
        Self { date, use_cache }
    }

    pub fn url(&self) -> String {
        // groups=50 is all of Division I; limit keeps ESPN from paging.
        format!(
            "{SCOREBOARD_URL}?dates={}&groups=50&limit=400",
            self.date.format("%Y%m%d")
        )
    }
}

impl LineSource for EspnLines {
    fn name(&self) -> &str {
        SOURCE
    }

    fn fetch(&self) -> Result<Vec<LineRecord>> {
        let body = fetch_text(&self.url(), &[], self.use_cache)?;
        parse_espn_scoreboard(&body)
    }
}

pub fn parse_espn_scoreboard(raw: &str) -> Result<Vec<LineRecord>> {
    let root: Value = serde_json::from_str(raw).context("invalid espn scoreboard json")?;
    let events = root
        .get("events")
        .and_then(Value::as_array)
        .context("espn scoreboard has no events array")?;

    let mut out = Vec::with_capacity(events.len());
    for event in events {
        let Some(comp) = event
            .get("competitions")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
        else {
            continue;
        };
        let Some(competitors) = comp.get("competitors").and_then(Value::as_array) else {
            continue;
        };
        if competitors.len() != 2 {
            continue;
        }
        let home = competitors
            .iter()
            .find(|c| side(c) == Some("home"))
            .unwrap_or(&competitors[0]);
        let away = competitors
            .iter()
            .find(|c| side(c) == Some("away"))
            .unwrap_or(&competitors[1]);
        if std::ptr::eq(home, away) {
            debug!("espn competition without distinct home and away sides");
            continue;
        }
        let (Some(home_team), Some(away_team)) = (team_name(home), team_name(away)) else {
            continue;
        };

        let home_spread = comp
            .get("odds")
            .and_then(Value::as_array)
            .and_then(|o| o.first())
            .and_then(|odds| home_spread(odds, abbreviation(home), abbreviation(away)));
        if home_spread.is_none() {
            debug!(home = %home_team, away = %away_team, "espn game without spread");
        }

        out.push(LineRecord {
            home_team,
            away_team,
            home_spread,
            source: SOURCE.to_string(),
        });
    }
    Ok(out)
}

fn side(competitor: &Value) -> Option<&str> {
    competitor.get("homeAway").and_then(Value::as_str)
}

fn team_name(competitor: &Value) -> Option<String> {
    let team = competitor.get("team")?;
    ["location", "name", "displayName"]
        .iter()
        .filter_map(|k| team.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn abbreviation(competitor: &Value) -> Option<&str> {
    competitor
        .get("team")
        .and_then(|t| t.get("abbreviation"))
        .and_then(Value::as_str)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn favorite_flag(odds: &Value, key: &str) -> bool {
    odds.get(key)
        .and_then(|o| o.get("favorite"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Home-relative spread from one ESPN odds block. Favorite flags win, then the
/// `"ABBR -5.5"` details string, then the raw `spread` field.
fn home_spread(odds: &Value, home_abbr: Option<&str>, away_abbr: Option<&str>) -> Option<f64> {
    let details = odds.get("details").and_then(Value::as_str).unwrap_or("").trim();
    if matches!(details.to_ascii_lowercase().as_str(), "even" | "pk" | "pick" | "pick'em") {
        return Some(0.0);
    }
    let (detail_abbr, detail_points) = split_details(details);
    let spread = odds
        .get("spread")
        .and_then(number)
        .or(detail_points);

    if favorite_flag(odds, "homeTeamOdds") {
        return spread.map(|s| -s.abs());
    }
    if favorite_flag(odds, "awayTeamOdds") {
        return spread.map(|s| s.abs());
    }

    if let (Some(abbr), Some(points)) = (detail_abbr, detail_points) {
        let same = |other: Option<&str>| other.is_some_and(|o| o.eq_ignore_ascii_case(abbr));
        if same(home_abbr) {
            return Some(-points.abs());
        }
        if same(away_abbr) {
            return Some(points.abs());
        }
    }
    spread
}

fn split_details(details: &str) -> (Option<&str>, Option<f64>) {
    let Some((abbr, points)) = details.rsplit_once(' ') else {
        return (None, None);
    };
    let abbr = abbr.trim();
    (
        (!abbr.is_empty()).then_some(abbr),
        parse_number(points),
    )
}
