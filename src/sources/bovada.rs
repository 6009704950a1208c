use anyhow::{Context, Result};
use serde_json::Value;

use crate::http_cache::fetch_text;
use crate::lines::LineRecord;
use crate::sources::{LineSource, parse_number};

const COUPON_URL: &str = "https://www.bovada.lv/services/sports/event/coupon/events/A/description/basketball/ncaa-basketball?marketFilterId=def&eventsLimit=10000";
const SOURCE: &str = "bovada";

#[derive(Debug, Clone, Default)]
pub struct BovadaLines {
    use_cache: bool,
}

impl BovadaLines {
    pub fn new(use_cache: bool) -> Self {
        Self { use_cache }
    }
}

impl LineSource for BovadaLines {
    fn name(&self) -> &str {
        SOURCE
    }

    fn fetch(&self) -> Result<Vec<LineRecord>> {
        let body = fetch_text(COUPON_URL, &[("Accept", "application/json")], self.use_cache)?;
        parse_bovada_coupon(&body)
    }
}

/// The coupon is an array of path groups, each carrying its own `events`.
pub fn parse_bovada_coupon(raw: &str) -> Result<Vec<LineRecord>> {
    let root: Value = serde_json::from_str(raw).context("invalid bovada coupon json")?;
    let groups = root.as_array().context("bovada coupon is not an array")?;

    let mut out = Vec::new();
    for event in groups
        .iter()
        .filter_map(|g| g.get("events").and_then(Value::as_array))
        .flatten()
    {
        let Some(competitors) = event.get("competitors").and_then(Value::as_array) else {
            continue;
        };
        let home = competitors.iter().find(|c| is_home(c) == Some(true));
        let away = competitors.iter().find(|c| is_home(c) == Some(false));
        let (Some(home_team), Some(away_team)) = (home.and_then(name), away.and_then(name)) else {
            continue;
        };
        out.push(LineRecord {
            home_team,
            away_team,
            home_spread: point_spread(event),
            source: SOURCE.to_string(),
        });
    }
    Ok(out)
}

fn is_home(competitor: &Value) -> Option<bool> {
    competitor.get("home").and_then(Value::as_bool)
}

fn name(competitor: &Value) -> Option<String> {
    competitor
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn point_spread(event: &Value) -> Option<f64> {
    let market = event
        .get("displayGroups")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|g| g.get("markets").and_then(Value::as_array))
        .flatten()
        .find(|m| {
            let is_spread = m
                .get("description")
                .and_then(Value::as_str)
                .is_some_and(|d| d.contains("Point Spread"));
            let full_game = m
                .get("period")
                .and_then(|p| p.get("main"))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            is_spread && full_game
        })?;
    let outcome = market
        .get("outcomes")
        .and_then(Value::as_array)?
        .iter()
        .find(|o| o.get("type").and_then(Value::as_str) == Some("H"))?;
    match outcome.get("price")?.get("handicap")? {
        Value::String(s) => parse_number(s),
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_bovada_coupon;

    fn event(home: &str, away: &str, markets: serde_json::Value) -> serde_json::Value {
        json!({
            "description": format!("{away} @ {home}"),
            "competitors": [
                {"name": away, "home": false},
                {"name": home, "home": true}
            ],
            "displayGroups": [{"markets": markets}]
        })
    }

    #[test]
    fn reads_home_handicap_from_game_spread() {
        let markets = json!([
            {"description": "Moneyline", "outcomes": []},
            {
                "description": "Point Spread - 1st Half",
                "period": {"main": false},
                "outcomes": [{"type": "H", "price": {"handicap": "-2.0"}}]
            },
            {
                "description": "Point Spread",
                "period": {"main": true},
                "outcomes": [
                    {"type": "A", "price": {"handicap": "+6.5"}},
                    {"type": "H", "price": {"handicap": "-6.5"}}
                ]
            }
        ]);
        let raw = json!([{"path": [], "events": [event("Kansas", "Baylor", markets)]}]).to_string();
        let rows = parse_bovada_coupon(&raw).expect("valid coupon");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_team, "Kansas");
        assert_eq!(rows[0].away_team, "Baylor");
        assert_eq!(rows[0].home_spread, Some(-6.5));
        assert_eq!(rows[0].source, "bovada");
    }

    #[test]
    fn events_without_spread_are_unlined() {
        let raw = json!([
            {"events": [event("Iowa", "Drake", json!([]))]},
            {"events": [event("Utah", "BYU", json!([
                {"description": "Point Spread", "outcomes": [{"type": "H", "price": {"handicap": "PK"}}]}
            ]))]}
        ])
        .to_string();
        let rows = parse_bovada_coupon(&raw).expect("valid coupon");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].home_spread, None);
        assert_eq!(rows[1].home_spread, Some(0.0));
    }

    #[test]
    fn object_payload_is_an_error() {
        assert!(parse_bovada_coupon("{\"events\": []}").is_err());
    }
}
