use std::collections::HashMap;

use tracing::debug;

use crate::canon::Canonicalizer;
use crate::lines::MarketLine;
use crate::ratings::{RatingsTable, TeamRating};

/// How one side of a matchup was tied to the ratings table.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Exact,
    Fuzzy { key: String, score: f64 },
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SideMatch {
    pub raw: String,
    pub key: String,
    pub resolution: Resolution,
    pub rating: Option<TeamRating>,
}

impl SideMatch {
    pub fn is_resolved(&self) -> bool {
        self.rating.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Matchup {
    pub pair_key: String,
    pub line: MarketLine,
    pub home: SideMatch,
    pub away: SideMatch,
}

#[derive(Debug, Clone, Default)]
pub struct JoinOutcome {
    pub matchups: Vec<Matchup>,
    /// Lines collapsed into an earlier row with the same pair key.
    pub duplicates: usize,
}

/// Collapses lines that describe the same game. The survivor is the first
/// row carrying a market margin, else the earliest row, and it keeps the
/// position where the game first appeared.
pub fn dedupe_lines(lines: &[MarketLine], canon: &Canonicalizer) -> (Vec<(String, MarketLine)>, usize) {
    let mut out: Vec<(String, MarketLine)> = Vec::with_capacity(lines.len());
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    let mut duplicates = 0usize;

    for line in lines {
        let key = canon.pair_key(&line.home_team, &line.away_team);
        // Canonical keys never contain the separator, so an edge separator
        // means one side has no key and the game can't be identified.
        if key.starts_with('|') || key.ends_with('|') {
            out.push((key, line.clone()));
            continue;
        }
        match slot_by_key.get(&key) {
            Some(&slot) => {
                duplicates += 1;
                if !out[slot].1.has_line() && line.has_line() {
                    out[slot].1 = line.clone();
                }
            }
            None => {
                slot_by_key.insert(key.clone(), out.len());
                out.push((key, line.clone()));
            }
        }
    }

    (out, duplicates)
}

/// Outer join of market lines against ratings: every deduplicated line
/// yields exactly one matchup, resolved or not.
pub fn join_lines(
    lines: &[MarketLine],
    ratings: &RatingsTable,
    canon: &Canonicalizer,
    fuzzy_cutoff: f64,
) -> JoinOutcome {
    let (deduped, duplicates) = dedupe_lines(lines, canon);
    let mut memo: HashMap<String, (Resolution, Option<TeamRating>)> = HashMap::new();

    let matchups = deduped
        .into_iter()
        .map(|(pair_key, line)| {
            let home = resolve_side(&line.home_team, ratings, canon, fuzzy_cutoff, &mut memo);
            let away = resolve_side(&line.away_team, ratings, canon, fuzzy_cutoff, &mut memo);
            Matchup {
                pair_key,
                line,
                home,
                away,
            }
        })
        .collect();

    JoinOutcome {
        matchups,
        duplicates,
    }
}

fn resolve_side(
    raw: &str,
    ratings: &RatingsTable,
    canon: &Canonicalizer,
    fuzzy_cutoff: f64,
    memo: &mut HashMap<String, (Resolution, Option<TeamRating>)>,
) -> SideMatch {
    let key = canon.canonicalize(raw);
    let (resolution, rating) = memo
        .entry(key.clone())
        .or_insert_with(|| lookup_key(&key, ratings, canon, fuzzy_cutoff))
        .clone();
    SideMatch {
        raw: raw.to_string(),
        key,
        resolution,
        rating,
    }
}

fn lookup_key(
    key: &str,
    ratings: &RatingsTable,
    canon: &Canonicalizer,
    fuzzy_cutoff: f64,
) -> (Resolution, Option<TeamRating>) {
    if key.is_empty() {
        return (Resolution::Unresolved, None);
    }
    if let Some(rating) = ratings.get(key) {
        return (Resolution::Exact, Some(rating.clone()));
    }

    let Some(hit) = canon.best_key_match(key, ratings.keys(), fuzzy_cutoff) else {
        debug!(key, "no rating for team");
        return (Resolution::Unresolved, None);
    };
    let matched = &ratings.keys()[hit.index];
    debug!(key, matched = %matched, score = hit.score, "fuzzy rating match");
    (
        Resolution::Fuzzy {
            key: matched.clone(),
            score: hit.score,
        },
        ratings.get(matched).cloned(),
    )
}

#[cfg(test)]
mod tests {
    use super::{Resolution, dedupe_lines, join_lines};
    use crate::canon::{AliasTable, Canonicalizer};
    use crate::lines::MarketLine;
    use crate::ratings::{RatingRecord, RatingsTable};

    fn canon() -> Canonicalizer {
        Canonicalizer::new(
            AliasTable::new([("north carolina", "unc")]).expect("valid aliases"),
        )
    }

    fn ratings(canon: &Canonicalizer) -> RatingsTable {
        RatingsTable::from_records(
            &[
                RatingRecord {
                    team_name: "Duke".to_string(),
                    adj_offense: 120.0,
                    adj_defense: 95.0,
                },
                RatingRecord {
                    team_name: "UNC".to_string(),
                    adj_offense: 115.0,
                    adj_defense: 98.0,
                },
                RatingRecord {
                    team_name: "Connecticut".to_string(),
                    adj_offense: 121.0,
                    adj_defense: 91.0,
                },
            ],
            canon,
        )
    }

    #[test]
    fn lines_without_a_usable_name_are_never_merged() {
        let canon = canon();
        let lines = vec![
            MarketLine::new("???", "!!!", Some(-3.0)),
            MarketLine::new("***", "###", Some(-7.0)),
            MarketLine::new("Duke", "", None),
            MarketLine::new("Duke", "...", Some(-1.0)),
        ];
        let (kept, duplicates) = dedupe_lines(&lines, &canon);
        assert_eq!(kept.len(), 4);
        assert_eq!(duplicates, 0);
        assert_eq!(kept[1].1.home_spread, Some(-7.0));
    }

    #[test]
    fn dedupe_prefers_lined_row_in_first_position() {
        let canon = canon();
        let lines = vec![
            MarketLine::new("Duke", "UNC", None),
            MarketLine::new("Kansas", "Baylor", Some(-1.5)),
            MarketLine::new("North Carolina", "Duke", Some(3.0)),
            MarketLine::new("Duke", "UNC", Some(-2.5)),
        ];
        let (rows, duplicates) = dedupe_lines(&lines, &canon);
        assert_eq!(duplicates, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "duke|unc");
        assert_eq!(rows[0].1.home_team, "North Carolina");
        assert_eq!(rows[0].1.home_spread, Some(3.0));
        assert_eq!(rows[1].1.home_team, "Kansas");
    }

    #[test]
    fn dedupe_keeps_earliest_when_none_lined() {
        let canon = canon();
        let lines = vec![
            MarketLine::new("Duke", "UNC", None),
            MarketLine::new("Duke", "North Carolina", None),
        ];
        let (rows, duplicates) = dedupe_lines(&lines, &canon);
        assert_eq!(duplicates, 1);
        assert_eq!(rows[0].1.away_team, "UNC");
    }

    #[test]
    fn join_resolves_exact_alias_and_fuzzy() {
        let canon = canon();
        let ratings = ratings(&canon);
        let lines = vec![
            MarketLine::new("Duke", "North Carolina", Some(-5.0)),
            MarketLine::new("Connecticutt", "Duke", Some(1.0)),
        ];
        let outcome = join_lines(&lines, &ratings, &canon, 85.0);
        assert_eq!(outcome.matchups.len(), 2);

        let first = &outcome.matchups[0];
        assert_eq!(first.home.resolution, Resolution::Exact);
        assert_eq!(first.away.resolution, Resolution::Exact);
        assert_eq!(first.away.rating.as_ref().map(|r| r.adj_offense), Some(115.0));

        let second = &outcome.matchups[1];
        match &second.home.resolution {
            Resolution::Fuzzy { key, score } => {
                assert_eq!(key, "connecticut");
                assert!(*score >= 85.0);
            }
            other => panic!("expected fuzzy match, got {other:?}"),
        }
        assert!(second.home.is_resolved());
    }

    #[test]
    fn unmatched_side_keeps_row() {
        let canon = canon();
        let ratings = ratings(&canon);
        let lines = vec![MarketLine::new("Duke", "Catawba", None)];
        let outcome = join_lines(&lines, &ratings, &canon, 85.0);
        assert_eq!(outcome.matchups.len(), 1);
        let row = &outcome.matchups[0];
        assert!(row.home.is_resolved());
        assert_eq!(row.away.resolution, Resolution::Unresolved);
        assert!(row.away.rating.is_none());
    }

    #[test]
    fn cutoff_of_one_hundred_disables_fuzzy_hits() {
        let canon = canon();
        let ratings = ratings(&canon);
        let lines = vec![MarketLine::new("Connecticutt", "Duke", Some(1.0))];
        let outcome = join_lines(&lines, &ratings, &canon, 100.0);
        assert_eq!(outcome.matchups[0].home.resolution, Resolution::Unresolved);
    }
}
