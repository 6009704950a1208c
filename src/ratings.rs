use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canon::Canonicalizer;

/// One row as delivered by a ratings source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub team_name: String,
    pub adj_offense: f64,
    pub adj_defense: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRating {
    pub team_name: String,
    pub canonical_key: String,
    pub adj_offense: f64,
    pub adj_defense: f64,
}

impl TeamRating {
    pub fn net_efficiency(&self) -> f64 {
        self.adj_offense - self.adj_defense
    }
}

/// Ratings snapshot keyed by canonical team key.
#[derive(Debug, Clone, Default)]
pub struct RatingsTable {
    by_key: HashMap<String, TeamRating>,
    // Load order; fuzzy matching walks this so results don't depend on hashing.
    keys: Vec<String>,
    dropped: usize,
    duplicates: usize,
}

impl RatingsTable {
    pub fn from_records(records: &[RatingRecord], canon: &Canonicalizer) -> Self {
        let mut table = Self::default();
        for record in records {
            if !record.adj_offense.is_finite() || !record.adj_defense.is_finite() {
                debug!(team = %record.team_name, "dropping rating with non-numeric efficiency");
                table.dropped += 1;
                continue;
            }
            let key = canon.canonicalize(&record.team_name);
            if key.is_empty() {
                table.dropped += 1;
                continue;
            }
            if table.by_key.contains_key(&key) {
                debug!(team = %record.team_name, key = %key, "duplicate rating key, keeping first");
                table.duplicates += 1;
                continue;
            }
            table.keys.push(key.clone());
            table.by_key.insert(
                key.clone(),
                TeamRating {
                    team_name: record.team_name.trim().to_string(),
                    canonical_key: key,
                    adj_offense: record.adj_offense,
                    adj_defense: record.adj_defense,
                },
            );
        }
        table
    }

    pub fn get(&self, key: &str) -> Option<&TeamRating> {
        self.by_key.get(key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Records rejected for non-finite values or an empty key.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::{RatingRecord, RatingsTable};
    use crate::canon::Canonicalizer;

    fn record(name: &str, off: f64, def: f64) -> RatingRecord {
        RatingRecord {
            team_name: name.to_string(),
            adj_offense: off,
            adj_defense: def,
        }
    }

    #[test]
    fn builds_table_keyed_by_canonical_name() {
        let canon = Canonicalizer::default();
        let table = RatingsTable::from_records(
            &[record("Duke", 120.0, 95.0), record("St. John's", 112.0, 96.5)],
            &canon,
        );
        assert_eq!(table.len(), 2);
        let johns = table.get("saint johns").expect("aliased key");
        assert_eq!(johns.team_name, "St. John's");
        assert!((johns.net_efficiency() - 15.5).abs() < 1e-9);
        assert_eq!(table.keys(), ["duke".to_string(), "saint johns".to_string()]);
    }

    #[test]
    fn drops_non_finite_and_nameless_rows() {
        let canon = Canonicalizer::default();
        let table = RatingsTable::from_records(
            &[
                record("Duke", f64::NAN, 95.0),
                record("UNC", 115.0, f64::INFINITY),
                record("  ", 100.0, 100.0),
                record("Kansas", 118.0, 92.0),
            ],
            &canon,
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.dropped(), 3);
        assert!(table.get("duke").is_none());
    }

    #[test]
    fn first_duplicate_wins() {
        let canon = Canonicalizer::default();
        let table = RatingsTable::from_records(
            &[record("St. John's", 110.0, 95.0), record("St Johns", 99.0, 99.0)],
            &canon,
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.duplicates(), 1);
        assert_eq!(table.get("saint johns").map(|r| r.adj_offense), Some(110.0));
    }
}
