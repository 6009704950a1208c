//! Team-name canonicalization shared by every join in the pipeline.
//!
//! A canonical key is only ever used for matching; display always uses the
//! raw name the feed supplied.

use std::collections::HashMap;

use deunicode::deunicode_char;
use strsim::normalized_levenshtein;

use crate::config::ConfigError;

const PAIR_SEPARATOR: &str = "|";

/// Known synonyms between the ratings feed and the line feeds. Both sides are
/// normalized when the table is built, so punctuation here is irrelevant.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("uc santa barbara", "cal santa barbara"),
    ("uc riverside", "cal riverside"),
    ("st. john's", "saint johns"),
    ("st johns", "saint johns"),
    ("saint john's", "saint johns"),
    ("saint joseph's", "saint josephs"),
    ("st. joseph's", "saint josephs"),
    ("saint francis (pa)", "saint francis"),
    ("st. francis (pa)", "saint francis"),
    ("cal state northridge", "cal st. northridge"),
    ("csu northridge", "cal st. northridge"),
    ("central connecticut state", "central connecticut"),
    ("texas a&m-corpus christi", "texas a&m corpus chris"),
    ("texas a&m corpus christi", "texas a&m corpus chris"),
    ("miami (fl)", "miami fl"),
    ("miami (oh)", "miami oh"),
    ("uconn", "connecticut"),
    ("ole miss", "mississippi"),
    ("umass", "massachusetts"),
    ("uab", "alabama birmingham"),
    ("usc", "southern california"),
];

/// Immutable alias lookup applied as the last canonicalization step.
///
/// Chains (`a -> b`, `b -> c`) are resolved to their terminal value on
/// construction so a canonical key is never itself an alias source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    pub fn new<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw: HashMap<String, String> = HashMap::new();
        for (from, to) in pairs {
            let from = normalize(from.as_ref());
            let to = normalize(to.as_ref());
            if from.is_empty() || from == to {
                continue;
            }
            raw.insert(from, to);
        }

        let mut map = HashMap::with_capacity(raw.len());
        for (from, first) in &raw {
            let mut target = first;
            let mut hops = 0usize;
            while let Some(next) = raw.get(target) {
                hops += 1;
                if hops > raw.len() {
                    return Err(ConfigError::AliasCycle(from.clone()));
                }
                target = next;
            }
            map.insert(from.clone(), target.clone());
        }
        Ok(Self { map })
    }

    pub fn defaults() -> Self {
        // The default pairs are acyclic; covered by `default_aliases_are_acyclic`.
        Self::new(DEFAULT_ALIASES.iter().copied()).unwrap_or_default()
    }

    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Best fuzzy candidate found by [`Canonicalizer::best_key_match`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyHit {
    pub index: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct Canonicalizer {
    aliases: AliasTable,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(AliasTable::defaults())
    }
}

impl Canonicalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn canonicalize(&self, raw: &str) -> String {
        let key = normalize(raw);
        match self.aliases.resolve(&key) {
            Some(alias) => alias.to_string(),
            None => key,
        }
    }

    /// Order-independent matchup identifier.
    pub fn pair_key(&self, home: &str, away: &str) -> String {
        let a = self.canonicalize(home);
        let b = self.canonicalize(away);
        if a <= b {
            format!("{a}{PAIR_SEPARATOR}{b}")
        } else {
            format!("{b}{PAIR_SEPARATOR}{a}")
        }
    }

    /// Returns the candidate most similar to `raw`, if it scores at least
    /// `cutoff` on a 0-100 scale. Ties keep the earliest candidate.
    pub fn fuzzy_match<'a, S: AsRef<str>>(
        &self,
        raw: &str,
        candidates: &'a [S],
        cutoff: f64,
    ) -> Option<&'a str> {
        let key = self.canonicalize(raw);
        let keys: Vec<String> = candidates
            .iter()
            .map(|c| self.canonicalize(c.as_ref()))
            .collect();
        let hit = self.best_key_match(&key, &keys, cutoff)?;
        Some(candidates[hit.index].as_ref())
    }

    /// Same as [`fuzzy_match`](Self::fuzzy_match) but over keys that are
    /// already canonical, which is what the joiner holds.
    pub fn best_key_match<S: AsRef<str>>(
        &self,
        key: &str,
        keys: &[S],
        cutoff: f64,
    ) -> Option<FuzzyHit> {
        if key.is_empty() {
            return None;
        }
        let mut best: Option<FuzzyHit> = None;
        for (index, candidate) in keys.iter().enumerate() {
            let candidate = candidate.as_ref();
            if candidate.is_empty() {
                continue;
            }
            let score = similarity(key, candidate);
            if score < cutoff {
                continue;
            }
            if best.is_some_and(|b| score <= b.score) {
                continue;
            }
            best = Some(FuzzyHit { index, score });
        }
        best
    }
}

/// Token-sort similarity on a 0-100 scale. Empty input never scores.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = token_sort(a);
    let b = token_sort(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&a, &b) * 100.0
}

fn token_sort(raw: &str) -> String {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Every canonicalization step except alias substitution.
fn normalize(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if is_dash_variant(ch) {
            folded.push('-');
        } else if ch.is_ascii() {
            folded.push(ch.to_ascii_lowercase());
        } else {
            match deunicode_char(ch) {
                Some(ascii) => folded.extend(ascii.chars().map(|c| c.to_ascii_lowercase())),
                None => folded.push(' '),
            }
        }
    }

    let expanded = folded.replace('&', "and");
    let stripped: String = expanded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_dash_variant(ch: char) -> bool {
    matches!(
        ch,
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2212}'
    )
}
