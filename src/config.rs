use std::env;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use thiserror::Error;

pub const DEFAULT_HOME_COURT_POINTS: f64 = 0.6;
pub const DEFAULT_EDGE_THRESHOLD: f64 = 2.0;
pub const DEFAULT_FUZZY_CUTOFF: f64 = 85.0;

const DEFAULT_OUTPUT_DIR: &str = "site";
const DEFAULT_RATINGS_BACKUP: &str = "data/torvik_backup.csv";

/// Problems that invalidate the whole run rather than a single row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("edge threshold must be a finite value >= 0, got {0}")]
    InvalidEdgeThreshold(f64),
    #[error("fuzzy cutoff must be within [0, 100], got {0}")]
    InvalidCutoff(f64),
    #[error("home court points must be finite, got {0}")]
    InvalidHomeCourt(f64),
    #[error("alias table contains a cycle through {0:?}")]
    AliasCycle(String),
    #[error("{key}={value:?} is not a valid {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Validated model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    home_court_points: f64,
    edge_threshold: f64,
    fuzzy_cutoff: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            home_court_points: DEFAULT_HOME_COURT_POINTS,
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            fuzzy_cutoff: DEFAULT_FUZZY_CUTOFF,
        }
    }
}

impl ModelConfig {
    pub fn new(
        home_court_points: f64,
        edge_threshold: f64,
        fuzzy_cutoff: f64,
    ) -> Result<Self, ConfigError> {
        if !home_court_points.is_finite() {
            return Err(ConfigError::InvalidHomeCourt(home_court_points));
        }
        if !edge_threshold.is_finite() || edge_threshold < 0.0 {
            return Err(ConfigError::InvalidEdgeThreshold(edge_threshold));
        }
        if !(0.0..=100.0).contains(&fuzzy_cutoff) {
            return Err(ConfigError::InvalidCutoff(fuzzy_cutoff));
        }
        Ok(Self {
            home_court_points,
            edge_threshold,
            fuzzy_cutoff,
        })
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let home_court_points =
            env_f64(lookup, "HOME_COURT_POINTS")?.unwrap_or(DEFAULT_HOME_COURT_POINTS);
        let edge_threshold = env_f64(lookup, "EDGE_THRESHOLD")?.unwrap_or(DEFAULT_EDGE_THRESHOLD);
        let fuzzy_cutoff = env_f64(lookup, "FUZZY_CUTOFF")?.unwrap_or(DEFAULT_FUZZY_CUTOFF);
        Self::new(home_court_points, edge_threshold, fuzzy_cutoff)
    }

    pub fn home_court_points(&self) -> f64 {
        self.home_court_points
    }

    pub fn edge_threshold(&self) -> f64 {
        self.edge_threshold
    }

    pub fn fuzzy_cutoff(&self) -> f64 {
        self.fuzzy_cutoff
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineProvider {
    Espn,
    Bovada,
}

impl LineProvider {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "espn" => Some(Self::Espn),
            "bovada" => Some(Self::Bovada),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: ModelConfig,
    pub output_dir: PathBuf,
    pub run_date: NaiveDate,
    pub ratings_backup: Option<PathBuf>,
    pub ratings_file: Option<PathBuf>,
    pub lines_file: Option<PathBuf>,
    pub line_providers: Vec<LineProvider>,
    pub http_cache: bool,
}

impl RunConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), Local::now().date_naive())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        today: NaiveDate,
    ) -> Result<Self, ConfigError> {
        let model = ModelConfig::from_lookup(&lookup)?;

        let output_dir = env_string(&lookup, "OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let run_date = match env_string(&lookup, "RUN_DATE") {
            Some(raw) => parse_run_date(&raw).ok_or(ConfigError::InvalidValue {
                key: "RUN_DATE".to_string(),
                value: raw,
                expected: "date (YYYY-MM-DD)",
            })?,
            None => today,
        };

        let ratings_backup = match lookup("RATINGS_BACKUP") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(PathBuf::from(raw.trim())),
            None => Some(PathBuf::from(DEFAULT_RATINGS_BACKUP)),
        };

        let line_providers = match env_string(&lookup, "LINE_PROVIDERS") {
            Some(raw) => parse_providers(&raw)?,
            None => vec![LineProvider::Espn, LineProvider::Bovada],
        };

        Ok(Self {
            model,
            output_dir,
            run_date,
            ratings_backup,
            ratings_file: env_string(&lookup, "RATINGS_FILE").map(PathBuf::from),
            lines_file: env_string(&lookup, "LINES_FILE").map(PathBuf::from),
            line_providers,
            http_cache: env_bool(&lookup, "HTTP_CACHE", true),
        })
    }
}

pub fn parse_run_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_providers(raw: &str) -> Result<Vec<LineProvider>, ConfigError> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let provider = LineProvider::parse(part).ok_or_else(|| ConfigError::InvalidValue {
            key: "LINE_PROVIDERS".to_string(),
            value: part.to_string(),
            expected: "line provider (espn, bovada)",
        })?;
        if !out.contains(&provider) {
            out.push(provider);
        }
    }
    Ok(out)
}

fn env_string(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<f64>, ConfigError> {
    let Some(raw) = env_string(lookup, key) else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
            expected: "number",
        })
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::{ConfigError, LineProvider, ModelConfig, RunConfig};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date")
    }

    fn config_from(vars: &[(&str, &str)]) -> Result<RunConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunConfig::from_lookup(|key| map.get(key).cloned(), today())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = config_from(&[]).expect("defaults are valid");
        assert_eq!(cfg.model, ModelConfig::default());
        assert_eq!(cfg.model.home_court_points(), 0.6);
        assert_eq!(cfg.model.edge_threshold(), 2.0);
        assert_eq!(cfg.output_dir, PathBuf::from("site"));
        assert_eq!(cfg.run_date, today());
        assert_eq!(
            cfg.line_providers,
            vec![LineProvider::Espn, LineProvider::Bovada]
        );
        assert!(cfg.http_cache);
        assert!(cfg.ratings_backup.is_some());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config_from(&[
            ("HOME_COURT_POINTS", "3.1"),
            ("EDGE_THRESHOLD", "1.5"),
            ("FUZZY_CUTOFF", "80"),
            ("RUN_DATE", "2025-12-01"),
            ("LINE_PROVIDERS", "bovada, espn, bovada"),
            ("RATINGS_BACKUP", ""),
            ("HTTP_CACHE", "off"),
        ])
        .expect("valid overrides");
        assert_eq!(cfg.model.home_court_points(), 3.1);
        assert_eq!(cfg.model.edge_threshold(), 1.5);
        assert_eq!(cfg.model.fuzzy_cutoff(), 80.0);
        assert_eq!(cfg.run_date, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(
            cfg.line_providers,
            vec![LineProvider::Bovada, LineProvider::Espn]
        );
        assert!(cfg.ratings_backup.is_none());
        assert!(!cfg.http_cache);
    }

    #[test]
    fn negative_threshold_is_fatal() {
        assert_eq!(
            ModelConfig::new(0.6, -0.5, 85.0),
            Err(ConfigError::InvalidEdgeThreshold(-0.5))
        );
        assert!(matches!(
            config_from(&[("EDGE_THRESHOLD", "-1")]),
            Err(ConfigError::InvalidEdgeThreshold(_))
        ));
    }

    #[test]
    fn cutoff_outside_range_is_fatal() {
        assert_eq!(
            ModelConfig::new(0.6, 2.0, 101.0),
            Err(ConfigError::InvalidCutoff(101.0))
        );
        assert!(ModelConfig::new(0.6, 2.0, f64::NAN).is_err());
        assert!(ModelConfig::new(0.6, 0.0, 0.0).is_ok());
        assert!(ModelConfig::new(0.6, 0.0, 100.0).is_ok());
    }

    #[test]
    fn unparsable_values_are_reported() {
        let err = config_from(&[("HOME_COURT_POINTS", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "HOME_COURT_POINTS"));
        assert!(config_from(&[("RUN_DATE", "tomorrow")]).is_err());
        assert!(config_from(&[("LINE_PROVIDERS", "espn,pinnacle")]).is_err());
    }
}
