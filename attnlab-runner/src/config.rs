//! Serializable index configuration.
//!
//! A run is described by a TOML file with an `[index]` table (what to build)
//! and an optional `[limits]` table (source caps and tuning knobs):
//!
//! ```toml
//! [index]
//! keywords = ["inflation", "recession", "layoffs"]
//! region = "US"
//! language = "en"
//! start_date = "2019-01-01"   # optional, quoted
//! frequency = "monthly"
//! benchmark = "first"         # or "adaptive"
//! seasonal = "composite"      # none | per_keyword | composite | both
//! reduction = "standard"      # or "normalized"
//!
//! [limits]
//! overlap = 60
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use attnlab_core::fetch::DEFAULT_FLAT_TOLERANCE;
use attnlab_core::plan::keywords::{
    DEFAULT_BATCH_CAP, DEFAULT_COMBINED_TERM_MAX_LEN, DEFAULT_COMBINE_THRESHOLD,
};
use attnlab_core::plan::windows::{DEFAULT_DAY_CAP, DEFAULT_OVERLAP};
use attnlab_core::plan::{
    combine_keywords, reference_term, validate_keywords, BenchmarkMode, Lookback,
};
use attnlab_core::series::{IndexSettings, Reduction, SeasonalMode};
use attnlab_core::Frequency;

/// Longest lookback accepted for any of the `*_days` limits (about a century).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Content-addressable identifier of a configuration.
pub type ConfigFingerprint = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Complete description of one index run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    pub index: IndexSection,

    #[serde(default)]
    pub limits: Limits,
}

/// What to build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexSection {
    pub keywords: Vec<String>,

    /// Display name of the index. Defaults to one derived from the reduction.
    #[serde(default)]
    pub name: Option<String>,

    /// Source region code; empty means worldwide.
    #[serde(default)]
    pub region: String,

    /// Selects the reference term for adaptive benchmark selection.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Defaults to the day of the run.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub frequency: Frequency,

    #[serde(default)]
    pub benchmark: BenchmarkMode,

    #[serde(default)]
    pub seasonal: SeasonalMode,

    #[serde(default)]
    pub reduction: Reduction,

    /// Pause between requests.
    #[serde(default = "default_true")]
    pub slowdown: bool,

    /// Merge long keyword lists into `a + b` terms.
    #[serde(default = "default_true")]
    pub combine_keywords: bool,
}

/// Source caps and tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Span of each date window in days.
    pub day_cap: i64,
    /// Days shared by consecutive windows.
    pub overlap: i64,
    /// Keywords per request.
    pub batch_cap: usize,
    /// Share of benchmark values allowed to equal 1.
    pub flat_tolerance: f64,
    pub combine_threshold: usize,
    pub combined_term_max_len: usize,
    /// Observations per seasonal cycle. Defaults per frequency.
    pub seasonal_period: Option<usize>,
    pub daily_lookback_days: i64,
    pub long_lookback_days: i64,
    pub long_min_history_days: i64,
}

impl Default for Limits {
    fn default() -> Self {
        let lookback = Lookback::default();
        Self {
            day_cap: DEFAULT_DAY_CAP,
            overlap: DEFAULT_OVERLAP,
            batch_cap: DEFAULT_BATCH_CAP,
            flat_tolerance: DEFAULT_FLAT_TOLERANCE,
            combine_threshold: DEFAULT_COMBINE_THRESHOLD,
            combined_term_max_len: DEFAULT_COMBINED_TERM_MAX_LEN,
            seasonal_period: None,
            daily_lookback_days: lookback.daily_days,
            long_lookback_days: lookback.long_days,
            long_min_history_days: lookback.long_min_history_days,
        }
    }
}

fn default_language() -> String {
    "en".into()
}

fn default_true() -> bool {
    true
}

impl IndexConfig {
    /// Default configuration for a keyword list.
    pub fn for_keywords(keywords: Vec<String>) -> Self {
        Self {
            index: IndexSection {
                keywords,
                name: None,
                region: String::new(),
                language: default_language(),
                start_date: None,
                end_date: None,
                frequency: Frequency::default(),
                benchmark: BenchmarkMode::default(),
                seasonal: SeasonalMode::default(),
                reduction: Reduction::default(),
                slowdown: true,
                combine_keywords: true,
            },
            limits: Limits::default(),
        }
    }

    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| invalid("config", e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let index = &self.index;
        let limits = &self.limits;

        validate_keywords(&index.keywords).map_err(|e| invalid("index.keywords", e.to_string()))?;
        if let (Some(start), Some(end)) = (index.start_date, index.end_date) {
            if end < start {
                return Err(invalid(
                    "index.end_date",
                    format!("{end} is before start_date {start}"),
                ));
            }
        }
        if index.benchmark == BenchmarkMode::Adaptive {
            reference_term(&index.language).map_err(|e| invalid("index.language", e.to_string()))?;
        }

        if limits.day_cap <= 0 {
            return Err(invalid("limits.day_cap", "must be positive"));
        }
        if limits.overlap < 0 || limits.overlap >= limits.day_cap {
            return Err(invalid(
                "limits.overlap",
                format!("must be in [0, day_cap = {})", limits.day_cap),
            ));
        }
        if limits.batch_cap < 2 {
            return Err(invalid(
                "limits.batch_cap",
                "must leave room for the benchmark and one keyword (>= 2)",
            ));
        }
        if !(0.0..=1.0).contains(&limits.flat_tolerance) {
            return Err(invalid("limits.flat_tolerance", "must be in [0, 1]"));
        }
        if limits.combined_term_max_len == 0 {
            return Err(invalid("limits.combined_term_max_len", "must be positive"));
        }
        if let Some(period) = limits.seasonal_period {
            if period < 2 {
                return Err(invalid("limits.seasonal_period", "must be at least 2"));
            }
        }
        for (field, days) in [
            ("limits.daily_lookback_days", limits.daily_lookback_days),
            ("limits.long_lookback_days", limits.long_lookback_days),
            ("limits.long_min_history_days", limits.long_min_history_days),
        ] {
            if days < 0 {
                return Err(invalid(field, "must not be negative"));
            }
            if days > MAX_LOOKBACK_DAYS {
                return Err(invalid(
                    field,
                    format!("must be at most {MAX_LOOKBACK_DAYS} days"),
                ));
            }
        }
        Ok(())
    }

    /// BLAKE3 hash of the configuration's JSON form.
    ///
    /// Two runs with identical configs share a fingerprint (and an artifact
    /// directory).
    pub fn fingerprint(&self) -> Result<ConfigFingerprint, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Query terms actually sent to the source, and whether combining
    /// changed them.
    pub fn query_terms(&self) -> (Vec<String>, bool) {
        let keywords = &self.index.keywords;
        if self.index.combine_keywords && keywords.len() > self.limits.combine_threshold {
            let combined = combine_keywords(keywords, self.limits.combined_term_max_len);
            let changed = combined.len() != keywords.len();
            (combined, changed)
        } else {
            (keywords.clone(), false)
        }
    }

    pub fn seasonal_period(&self) -> usize {
        self.limits
            .seasonal_period
            .unwrap_or_else(|| self.index.frequency.seasonal_period())
    }

    pub fn lookback(&self) -> Lookback {
        Lookback {
            daily_days: self.limits.daily_lookback_days,
            long_days: self.limits.long_lookback_days,
            long_min_history_days: self.limits.long_min_history_days,
        }
    }

    pub fn index_name(&self) -> String {
        self.index
            .name
            .clone()
            .unwrap_or_else(|| format!("Attention Index ({})", self.index.reduction.label()))
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            name: self.index_name(),
            reduction: self.index.reduction,
            seasonal: self.index.seasonal,
            period: self.seasonal_period(),
        }
    }
}
