//! Error and warning types for index construction.
//!
//! `IndexError` is fatal to a run. `RunWarning` is collected alongside the
//! outputs and never stops the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::SourceError;
use crate::domain::{DateWindow, Frequency};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error(
        "benchmark '{benchmark}' is too flat for {window}: {zeros} zero value(s), {:.0}% of values equal to 1",
        .ones_fraction * 100.0
    )]
    BenchmarkQuality {
        benchmark: String,
        window: DateWindow,
        zeros: usize,
        ones_fraction: f64,
    },

    #[error("adaptive benchmark selection has no reference term for language '{0}' (supported: en, es)")]
    UnsupportedLocale(String),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("source response for {window} has no column for keyword '{keyword}'")]
    MissingKeyword { keyword: String, window: DateWindow },

    #[error("source returned no complete rows for {window}")]
    EmptyFragment { window: DateWindow },

    #[error("window {window_index} shares no dates with the series stitched so far")]
    DisjointWindows { window_index: usize },

    #[error("table shape mismatch: {0}")]
    Shape(String),

    #[error("seasonal decomposition with period {period} needs at least {required} observations, got {actual}")]
    SeriesTooShort {
        period: usize,
        required: usize,
        actual: usize,
    },

    #[error("index is degenerate: {0}")]
    DegenerateIndex(String),
}

/// Non-fatal conditions reported with a run's outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// An adaptively chosen benchmark failed the flatness check in a window.
    WeakBenchmark {
        benchmark: String,
        window: DateWindow,
        zeros: usize,
        ones_fraction: f64,
    },
    /// Not enough daily rows to fill a single complete period.
    InsufficientCoverage {
        frequency: Frequency,
        daily_rows: usize,
    },
    /// The seasonally adjusted trends could not be produced.
    SeasonalSkipped { reason: String },
    /// Keywords were merged into combined query terms.
    KeywordsCombined { original: usize, combined: usize },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::WeakBenchmark {
                benchmark,
                window,
                zeros,
                ones_fraction,
            } => write!(
                f,
                "benchmark '{benchmark}' was the best candidate but performs poorly in {window} \
                 ({zeros} zero value(s), {:.0}% ones)",
                ones_fraction * 100.0
            ),
            RunWarning::InsufficientCoverage {
                frequency,
                daily_rows,
            } => write!(
                f,
                "{daily_rows} daily row(s) do not cover a single complete {frequency} period"
            ),
            RunWarning::SeasonalSkipped { reason } => {
                write!(f, "seasonally adjusted trends unavailable: {reason}")
            }
            RunWarning::KeywordsCombined { original, combined } => write!(
                f,
                "{original} keywords were combined into {combined} query terms"
            ),
        }
    }
}
