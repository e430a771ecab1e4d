//! Interest source trait and structured error types.
//!
//! The InterestSource trait abstracts over whatever answers relative-interest
//! queries (a live search-interest client, a recorded ground truth, a scripted
//! fake in tests) so the pipeline never depends on a concrete backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DateWindow;

/// One dated row of a source response.
///
/// Values are on the source's 0..=100 scale, relative to the largest value
/// across every keyword and date in the same request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRow {
    pub date: NaiveDate,
    pub values: Vec<u8>,
    /// The source marks the most recent period as incomplete.
    pub is_partial: bool,
}

/// A single source response: one column per requested keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestTable {
    pub keywords: Vec<String>,
    pub rows: Vec<InterestRow>,
}

impl InterestTable {
    pub fn column_index(&self, keyword: &str) -> Option<usize> {
        self.keywords.iter().position(|k| k == keyword)
    }

    /// Values of one keyword across every row, partial rows included.
    pub fn column(&self, keyword: &str) -> Option<Vec<u8>> {
        let idx = self.column_index(keyword)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Rows the source did not flag as partial.
    pub fn complete_rows(&self) -> impl Iterator<Item = &InterestRow> {
        self.rows.iter().filter(|r| !r.is_partial)
    }

    pub fn has_partial_rows(&self) -> bool {
        self.rows.iter().any(|r| r.is_partial)
    }
}

/// Structured error types for source requests.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("request quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("too many keywords in one request: {requested} (cap {cap})")]
    TooManyKeywords { requested: usize, cap: usize },

    #[error("date range {window} spans {days} days (cap {cap})")]
    RangeTooLong {
        window: DateWindow,
        days: i64,
        cap: i64,
    },

    #[error("unknown keyword: {0}")]
    UnknownKeyword(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("source error: {0}")]
    Other(String),
}

/// Trait for relative-interest sources.
///
/// Implementations answer one request at a time and enforce their own caps;
/// pacing between requests is the caller's concern (see `Pacer`).
pub trait InterestSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Relative interest for up to the source's keyword cap over `window`.
    ///
    /// The returned table has one column per requested keyword, in request
    /// order, and one row per day of the window the source has data for.
    fn fetch(
        &self,
        keywords: &[String],
        region: &str,
        window: DateWindow,
    ) -> Result<InterestTable, SourceError>;
}
