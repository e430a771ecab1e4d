//! attnlab core: building a long, internally consistent attention index out
//! of short, independently normalized search-interest fragments.
//!
//! This crate contains:
//! - Domain types (date windows, keyword tables, index series, audit factors)
//! - The interest-source seam, request pacing and an offline simulated source
//! - Window and keyword-batch planning, including adaptive benchmark choice
//! - Per-window fetching with cross-batch rescaling
//! - Cross-window stitching, frequency aggregation, seasonal decomposition
//!   and index construction
//! - A progress observer with a `tracing` implementation

pub mod data;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod observer;
pub mod plan;
pub mod series;

pub use domain::{
    AdjustmentFactor, BatchFactor, DateWindow, Frequency, IndexSeries, KeywordRatio, KeywordTable,
};
pub use error::{IndexError, RunWarning};
pub use fetch::{FragmentFetcher, WindowFetch};
pub use observer::{NullObserver, PipelineObserver, TracingObserver};
