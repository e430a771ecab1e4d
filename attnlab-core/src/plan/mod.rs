//! Request planning: date windows, keyword batches, benchmark choice and
//! default date ranges. Planners run once, before any data is fetched.

pub mod benchmark;
pub mod dates;
pub mod keywords;
pub mod windows;

pub use benchmark::{reference_term, score_candidates, select_benchmark, BenchmarkSelection, CandidateScore};
pub use dates::{resolve_range, Lookback};
pub use keywords::{
    combine_keywords, plan_batches, validate_keywords, BatchPlan, BenchmarkMode, COMBINE_SEPARATOR,
};
pub use windows::plan_windows;
