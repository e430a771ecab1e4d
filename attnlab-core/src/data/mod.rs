//! Data access: the interest source seam, request pacing and an offline
//! ground-truth source.

pub mod pacer;
pub mod simulated;
pub mod source;

pub use pacer::{CallSite, NoPacer, Pacer, PauseRange, RandomPacer};
pub use simulated::SimulatedSource;
pub use source::{InterestRow, InterestSource, InterestTable, SourceError};
