//! Series transforms: stitching windows, resampling, seasonal adjustment
//! and the final index.

pub mod aggregate;
pub mod index;
pub mod seasonal;
pub mod stats;
pub mod stitch;

pub use aggregate::aggregate;
pub use index::{build_index, IndexOutput, IndexSettings, Reduction, SeasonalMode};
pub use seasonal::{decompose, seasonally_adjust, Decomposition};
pub use stitch::{stitch, StitchResult, WindowStitcher};
