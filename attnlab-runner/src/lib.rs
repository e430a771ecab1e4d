//! attnlab runner: configuration, run orchestration and artifact export.
//!
//! This crate builds on `attnlab-core` to provide:
//! - TOML run configuration with validation and BLAKE3 fingerprinting
//! - The end-to-end pipeline from planning to the finished index
//! - CSV, Parquet and JSON manifest export of a run and its intermediates

pub mod config;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, IndexConfig, IndexSection, Limits};
pub use export::{export_run, ArtifactPaths, ExportError, Manifest};
pub use pipeline::{pacer_for, plan_run, run_index, IndexRun, RunError, RunPlan};
