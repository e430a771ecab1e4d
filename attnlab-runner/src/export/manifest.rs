//! Run manifest (JSON).

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use attnlab_core::plan::CandidateScore;
use attnlab_core::{DateWindow, RunWarning};

use super::{io_error, ArtifactPaths, ExportError};
use crate::config::IndexConfig;
use crate::pipeline::IndexRun;

/// Current schema version for persisted manifests.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Complete daily rows in the window's fragment.
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub config: IndexConfig,
    pub range: DateWindow,
    /// Query terms sent to the source.
    pub keywords: Vec<String>,
    pub benchmark: Option<String>,
    /// Adaptive selection ranking, best first. Empty for a fixed benchmark.
    #[serde(default)]
    pub scores: Vec<CandidateScore>,
    pub windows: Vec<WindowRecord>,
    pub batches: Vec<Vec<String>>,
    pub periods: usize,
    pub index_name: String,
    pub warnings: Vec<RunWarning>,
    /// Artifact files relative to the run directory.
    pub files: Vec<String>,
}

impl Manifest {
    pub fn new(
        run: &IndexRun,
        config: &IndexConfig,
        source_name: &str,
        paths: &ArtifactPaths,
    ) -> Result<Self, ExportError> {
        let windows = run
            .windows
            .iter()
            .zip(&run.fragments)
            .enumerate()
            .map(|(index, (window, fragment))| WindowRecord {
                index,
                start: window.start,
                end: window.end,
                rows: fragment.len(),
            })
            .collect();

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            fingerprint: config.fingerprint()?,
            generated_at: Utc::now(),
            source: source_name.to_string(),
            config: config.clone(),
            range: run.range,
            keywords: run.keywords.clone(),
            benchmark: run.plan.benchmark.clone(),
            scores: run
                .benchmark_selection
                .as_ref()
                .map(|s| s.scores.clone())
                .unwrap_or_default(),
            windows,
            batches: run.plan.batches.clone(),
            periods: run.index.len(),
            index_name: run.index.name.clone(),
            warnings: run.warnings.clone(),
            files: relative_files(paths),
        })
    }
}

fn relative_files(paths: &ArtifactPaths) -> Vec<String> {
    let mut files: Vec<&PathBuf> = vec![
        &paths.index_csv,
        &paths.index_parquet,
        &paths.trends_csv,
        &paths.trends_parquet,
    ];
    files.extend(paths.trends_sa_csv.iter());
    files.extend([
        &paths.stitched_csv,
        &paths.adjustments_csv,
        &paths.batch_factors_csv,
    ]);
    files.extend(paths.fragments.iter());
    files
        .into_iter()
        .map(|p| {
            p.strip_prefix(&paths.run_dir)
                .unwrap_or(p)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json).map_err(io_error(path))?;
    Ok(())
}
