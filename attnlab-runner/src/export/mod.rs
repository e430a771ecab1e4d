//! Artifact export for a finished run.
//!
//! Layout of one run directory, named after the config fingerprint:
//!
//! ```text
//! run_<fingerprint[..12]>/
//!   manifest.json
//!   index.csv        index.parquet
//!   trends.csv       trends.parquet
//!   trends_sa.csv    (when the trends were long enough to adjust)
//!   stitched.csv
//!   adjustments.csv
//!   batch_factors.csv
//!   fragments/window_000.csv ...
//! ```

mod manifest;
mod parquet;
mod tables;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{ConfigError, IndexConfig};
use crate::pipeline::IndexRun;

pub use manifest::{Manifest, WindowRecord, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("parquet: {0}")]
    Parquet(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Paths written by [`export_run`].
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub index_csv: PathBuf,
    pub index_parquet: PathBuf,
    pub trends_csv: PathBuf,
    pub trends_parquet: PathBuf,
    pub trends_sa_csv: Option<PathBuf>,
    pub stitched_csv: PathBuf,
    pub adjustments_csv: PathBuf,
    pub batch_factors_csv: PathBuf,
    pub fragments: Vec<PathBuf>,
}

/// Directory name for a run of `config`.
pub fn run_dir_name(config: &IndexConfig) -> Result<String, ExportError> {
    let fingerprint = config.fingerprint()?;
    Ok(format!("run_{}", &fingerprint[..12]))
}

/// Write every artifact of `run` under `output_dir`.
///
/// Re-running an identical config overwrites the previous run's files.
pub fn export_run(
    run: &IndexRun,
    config: &IndexConfig,
    source_name: &str,
    output_dir: &Path,
) -> Result<ArtifactPaths, ExportError> {
    let run_dir = output_dir.join(run_dir_name(config)?);
    let fragment_dir = run_dir.join("fragments");
    std::fs::create_dir_all(&fragment_dir).map_err(io_error(&fragment_dir))?;

    let index_csv = run_dir.join("index.csv");
    tables::write_index_csv(&index_csv, &run.index)?;
    let index_parquet = run_dir.join("index.parquet");
    parquet::write_index_parquet(&index_parquet, &run.index)?;

    let trends_csv = run_dir.join("trends.csv");
    tables::write_table_csv(&trends_csv, &run.trends)?;
    let trends_parquet = run_dir.join("trends.parquet");
    parquet::write_table_parquet(&trends_parquet, &run.trends)?;

    let trends_sa_csv = match &run.trends_sa {
        Some(table) => {
            let path = run_dir.join("trends_sa.csv");
            tables::write_table_csv(&path, table)?;
            Some(path)
        }
        None => None,
    };

    let stitched_csv = run_dir.join("stitched.csv");
    tables::write_table_csv(&stitched_csv, &run.stitched)?;

    let mut fragments = Vec::with_capacity(run.fragments.len());
    for (i, fragment) in run.fragments.iter().enumerate() {
        let path = fragment_dir.join(format!("window_{i:03}.csv"));
        tables::write_table_csv(&path, fragment)?;
        fragments.push(path);
    }

    let adjustments_csv = run_dir.join("adjustments.csv");
    tables::write_adjustments_csv(&adjustments_csv, &run.adjustments)?;
    let batch_factors_csv = run_dir.join("batch_factors.csv");
    tables::write_batch_factors_csv(&batch_factors_csv, &run.batch_factors)?;

    let paths = ArtifactPaths {
        manifest: run_dir.join("manifest.json"),
        run_dir,
        index_csv,
        index_parquet,
        trends_csv,
        trends_parquet,
        trends_sa_csv,
        stitched_csv,
        adjustments_csv,
        batch_factors_csv,
        fragments,
    };

    let manifest = Manifest::new(run, config, source_name, &paths)?;
    manifest::write_manifest(&paths.manifest, &manifest)?;

    tracing::info!(dir = %paths.run_dir.display(), "artifacts written");
    Ok(paths)
}
