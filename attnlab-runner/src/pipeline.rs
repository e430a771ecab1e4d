//! Run orchestration: plan, fetch, stitch, aggregate, build.
//!
//! `run_index` is the single entry point used by the CLI. It owns no I/O of
//! its own beyond the source calls; persisting the outcome is `export`'s job.

use chrono::NaiveDate;
use thiserror::Error;

use attnlab_core::data::{CallSite, InterestSource, NoPacer, Pacer, RandomPacer};
use attnlab_core::plan::{
    plan_batches, plan_windows, resolve_range, select_benchmark, BatchPlan, BenchmarkMode,
    BenchmarkSelection,
};
use attnlab_core::series::{aggregate, build_index, WindowStitcher};
use attnlab_core::{
    AdjustmentFactor, BatchFactor, DateWindow, FragmentFetcher, IndexError, IndexSeries,
    KeywordTable, PipelineObserver, RunWarning,
};

use crate::config::{ConfigError, IndexConfig};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Everything decided before the first request.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Query terms, after combining.
    pub keywords: Vec<String>,
    pub range: DateWindow,
    pub windows: Vec<DateWindow>,
    pub warnings: Vec<RunWarning>,
}

/// Validate `config` and work out the query terms, range and windows.
///
/// Batching is not part of the plan: with an adaptive benchmark it depends
/// on probe requests.
pub fn plan_run(config: &IndexConfig, today: NaiveDate) -> Result<RunPlan, RunError> {
    config.validate()?;

    let mut warnings = Vec::new();
    let (keywords, combined) = config.query_terms();
    if combined {
        warnings.push(RunWarning::KeywordsCombined {
            original: config.index.keywords.len(),
            combined: keywords.len(),
        });
    }

    let range = resolve_range(
        config.index.start_date,
        config.index.end_date,
        config.index.frequency,
        today,
        &config.lookback(),
    )?;
    let windows = plan_windows(
        range.start,
        range.end,
        config.limits.day_cap,
        config.limits.overlap,
    )?;

    Ok(RunPlan {
        keywords,
        range,
        windows,
        warnings,
    })
}

/// Pacer matching the config's `slowdown` switch.
pub fn pacer_for(config: &IndexConfig) -> Box<dyn Pacer> {
    if config.index.slowdown {
        Box::new(RandomPacer::default())
    } else {
        Box::new(NoPacer)
    }
}

/// Complete outcome of one run, intermediates included for export.
#[derive(Debug, Clone)]
pub struct IndexRun {
    pub keywords: Vec<String>,
    pub range: DateWindow,
    pub windows: Vec<DateWindow>,
    pub plan: BatchPlan,
    pub benchmark_selection: Option<BenchmarkSelection>,
    /// Per-window fragments, after cross-batch rescaling.
    pub fragments: Vec<KeywordTable>,
    pub batch_factors: Vec<BatchFactor>,
    /// Daily series after cross-window stitching.
    pub stitched: KeywordTable,
    pub adjustments: Vec<AdjustmentFactor>,
    /// Aggregated to the configured frequency.
    pub trends: KeywordTable,
    pub trends_sa: Option<KeywordTable>,
    pub index: IndexSeries,
    pub warnings: Vec<RunWarning>,
}

impl IndexRun {
    pub fn request_count(&self) -> usize {
        self.windows.len() * self.plan.batches.len()
    }
}

/// Build an index from `source` according to `config`.
pub fn run_index(
    config: &IndexConfig,
    source: &dyn InterestSource,
    pacer: &dyn Pacer,
    observer: &dyn PipelineObserver,
    today: NaiveDate,
) -> Result<IndexRun, RunError> {
    let RunPlan {
        keywords,
        range,
        windows,
        mut warnings,
    } = plan_run(config, today)?;
    for warning in &warnings {
        observer.on_warning(warning);
    }

    tracing::info!(
        source = source.name(),
        keywords = keywords.len(),
        %range,
        windows = windows.len(),
        frequency = %config.index.frequency,
        "starting index run"
    );

    let batch_cap = config.limits.batch_cap;
    let adaptive = config.index.benchmark == BenchmarkMode::Adaptive
        && attnlab_core::plan::keywords::needs_benchmark(keywords.len(), batch_cap);
    let benchmark_selection = if adaptive {
        let selection = select_benchmark(
            source,
            pacer,
            &keywords,
            &config.index.region,
            &config.index.language,
            &windows,
            batch_cap,
        )?;
        observer.on_benchmark_selected(&selection);
        Some(selection)
    } else {
        None
    };

    let plan = plan_batches(
        &keywords,
        batch_cap,
        benchmark_selection.as_ref().map(|s| s.benchmark.as_str()),
    )?;
    observer.on_plan(&windows, &plan);

    let fetcher = FragmentFetcher::new(source, pacer, observer, config.index.region.clone())
        .with_benchmark_mode(config.index.benchmark)
        .with_flat_tolerance(config.limits.flat_tolerance);

    let mut stitcher = WindowStitcher::new();
    let mut fragments = Vec::with_capacity(windows.len());
    let mut batch_factors = Vec::new();
    for (i, &window) in windows.iter().enumerate() {
        if i > 0 {
            pacer.pause(CallSite::Window);
        }
        observer.on_window_start(i, windows.len(), window);

        let fetched = fetcher.fetch_window(i, window, &plan)?;
        for warning in &fetched.warnings {
            observer.on_warning(warning);
        }
        warnings.extend(fetched.warnings);
        batch_factors.extend(fetched.batch_factors);

        if let Some((adjustment, appended)) = stitcher.push(&fetched.fragment)? {
            observer.on_window_stitched(adjustment, appended);
        }
        fragments.push(fetched.fragment);
    }
    let stitched = stitcher.finish()?;

    let trends = aggregate(&stitched.series, config.index.frequency);
    if trends.is_empty() {
        let warning = RunWarning::InsufficientCoverage {
            frequency: config.index.frequency,
            daily_rows: stitched.series.len(),
        };
        observer.on_warning(&warning);
        warnings.push(warning);
    }

    let output = build_index(trends, &config.index_settings())?;
    let composite_skipped = config.index.seasonal.composite() && !output.composite_adjusted;
    if !output.trends.is_empty() && (output.trends_sa.is_none() || composite_skipped) {
        let mut reason = output
            .trends_sa_error
            .clone()
            .unwrap_or_else(|| "unknown".into());
        if composite_skipped {
            reason.push_str("; index built from the unadjusted sum");
        }
        let warning = RunWarning::SeasonalSkipped { reason };
        observer.on_warning(&warning);
        warnings.push(warning);
    }
    observer.on_complete(output.index.len());

    Ok(IndexRun {
        keywords,
        range,
        windows,
        plan,
        benchmark_selection,
        fragments,
        batch_factors,
        stitched: stitched.series,
        adjustments: stitched.adjustments,
        trends: output.trends,
        trends_sa: output.trends_sa,
        index: output.index,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use attnlab_core::data::SimulatedSource;
    use attnlab_core::{Frequency, NullObserver};
    use chrono::Days;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config(keywords: &[&str]) -> IndexConfig {
        let mut config = IndexConfig::for_keywords(keywords.iter().map(|s| s.to_string()).collect());
        config.index.slowdown = false;
        config
    }

    #[test]
    fn plan_defaults_to_lookback_before_today() {
        let plan = plan_run(&config(&["a", "b"]), d(2024, 12, 31)).unwrap();
        assert_eq!(plan.range.end, d(2024, 12, 31));
        assert_eq!(plan.range.start, d(2024, 12, 31) - Days::new(260));
        assert_eq!(plan.windows.len(), 2);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn plan_reports_combined_keywords() {
        let keywords: Vec<String> = (0..30).map(|i| format!("k{i}")).collect();
        let mut config = IndexConfig::for_keywords(keywords);
        config.limits.combined_term_max_len = 20;
        let plan = plan_run(&config, d(2024, 12, 31)).unwrap();
        assert!(matches!(
            plan.warnings[..],
            [RunWarning::KeywordsCombined { original: 30, .. }]
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_fetching() {
        let mut config = config(&["a", "b"]);
        config.limits.day_cap = 0;
        let source = SimulatedSource::synthetic(
            &["a".to_string(), "b".to_string()],
            d(2024, 1, 1),
            d(2024, 12, 31),
            1,
        )
        .unwrap();
        let err = run_index(&config, &source, &NoPacer, &NullObserver, d(2024, 12, 31))
            .unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::Invalid { .. })));
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn slowdown_switch_selects_pacer() {
        let mut config = config(&["a"]);
        // NoPacer returns immediately; RandomPacer would sleep for seconds
        pacer_for(&config).pause(CallSite::Batch);
        config.index.slowdown = true;
        let _ = pacer_for(&config);
    }

    #[test]
    fn daily_run_over_synthetic_source() {
        let keywords = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let source =
            SimulatedSource::synthetic(&keywords, d(2023, 1, 1), d(2024, 6, 30), 11).unwrap();
        let mut config = config(&["a", "b", "c"]);
        config.index.start_date = Some(d(2023, 1, 1));
        config.index.end_date = Some(d(2024, 6, 30));
        config.index.frequency = Frequency::Daily;

        let run = run_index(&config, &source, &NoPacer, &NullObserver, d(2024, 6, 30)).unwrap();
        assert_eq!(run.stitched.len(), run.range.span_days() as usize + 1);
        assert_eq!(run.trends.len(), run.stitched.len());
        assert_eq!(run.index.len(), run.trends.len());
        assert_eq!(run.adjustments.len(), run.windows.len() - 1);
        assert_eq!(run.fragments.len(), run.windows.len());
        assert!(run.plan.benchmark.is_none());
        assert_eq!(source.request_count(), run.request_count());
    }
}
