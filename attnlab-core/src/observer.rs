//! Progress callbacks for a pipeline run.

use crate::domain::{AdjustmentFactor, BatchFactor, DateWindow};
use crate::error::RunWarning;
use crate::plan::{BatchPlan, BenchmarkSelection};

/// Callback trait for pipeline progress.
///
/// All methods have default no-op implementations.
pub trait PipelineObserver: Send + Sync {
    /// Called once windows and batches are planned.
    fn on_plan(&self, _windows: &[DateWindow], _plan: &BatchPlan) {}

    /// Called after adaptive benchmark selection.
    fn on_benchmark_selected(&self, _selection: &BenchmarkSelection) {}

    /// Called before the first request of a window.
    fn on_window_start(&self, _index: usize, _total: usize, _window: DateWindow) {}

    /// Called after each source request returns.
    fn on_batch_fetched(&self, _window_index: usize, _batch_index: usize, _rows: usize) {}

    /// Called when a batch is rescaled onto the benchmark's level.
    fn on_batch_factor(&self, _factor: &BatchFactor) {}

    /// Called after a window is folded into the running series.
    fn on_window_stitched(&self, _adjustment: &AdjustmentFactor, _appended_rows: usize) {}

    /// Called for every non-fatal condition.
    fn on_warning(&self, _warning: &RunWarning) {}

    /// Called once the index is built.
    fn on_complete(&self, _periods: usize) {}
}

/// Silent observer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// Emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_plan(&self, windows: &[DateWindow], plan: &BatchPlan) {
        tracing::info!(
            windows = windows.len(),
            batches = plan.batches.len(),
            benchmark = plan.benchmark.as_deref().unwrap_or("-"),
            "Planned fetch"
        );
    }

    fn on_benchmark_selected(&self, selection: &BenchmarkSelection) {
        tracing::info!(
            benchmark = %selection.benchmark,
            reference = %selection.reference,
            "Benchmark selected"
        );
    }

    fn on_window_start(&self, index: usize, total: usize, window: DateWindow) {
        tracing::info!(
            window = index + 1,
            of = total,
            start = %window.start,
            end = %window.end,
            "Fetching window"
        );
    }

    fn on_batch_fetched(&self, window_index: usize, batch_index: usize, rows: usize) {
        tracing::debug!(window_index, batch_index, rows, "Batch fetched");
    }

    fn on_batch_factor(&self, factor: &BatchFactor) {
        tracing::debug!(
            window_index = factor.window_index,
            batch_index = factor.batch_index,
            factor = factor.factor,
            "Batch rescaled"
        );
    }

    fn on_window_stitched(&self, adjustment: &AdjustmentFactor, appended_rows: usize) {
        let floored = adjustment
            .ratios
            .iter()
            .filter(|r| r.fragment_mean > 0.0 && r.running_mean / r.fragment_mean < 1.0)
            .count();
        tracing::info!(
            window_index = adjustment.window_index,
            overlap_days = adjustment.overlap_days,
            appended_rows,
            floored,
            "Window stitched"
        );
    }

    fn on_warning(&self, warning: &RunWarning) {
        tracing::warn!(%warning, "Run warning");
    }

    fn on_complete(&self, periods: usize) {
        tracing::info!(periods, "Index built");
    }
}
