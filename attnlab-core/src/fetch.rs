//! Per-window fragment retrieval and cross-batch rescaling.
//!
//! Every batch in a window is requested separately, so each comes back on its
//! own 0..=100 scale. The benchmark term is present in every batch; its mean
//! over the shared dates gives the factor that puts a batch on the first
//! batch's scale.

use serde::{Deserialize, Serialize};

use crate::data::{CallSite, InterestSource, InterestTable, Pacer};
use crate::domain::{BatchFactor, DateWindow, KeywordTable};
use crate::error::{IndexError, RunWarning};
use crate::observer::PipelineObserver;
use crate::plan::{BatchPlan, BenchmarkMode};

/// Default share of benchmark values allowed to equal 1.
pub const DEFAULT_FLAT_TOLERANCE: f64 = 0.2;

/// Flatness statistics for a benchmark column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkCheck {
    pub zeros: usize,
    pub ones_fraction: f64,
}

impl BenchmarkCheck {
    pub fn assess(values: &[u8]) -> Self {
        let zeros = values.iter().filter(|v| **v == 0).count();
        let ones = values.iter().filter(|v| **v == 1).count();
        let ones_fraction = if values.is_empty() {
            0.0
        } else {
            ones as f64 / values.len() as f64
        };
        Self {
            zeros,
            ones_fraction,
        }
    }

    /// Any zero, or more than `tolerance` of the values at 1.
    pub fn is_flat(&self, tolerance: f64) -> bool {
        self.zeros > 0 || self.ones_fraction > tolerance
    }
}

/// Result of fetching one window.
#[derive(Debug, Clone)]
pub struct WindowFetch {
    pub window_index: usize,
    pub window: DateWindow,
    /// Complete rows only, columns in plan order.
    pub fragment: KeywordTable,
    pub batch_factors: Vec<BatchFactor>,
    pub warnings: Vec<RunWarning>,
}

/// Convert a response into a table of its complete rows, columns in
/// `keywords` order.
pub fn complete_table(
    response: &InterestTable,
    keywords: &[String],
    window: DateWindow,
) -> Result<KeywordTable, IndexError> {
    let indices = keywords
        .iter()
        .map(|k| {
            response
                .column_index(k)
                .ok_or_else(|| IndexError::MissingKeyword {
                    keyword: k.clone(),
                    window,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rows: Vec<_> = response.complete_rows().collect();
    let dates = rows.iter().map(|r| r.date).collect();
    let columns = indices
        .iter()
        .map(|&i| rows.iter().map(|r| f64::from(r.values[i])).collect())
        .collect();
    KeywordTable::new(dates, keywords.to_vec(), columns)
}

pub struct FragmentFetcher<'a> {
    source: &'a dyn InterestSource,
    pacer: &'a dyn Pacer,
    observer: &'a dyn PipelineObserver,
    region: String,
    mode: BenchmarkMode,
    flat_tolerance: f64,
}

impl<'a> FragmentFetcher<'a> {
    pub fn new(
        source: &'a dyn InterestSource,
        pacer: &'a dyn Pacer,
        observer: &'a dyn PipelineObserver,
        region: impl Into<String>,
    ) -> Self {
        Self {
            source,
            pacer,
            observer,
            region: region.into(),
            mode: BenchmarkMode::First,
            flat_tolerance: DEFAULT_FLAT_TOLERANCE,
        }
    }

    pub fn with_benchmark_mode(mut self, mode: BenchmarkMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_flat_tolerance(mut self, tolerance: f64) -> Self {
        self.flat_tolerance = tolerance;
        self
    }

    /// Fetch every batch of `plan` for one window and join them on the
    /// benchmark's scale.
    pub fn fetch_window(
        &self,
        window_index: usize,
        window: DateWindow,
        plan: &BatchPlan,
    ) -> Result<WindowFetch, IndexError> {
        if plan.batches.is_empty() {
            return Err(IndexError::InvalidPlan("batch plan has no batches".into()));
        }

        let mut frame: Option<KeywordTable> = None;
        let mut batch_factors = Vec::new();
        let mut warnings = Vec::new();

        for (batch_index, batch) in plan.batches.iter().enumerate() {
            self.pacer.pause(CallSite::Batch);
            let response = self.source.fetch(batch, &self.region, window)?;
            self.observer
                .on_batch_fetched(window_index, batch_index, response.rows.len());

            if let Some(benchmark) = &plan.benchmark {
                let values = response
                    .column(benchmark)
                    .ok_or_else(|| IndexError::MissingKeyword {
                        keyword: benchmark.clone(),
                        window,
                    })?;
                let check = BenchmarkCheck::assess(&values);
                if check.is_flat(self.flat_tolerance) {
                    match self.mode {
                        BenchmarkMode::First => {
                            return Err(IndexError::BenchmarkQuality {
                                benchmark: benchmark.clone(),
                                window,
                                zeros: check.zeros,
                                ones_fraction: check.ones_fraction,
                            });
                        }
                        // one warning per window is enough
                        BenchmarkMode::Adaptive if warnings.is_empty() => {
                            warnings.push(RunWarning::WeakBenchmark {
                                benchmark: benchmark.clone(),
                                window,
                                zeros: check.zeros,
                                ones_fraction: check.ones_fraction,
                            });
                        }
                        BenchmarkMode::Adaptive => {}
                    }
                }
            }

            let mut table = complete_table(&response, batch, window)?;
            if table.is_empty() {
                return Err(IndexError::EmptyFragment { window });
            }

            let Some(benchmark) = &plan.benchmark else {
                frame = Some(table);
                continue;
            };
            let bench_col = table
                .keyword_index(benchmark)
                .ok_or_else(|| IndexError::MissingKeyword {
                    keyword: benchmark.clone(),
                    window,
                })?;
            for v in table.column_mut(bench_col) {
                if *v == 0.0 {
                    *v = 1.0;
                }
            }

            frame = Some(match frame {
                None => table,
                Some(acc) => {
                    let (joined, factor) = self.join_batch(&acc, &table, benchmark, window)?;
                    let record = BatchFactor {
                        window_index,
                        batch_index,
                        benchmark: benchmark.clone(),
                        factor,
                    };
                    self.observer.on_batch_factor(&record);
                    batch_factors.push(record);
                    joined
                }
            });
        }

        let fragment = frame.ok_or(IndexError::EmptyFragment { window })?;
        Ok(WindowFetch {
            window_index,
            window,
            fragment,
            batch_factors,
            warnings,
        })
    }

    /// Rescale `batch` onto `acc`'s benchmark level and append its other
    /// columns. Only dates present in both survive.
    fn join_batch(
        &self,
        acc: &KeywordTable,
        batch: &KeywordTable,
        benchmark: &str,
        window: DateWindow,
    ) -> Result<(KeywordTable, f64), IndexError> {
        let shared = acc.shared_dates(batch);
        let missing = || IndexError::MissingKeyword {
            keyword: benchmark.to_string(),
            window,
        };
        let acc_col = acc.keyword_index(benchmark).ok_or_else(missing)?;
        let batch_col = batch.keyword_index(benchmark).ok_or_else(missing)?;

        let (Some(base), Some(current)) = (
            acc.mean_on(acc_col, &shared),
            batch.mean_on(batch_col, &shared),
        ) else {
            return Err(IndexError::EmptyFragment { window });
        };
        // benchmark zeros were floored to 1, so `current` is at least 1
        let factor = base / current;

        let mut joined = acc.restrict_to(&shared);
        let batch = batch.restrict_to(&shared);
        for (keyword, column) in batch.keywords().iter().zip(batch.columns()) {
            if keyword != benchmark {
                joined.push_column(keyword.clone(), column.iter().map(|v| v * factor).collect());
            }
        }
        Ok((joined, factor))
    }
}
