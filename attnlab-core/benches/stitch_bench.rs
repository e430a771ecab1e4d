//! Criterion benchmarks for the series hot paths.
//!
//! Benchmarks:
//! 1. Window stitching (fold of overlapping fragments)
//! 2. Frequency aggregation (daily to weekly and monthly)
//! 3. Seasonal decomposition
//! 4. Index construction (normalized reduction with composite adjustment)

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use attnlab_core::domain::{Frequency, KeywordTable};
use attnlab_core::plan::plan_windows;
use attnlab_core::series::{
    aggregate, build_index, seasonally_adjust, stitch, IndexSettings, Reduction, SeasonalMode,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

fn make_series(days: usize, keywords: usize) -> KeywordTable {
    let dates = (0..days as u64).map(|i| base_date() + Days::new(i)).collect();
    let names = (0..keywords).map(|k| format!("kw{k}")).collect();
    let columns = (0..keywords)
        .map(|k| {
            (0..days)
                .map(|t| 40.0 + 0.02 * t as f64 + 5.0 * ((t + k) as f64 * 0.9).sin())
                .collect()
        })
        .collect();
    KeywordTable::new(dates, names, columns).unwrap()
}

fn make_fragments(days: usize, keywords: usize) -> Vec<KeywordTable> {
    let full = make_series(days, keywords);
    let end = base_date() + Days::new(days as u64 - 1);
    plan_windows(base_date(), end, 260, 45)
        .unwrap()
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let dates: Vec<NaiveDate> = full
                .dates()
                .iter()
                .copied()
                .filter(|d| w.contains(*d))
                .collect();
            let scale = 1.0 / (1.0 + i as f64 * 0.1);
            let part = full.restrict_to(&dates);
            part.scale_columns(&vec![scale; keywords])
        })
        .collect()
}

// ── 1. Stitching ─────────────────────────────────────────────────────

fn bench_stitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("stitch");
    for years in [2usize, 5, 10] {
        let fragments = make_fragments(years * 365, 10);
        group.bench_with_input(BenchmarkId::from_parameter(years), &fragments, |b, f| {
            b.iter(|| stitch(black_box(f)).unwrap())
        });
    }
    group.finish();
}

// ── 2. Aggregation ───────────────────────────────────────────────────

fn bench_aggregate(c: &mut Criterion) {
    let series = make_series(10 * 365, 20);
    c.bench_function("aggregate_weekly_10y_20kw", |b| {
        b.iter(|| aggregate(black_box(&series), Frequency::Weekly))
    });
    c.bench_function("aggregate_monthly_10y_20kw", |b| {
        b.iter(|| aggregate(black_box(&series), Frequency::Monthly))
    });
}

// ── 3. Seasonal decomposition ────────────────────────────────────────

fn bench_seasonal(c: &mut Criterion) {
    let series = make_series(10 * 365, 1);
    let values = series.columns()[0].clone();
    c.bench_function("seasonal_adjust_daily_10y", |b| {
        b.iter(|| seasonally_adjust(black_box(&values), 7).unwrap())
    });
}

// ── 4. Index construction ────────────────────────────────────────────

fn bench_index(c: &mut Criterion) {
    let trends = aggregate(&make_series(10 * 365, 20), Frequency::Weekly);
    let settings = IndexSettings {
        name: "bench".into(),
        reduction: Reduction::NormalizedThenSummed,
        seasonal: SeasonalMode::Both,
        period: 52,
    };
    c.bench_function("build_index_weekly_10y_20kw", |b| {
        b.iter(|| build_index(black_box(trends.clone()), &settings).unwrap())
    });
}

criterion_group!(benches, bench_stitch, bench_aggregate, bench_seasonal, bench_index);
criterion_main!(benches);
