//! Offline interest source backed by an absolute ground-truth series.
//!
//! Answers requests the way the live source does: caps on keywords and
//! range length, the 0..=100 integer scale relative to the request's own
//! maximum, " + " combined terms and an optional trailing partial period.
//! Used by the CLI for offline runs and by tests that check stitching
//! recovers the ground truth.

use std::f64::consts::PI;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::source::{InterestRow, InterestSource, InterestTable, SourceError};
use crate::domain::DateWindow;
use crate::plan::keywords::COMBINE_SEPARATOR;

/// Default per-request keyword cap, matching the live source.
pub const DEFAULT_KEYWORD_CAP: usize = 5;
/// Default per-request span cap in days. The live source switches to coarser
/// data somewhere past 270 days.
pub const DEFAULT_DAY_CAP: i64 = 270;

pub struct SimulatedSource {
    name: String,
    dates: Vec<NaiveDate>,
    series: Vec<(String, Vec<f64>)>,
    keyword_cap: usize,
    day_cap: i64,
    partial_from: Option<NaiveDate>,
    requests: AtomicUsize,
}

impl SimulatedSource {
    /// Build from absolute (unscaled) daily values per keyword.
    pub fn new(
        dates: Vec<NaiveDate>,
        series: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, SourceError> {
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SourceError::MalformedResponse(
                "ground-truth dates must be strictly increasing".into(),
            ));
        }
        for (keyword, values) in &series {
            if values.len() != dates.len() {
                return Err(SourceError::MalformedResponse(format!(
                    "ground truth for '{keyword}' has {} values for {} dates",
                    values.len(),
                    dates.len()
                )));
            }
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(SourceError::MalformedResponse(format!(
                    "ground truth for '{keyword}' contains negative or non-finite values"
                )));
            }
        }
        Ok(Self {
            name: "simulated".into(),
            dates,
            series,
            keyword_cap: DEFAULT_KEYWORD_CAP,
            day_cap: DEFAULT_DAY_CAP,
            partial_from: None,
            requests: AtomicUsize::new(0),
        })
    }

    /// Load ground truth from CSV with a `date` column followed by one
    /// numeric column per keyword.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| SourceError::MalformedResponse(format!("CSV header: {e}")))?
            .clone();
        if headers.len() < 2 || !headers[0].eq_ignore_ascii_case("date") {
            return Err(SourceError::MalformedResponse(
                "expected a 'date' column followed by keyword columns".into(),
            ));
        }
        let keywords: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut dates = Vec::new();
        let mut columns = vec![Vec::new(); keywords.len()];

        for (line, record) in rdr.records().enumerate() {
            let record = record
                .map_err(|e| SourceError::MalformedResponse(format!("CSV row {}: {e}", line + 1)))?;
            let date = NaiveDate::parse_from_str(record[0].trim(), "%Y-%m-%d").map_err(|e| {
                SourceError::MalformedResponse(format!("CSV row {}: bad date: {e}", line + 1))
            })?;
            dates.push(date);
            for (col, field) in columns.iter_mut().zip(record.iter().skip(1)) {
                let value: f64 = field.trim().parse().map_err(|_| {
                    SourceError::MalformedResponse(format!(
                        "CSV row {}: '{field}' is not a number",
                        line + 1
                    ))
                })?;
                col.push(value);
            }
        }

        Self::new(dates, keywords.into_iter().zip(columns).collect())
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path)
            .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))?;
        let mut source = Self::from_csv_reader(file)?;
        source.name = format!("simulated:{}", path.display());
        Ok(source)
    }

    /// Seeded synthetic ground truth: level, drift, weekly and yearly cycles
    /// plus noise, kept strictly positive.
    pub fn synthetic(
        keywords: &[String],
        start: NaiveDate,
        end: NaiveDate,
        seed: u64,
    ) -> Result<Self, SourceError> {
        if end < start {
            return Err(SourceError::Other(format!(
                "synthetic range ends ({end}) before it starts ({start})"
            )));
        }
        let days = (end - start).num_days() as u64 + 1;
        let dates: Vec<NaiveDate> = (0..days).map(|i| start + Days::new(i)).collect();
        let mut rng = StdRng::seed_from_u64(seed);

        let series = keywords
            .iter()
            .map(|keyword| {
                let base = rng.gen_range(10.0..60.0);
                let drift = rng.gen_range(-0.01..0.03);
                let weekly = base * rng.gen_range(0.05..0.25);
                let yearly = base * rng.gen_range(0.0..0.3);
                let phase = rng.gen_range(0.0..(2.0 * PI));
                let values = (0..days)
                    .map(|t| {
                        let t = t as f64;
                        let noise = base * rng.gen_range(-0.1..0.1);
                        let v = base
                            + drift * t
                            + weekly * (2.0 * PI * t / 7.0 + phase).sin()
                            + yearly * (2.0 * PI * t / 365.25).sin()
                            + noise;
                        v.max(0.5)
                    })
                    .collect();
                (keyword.clone(), values)
            })
            .collect();

        let mut source = Self::new(dates, series)?;
        source.name = format!("synthetic:{seed}");
        Ok(source)
    }

    pub fn with_limits(mut self, keyword_cap: usize, day_cap: i64) -> Self {
        self.keyword_cap = keyword_cap;
        self.day_cap = day_cap;
        self
    }

    /// Flag every row dated on or after `date` as partial.
    pub fn with_partial_from(mut self, date: NaiveDate) -> Self {
        self.partial_from = Some(date);
        self
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|(k, _)| k.as_str())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Absolute ground-truth values for a keyword or combined term.
    pub fn truth(&self, keyword: &str) -> Result<Vec<f64>, SourceError> {
        self.resolve(keyword, 0..self.dates.len())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of `fetch` calls answered so far, failed ones included.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn resolve(&self, keyword: &str, rows: std::ops::Range<usize>) -> Result<Vec<f64>, SourceError> {
        let mut total = vec![0.0; rows.len()];
        for part in keyword.split(COMBINE_SEPARATOR) {
            let part = part.trim();
            let (_, values) = self
                .series
                .iter()
                .find(|(k, _)| k == part)
                .ok_or_else(|| SourceError::UnknownKeyword(part.to_string()))?;
            for (t, v) in total.iter_mut().zip(&values[rows.clone()]) {
                *t += v;
            }
        }
        Ok(total)
    }
}

impl InterestSource for SimulatedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(
        &self,
        keywords: &[String],
        _region: &str,
        window: DateWindow,
    ) -> Result<InterestTable, SourceError> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        if keywords.is_empty() {
            return Err(SourceError::Other("request names no keywords".into()));
        }
        if keywords.len() > self.keyword_cap {
            return Err(SourceError::TooManyKeywords {
                requested: keywords.len(),
                cap: self.keyword_cap,
            });
        }
        let days = window.span_days();
        if days > self.day_cap {
            return Err(SourceError::RangeTooLong {
                window,
                days,
                cap: self.day_cap,
            });
        }

        let lo = self.dates.partition_point(|d| *d < window.start);
        let hi = self.dates.partition_point(|d| *d <= window.end);
        let raw = keywords
            .iter()
            .map(|k| self.resolve(k, lo..hi))
            .collect::<Result<Vec<_>, _>>()?;

        let max = raw
            .iter()
            .flat_map(|col| col.iter().copied())
            .fold(0.0_f64, f64::max);
        let scale = if max > 0.0 { 100.0 / max } else { 0.0 };

        let rows = (lo..hi)
            .enumerate()
            .map(|(i, row)| {
                let date = self.dates[row];
                InterestRow {
                    date,
                    values: raw
                        .iter()
                        .map(|col| (col[i] * scale).round().clamp(0.0, 100.0) as u8)
                        .collect(),
                    is_partial: self.partial_from.is_some_and(|p| date >= p),
                }
            })
            .collect();

        Ok(InterestTable {
            keywords: keywords.to_vec(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn kws(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn small_source() -> SimulatedSource {
        let dates: Vec<NaiveDate> = (0..10).map(|i| d(2024, 1, 1) + Days::new(i)).collect();
        SimulatedSource::new(
            dates,
            vec![
                ("a".into(), vec![10.0; 10]),
                ("b".into(), (1..=10).map(|v| v as f64 * 2.0).collect()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn fetch_scales_request_max_to_100() {
        let src = small_source();
        let table = src
            .fetch(&kws(&["a", "b"]), "", DateWindow::new(d(2024, 1, 1), d(2024, 1, 10)))
            .unwrap();
        assert_eq!(table.rows.len(), 10);
        // b peaks at 20 on the last day
        assert_eq!(table.rows[9].values[1], 100);
        assert_eq!(table.rows[0].values[0], 50);
    }

    #[test]
    fn scaling_is_relative_to_the_request() {
        let src = small_source();
        let table = src
            .fetch(&kws(&["a"]), "", DateWindow::new(d(2024, 1, 1), d(2024, 1, 5)))
            .unwrap();
        assert!(table.rows.iter().all(|r| r.values[0] == 100));
    }

    #[test]
    fn combined_terms_sum_components() {
        let src = small_source();
        let table = src
            .fetch(&kws(&["a + b"]), "", DateWindow::new(d(2024, 1, 1), d(2024, 1, 10)))
            .unwrap();
        // a+b goes 12..30, max 30 on the last day
        assert_eq!(table.rows[9].values[0], 100);
        assert_eq!(table.rows[0].values[0], 40);
    }

    #[test]
    fn caps_are_enforced() {
        let src = small_source().with_limits(1, 3);
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 3));
        assert!(matches!(
            src.fetch(&kws(&["a", "b"]), "", window),
            Err(SourceError::TooManyKeywords { requested: 2, cap: 1 })
        ));
        let long = DateWindow::new(d(2024, 1, 1), d(2024, 1, 8));
        assert!(matches!(
            src.fetch(&kws(&["a"]), "", long),
            Err(SourceError::RangeTooLong { days: 7, .. })
        ));
        assert_eq!(src.request_count(), 2);
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let src = small_source();
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 3));
        assert!(matches!(
            src.fetch(&kws(&["nope"]), "", window),
            Err(SourceError::UnknownKeyword(_))
        ));
    }

    #[test]
    fn partial_tail_is_flagged() {
        let src = small_source().with_partial_from(d(2024, 1, 10));
        let table = src
            .fetch(&kws(&["a"]), "", DateWindow::new(d(2024, 1, 1), d(2024, 1, 10)))
            .unwrap();
        assert_eq!(table.complete_rows().count(), 9);
        assert!(table.rows[9].is_partial);
    }

    #[test]
    fn csv_ground_truth_loads() {
        let csv = "date,x,y\n2024-01-01,1.5,3\n2024-01-02,2,4\n";
        let src = SimulatedSource::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(src.keywords().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(src.truth("y").unwrap(), vec![3.0, 4.0]);
        assert_eq!(src.first_date(), Some(d(2024, 1, 1)));
    }

    #[test]
    fn csv_rejects_non_numeric_values() {
        let csv = "date,x\n2024-01-01,lots\n";
        assert!(matches!(
            SimulatedSource::from_csv_reader(csv.as_bytes()),
            Err(SourceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn synthetic_is_deterministic_per_seed() {
        let k = kws(&["p", "q"]);
        let a = SimulatedSource::synthetic(&k, d(2024, 1, 1), d(2024, 3, 1), 7).unwrap();
        let b = SimulatedSource::synthetic(&k, d(2024, 1, 1), d(2024, 3, 1), 7).unwrap();
        let c = SimulatedSource::synthetic(&k, d(2024, 1, 1), d(2024, 3, 1), 8).unwrap();
        assert_eq!(a.truth("q").unwrap(), b.truth("q").unwrap());
        assert_ne!(a.truth("q").unwrap(), c.truth("q").unwrap());
        assert!(a.truth("p").unwrap().iter().all(|v| *v >= 0.5));
    }
}
