//! Domain types shared by every pipeline stage.
//!
//! - `DateWindow`: one request's date range
//! - `Frequency`: output resolution and its period-completeness rules
//! - `KeywordTable`: dated table with one `f64` column per keyword. Used for
//!   raw fragments, the stitched daily series and the aggregated trends.
//! - `IndexSeries`: the terminal one-column index
//! - `AdjustmentFactor` / `BatchFactor`: audit records of every rescaling

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// A contiguous, inclusive `[start, end]` date range for one source request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `end - start` in days. A window holds `span_days() + 1` calendar days.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.end)
    }
}

/// Output resolution of the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
        }
    }

    /// First day of the period containing `date`.
    ///
    /// Weeks start on Monday.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::Weekly => {
                date - Days::new(u64::from(date.weekday().num_days_from_monday()))
            }
            Frequency::Monthly => month_start(date),
            Frequency::Quarterly => {
                let mut start = month_start(date);
                for _ in 0..(date.month0() % 3) {
                    start = month_start(start - Days::new(1));
                }
                start
            }
        }
    }

    /// Whether a bucket holding `day_count` daily rows is a full period.
    ///
    /// Quarters only need 84 days (three 28-day months) so that quarters
    /// containing a short February are not rejected.
    pub fn is_complete(&self, period_start: NaiveDate, day_count: usize) -> bool {
        match self {
            Frequency::Daily => day_count == 1,
            Frequency::Weekly => day_count == 7,
            Frequency::Monthly => day_count as u32 == days_in_month(period_start),
            Frequency::Quarterly => day_count >= 84,
        }
    }

    /// Number of observations in one seasonal cycle at this resolution.
    pub fn seasonal_period(&self) -> usize {
        match self {
            Frequency::Daily => 7,
            Frequency::Weekly => 52,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            "quarterly" | "q" => Ok(Frequency::Quarterly),
            other => Err(format!(
                "unknown frequency '{other}' (expected daily, weekly, monthly or quarterly)"
            )),
        }
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Number of calendar days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let start = month_start(date);
    let next = month_start(start + Days::new(31));
    (next - start).num_days() as u32
}

/// Dated table with one `f64` column per keyword.
///
/// Dates are strictly increasing and every column has one value per date.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTable {
    dates: Vec<NaiveDate>,
    keywords: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl KeywordTable {
    /// Build a table, validating its shape.
    pub fn new(
        dates: Vec<NaiveDate>,
        keywords: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, IndexError> {
        if keywords.len() != columns.len() {
            return Err(IndexError::Shape(format!(
                "{} keywords but {} columns",
                keywords.len(),
                columns.len()
            )));
        }
        for (keyword, column) in keywords.iter().zip(&columns) {
            if column.len() != dates.len() {
                return Err(IndexError::Shape(format!(
                    "column '{keyword}' has {} values for {} dates",
                    column.len(),
                    dates.len()
                )));
            }
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(IndexError::Shape("dates must be strictly increasing".into()));
        }
        for (i, keyword) in keywords.iter().enumerate() {
            if keywords[..i].contains(keyword) {
                return Err(IndexError::Shape(format!("duplicate column '{keyword}'")));
            }
        }
        Ok(Self::from_parts(dates, keywords, columns))
    }

    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        keywords: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            dates,
            keywords,
            columns,
        }
    }

    /// A table with the given columns and no rows.
    pub fn empty(keywords: Vec<String>) -> Self {
        let columns = vec![Vec::new(); keywords.len()];
        Self::from_parts(Vec::new(), keywords, columns)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn keyword_index(&self, keyword: &str) -> Option<usize> {
        self.keywords.iter().position(|k| k == keyword)
    }

    pub fn column(&self, keyword: &str) -> Option<&[f64]> {
        self.keyword_index(keyword).map(|i| self.columns[i].as_slice())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn row_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Values of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[row]).collect()
    }

    /// Dates present in both tables, ascending.
    pub fn shared_dates(&self, other: &KeywordTable) -> Vec<NaiveDate> {
        let mut shared = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.dates.len() && j < other.dates.len() {
            match self.dates[i].cmp(&other.dates[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared.push(self.dates[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }

    /// Mean of column `col` over the given dates. Dates missing from the
    /// table are skipped; `None` when none are present.
    pub fn mean_on(&self, col: usize, dates: &[NaiveDate]) -> Option<f64> {
        let values: Vec<f64> = dates
            .iter()
            .filter_map(|d| self.row_index(*d))
            .map(|row| self.columns[col][row])
            .collect();
        crate::series::stats::mean(&values)
    }

    /// Copy of the table with column `i` multiplied by `factors[i]`.
    pub fn scale_columns(&self, factors: &[f64]) -> KeywordTable {
        let columns = self
            .columns
            .iter()
            .zip(factors)
            .map(|(col, f)| col.iter().map(|v| v * f).collect())
            .collect();
        Self::from_parts(self.dates.clone(), self.keywords.clone(), columns)
    }

    /// Copy of the table keeping only rows whose date is in `dates`.
    pub fn restrict_to(&self, dates: &[NaiveDate]) -> KeywordTable {
        let rows: Vec<usize> = dates.iter().filter_map(|d| self.row_index(*d)).collect();
        let columns = self
            .columns
            .iter()
            .map(|col| rows.iter().map(|&r| col[r]).collect())
            .collect();
        Self::from_parts(
            rows.iter().map(|&r| self.dates[r]).collect(),
            self.keywords.clone(),
            columns,
        )
    }

    /// Sum across columns for each row.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.len())
            .map(|row| self.columns.iter().map(|c| c[row]).sum())
            .collect()
    }

    /// Apply `f` to every column, keeping dates and keywords.
    pub fn try_map_columns<E>(
        &self,
        mut f: impl FnMut(&[f64]) -> Result<Vec<f64>, E>,
    ) -> Result<KeywordTable, E> {
        let columns = self
            .columns
            .iter()
            .map(|col| f(col))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self::from_parts(
            self.dates.clone(),
            self.keywords.clone(),
            columns,
        ))
    }

    /// Append the rows of `other` dated after this table's last date.
    ///
    /// Both tables must have the same columns in the same order. Returns the
    /// number of rows appended.
    pub(crate) fn extend_after(&mut self, other: &KeywordTable) -> usize {
        let first_new = match self.last_date() {
            Some(last) => other.dates.partition_point(|d| *d <= last),
            None => 0,
        };
        self.dates.extend_from_slice(&other.dates[first_new..]);
        for (mine, theirs) in self.columns.iter_mut().zip(&other.columns) {
            mine.extend_from_slice(&theirs[first_new..]);
        }
        other.dates.len() - first_new
    }

    pub(crate) fn column_mut(&mut self, col: usize) -> &mut [f64] {
        &mut self.columns[col]
    }

    /// Add a column aligned with the existing dates.
    pub(crate) fn push_column(&mut self, keyword: String, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.dates.len());
        self.keywords.push(keyword);
        self.columns.push(values);
    }
}

/// The final index: one value per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSeries {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl IndexSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rescaling applied to one keyword when a window was stitched on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRatio {
    pub keyword: String,
    /// Mean of the running series over the overlap.
    pub running_mean: f64,
    /// Mean of the incoming fragment over the overlap.
    pub fragment_mean: f64,
    /// Ratio actually applied (floored at 1.0).
    pub ratio: f64,
}

/// Cross-window adjustment for one window, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactor {
    pub window_index: usize,
    pub overlap_days: usize,
    pub ratios: Vec<KeywordRatio>,
}

impl AdjustmentFactor {
    pub fn ratio_for(&self, keyword: &str) -> Option<f64> {
        self.ratios
            .iter()
            .find(|r| r.keyword == keyword)
            .map(|r| r.ratio)
    }
}

/// Cross-batch adjustment applied inside one window, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFactor {
    pub window_index: usize,
    pub batch_index: usize,
    pub benchmark: String,
    pub factor: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table(start: NaiveDate, n: usize, values: &[(&str, f64)]) -> KeywordTable {
        let dates = (0..n).map(|i| start + Days::new(i as u64)).collect();
        KeywordTable::new(
            dates,
            values.iter().map(|(k, _)| k.to_string()).collect(),
            values.iter().map(|(_, v)| vec![*v; n]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn weekly_period_starts_on_monday() {
        // 2024-01-04 is a Thursday
        assert_eq!(Frequency::Weekly.period_start(d(2024, 1, 4)), d(2024, 1, 1));
        assert_eq!(Frequency::Weekly.period_start(d(2024, 1, 7)), d(2024, 1, 1));
        assert_eq!(Frequency::Weekly.period_start(d(2024, 1, 8)), d(2024, 1, 8));
    }

    #[test]
    fn quarterly_period_start() {
        assert_eq!(Frequency::Quarterly.period_start(d(2023, 3, 31)), d(2023, 1, 1));
        assert_eq!(Frequency::Quarterly.period_start(d(2023, 5, 15)), d(2023, 4, 1));
        assert_eq!(Frequency::Quarterly.period_start(d(2023, 12, 1)), d(2023, 10, 1));
        assert_eq!(Frequency::Quarterly.period_start(d(2023, 7, 1)), d(2023, 7, 1));
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(d(2024, 2, 10)), 29);
        assert_eq!(days_in_month(d(2023, 2, 10)), 28);
        assert_eq!(days_in_month(d(2023, 12, 31)), 31);
        assert_eq!(days_in_month(d(2023, 4, 1)), 30);
    }

    #[test]
    fn frequency_parses_short_and_long_names() {
        assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!("Q".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert!("hourly".parse::<Frequency>().is_err());
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let result = KeywordTable::new(
            vec![d(2024, 1, 1), d(2024, 1, 2)],
            vec!["a".into()],
            vec![vec![1.0]],
        );
        assert!(matches!(result, Err(IndexError::Shape(_))));
    }

    #[test]
    fn table_rejects_unsorted_dates() {
        let result = KeywordTable::new(
            vec![d(2024, 1, 2), d(2024, 1, 1)],
            vec!["a".into()],
            vec![vec![1.0, 2.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn shared_dates_is_the_intersection() {
        let a = table(d(2024, 1, 1), 10, &[("x", 1.0)]);
        let b = table(d(2024, 1, 6), 10, &[("x", 1.0)]);
        let shared = a.shared_dates(&b);
        assert_eq!(shared.len(), 5);
        assert_eq!(shared[0], d(2024, 1, 6));
        assert_eq!(*shared.last().unwrap(), d(2024, 1, 10));
    }

    #[test]
    fn extend_after_skips_existing_dates() {
        let mut a = table(d(2024, 1, 1), 10, &[("x", 1.0)]);
        let b = table(d(2024, 1, 6), 10, &[("x", 2.0)]);
        let appended = a.extend_after(&b);
        assert_eq!(appended, 5);
        assert_eq!(a.len(), 15);
        assert_eq!(a.column("x").unwrap()[9], 1.0);
        assert_eq!(a.column("x").unwrap()[10], 2.0);
    }

    #[test]
    fn row_sums_add_columns() {
        let t = table(d(2024, 1, 1), 3, &[("x", 1.0), ("y", 2.5)]);
        assert_eq!(t.row_sums(), vec![3.5, 3.5, 3.5]);
    }
}
