//! Resampling the stitched daily series to the output frequency.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{Frequency, KeywordTable};

/// Average each column within complete periods of `frequency`.
///
/// Daily input passes through unchanged. Periods are labelled by their first
/// day; partially covered periods at either end are dropped.
pub fn aggregate(series: &KeywordTable, frequency: Frequency) -> KeywordTable {
    if frequency == Frequency::Daily {
        return series.clone();
    }

    let width = series.keywords().len();
    let mut buckets: BTreeMap<NaiveDate, (usize, Vec<f64>)> = BTreeMap::new();
    for (row, date) in series.dates().iter().enumerate() {
        let (count, sums) = buckets
            .entry(frequency.period_start(*date))
            .or_insert_with(|| (0, vec![0.0; width]));
        *count += 1;
        for (sum, column) in sums.iter_mut().zip(series.columns()) {
            *sum += column[row];
        }
    }

    let mut dates = Vec::new();
    let mut columns = vec![Vec::new(); width];
    for (period, (count, sums)) in buckets {
        if !frequency.is_complete(period, count) {
            tracing::debug!(%period, count, %frequency, "dropping incomplete period");
            continue;
        }
        dates.push(period);
        for (column, sum) in columns.iter_mut().zip(sums) {
            column.push(sum / count as f64);
        }
    }

    KeywordTable::from_parts(dates, series.keywords().to_vec(), columns)
}
