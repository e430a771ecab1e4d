//! CSV artifacts.

use std::path::Path;

use attnlab_core::{AdjustmentFactor, BatchFactor, IndexSeries, KeywordTable};

use super::ExportError;

/// `date,<keyword>...`, one row per date.
pub fn write_table_csv(path: &Path, table: &KeywordTable) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    let header = std::iter::once("date").chain(table.keywords().iter().map(String::as_str));
    wtr.write_record(header)?;
    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(table.keywords().len() + 1);
        record.push(date.to_string());
        record.extend(table.columns().iter().map(|col| col[row].to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(super::io_error(path))?;
    Ok(())
}

pub fn write_index_csv(path: &Path, index: &IndexSeries) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["date", index.name.as_str()])?;
    for (date, value) in index.dates.iter().zip(&index.values) {
        wtr.write_record([date.to_string(), value.to_string()])?;
    }
    wtr.flush().map_err(super::io_error(path))?;
    Ok(())
}

/// One row per (window, keyword).
pub fn write_adjustments_csv(path: &Path, adjustments: &[AdjustmentFactor]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "window_index",
        "overlap_days",
        "keyword",
        "running_mean",
        "fragment_mean",
        "ratio",
    ])?;
    for adjustment in adjustments {
        for ratio in &adjustment.ratios {
            wtr.write_record([
                adjustment.window_index.to_string(),
                adjustment.overlap_days.to_string(),
                ratio.keyword.clone(),
                ratio.running_mean.to_string(),
                ratio.fragment_mean.to_string(),
                ratio.ratio.to_string(),
            ])?;
        }
    }
    wtr.flush().map_err(super::io_error(path))?;
    Ok(())
}

pub fn write_batch_factors_csv(path: &Path, factors: &[BatchFactor]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["window_index", "batch_index", "benchmark", "factor"])?;
    for factor in factors {
        wtr.write_record([
            factor.window_index.to_string(),
            factor.batch_index.to_string(),
            factor.benchmark.clone(),
            factor.factor.to_string(),
        ])?;
    }
    wtr.flush().map_err(super::io_error(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use attnlab_core::KeywordRatio;
    use chrono::NaiveDate;

    #[test]
    fn table_csv_has_date_then_keywords() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let d = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let table = KeywordTable::new(
            vec![d],
            vec!["a".into(), "b c".into()],
            vec![vec![1.5], vec![2.0]],
        )
        .unwrap();
        write_table_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,a,b c\n2024-03-04,1.5,2\n");
    }

    #[test]
    fn adjustments_flatten_per_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adj.csv");
        let adjustment = AdjustmentFactor {
            window_index: 1,
            overlap_days: 45,
            ratios: vec![
                KeywordRatio {
                    keyword: "a".into(),
                    running_mean: 80.0,
                    fragment_mean: 20.0,
                    ratio: 4.0,
                },
                KeywordRatio {
                    keyword: "b".into(),
                    running_mean: 10.0,
                    fragment_mean: 20.0,
                    ratio: 1.0,
                },
            ],
        };
        write_adjustments_csv(&path, &[adjustment]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1,45,a,80,20,4");
    }
}
