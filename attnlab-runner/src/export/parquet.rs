//! Parquet artifacts. Dates are stored as a polars `Date` column.

use std::fs::File;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use attnlab_core::{IndexSeries, KeywordTable};

use super::ExportError;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn epoch_days(dates: &[NaiveDate]) -> Vec<i32> {
    dates
        .iter()
        .map(|d| d.num_days_from_ce() - EPOCH_DAYS_FROM_CE)
        .collect()
}

fn date_column(dates: &[NaiveDate]) -> Result<Column, ExportError> {
    Column::new("date".into(), epoch_days(dates))
        .cast(&DataType::Date)
        .map_err(|e| ExportError::Parquet(format!("date cast: {e}")))
}

fn write(path: &Path, df: &mut DataFrame) -> Result<(), ExportError> {
    let file = File::create(path).map_err(super::io_error(path))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| ExportError::Parquet(format!("write {}: {e}", path.display())))?;
    Ok(())
}

pub fn write_index_parquet(path: &Path, index: &IndexSeries) -> Result<(), ExportError> {
    let mut df = DataFrame::new(vec![
        date_column(&index.dates)?,
        Column::new("index".into(), index.values.clone()),
    ])
    .map_err(|e| ExportError::Parquet(format!("dataframe creation: {e}")))?;
    write(path, &mut df)
}

pub fn write_table_parquet(path: &Path, table: &KeywordTable) -> Result<(), ExportError> {
    let mut columns = Vec::with_capacity(table.keywords().len() + 1);
    columns.push(date_column(table.dates())?);
    for (keyword, values) in table.keywords().iter().zip(table.columns()) {
        columns.push(Column::new(keyword.as_str().into(), values.clone()));
    }
    let mut df = DataFrame::new(columns)
        .map_err(|e| ExportError::Parquet(format!("dataframe creation: {e}")))?;
    write(path, &mut df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_offset_matches_unix_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(epoch_days(&[epoch]), vec![0]);
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(epoch_days(&[d]), vec![(d - epoch).num_days() as i32]);
    }

    #[test]
    fn trends_parquet_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trends.parquet");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let table = KeywordTable::new(
            vec![start, start.succ_opt().unwrap()],
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap();
        write_table_parquet(&path, &table).unwrap();

        let df = ParquetReader::new(File::open(&path).unwrap()).finish().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names_str(), vec!["date", "a", "b"]);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    }
}
