//! Reducing the aggregated trends to a single standardized index.

use serde::{Deserialize, Serialize};

use super::seasonal::seasonally_adjust;
use super::stats::zscore;
use crate::domain::{IndexSeries, KeywordTable};
use crate::error::IndexError;

/// How keyword columns are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Sum the columns, then standardize.
    #[default]
    Standard,
    /// Standardize each column, sum, then standardize again.
    #[serde(alias = "normalized")]
    NormalizedThenSummed,
}

impl Reduction {
    pub fn label(&self) -> &'static str {
        match self {
            Reduction::Standard => "standard",
            Reduction::NormalizedThenSummed => "normalized",
        }
    }
}

/// Where seasonal adjustment is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalMode {
    None,
    /// Each keyword column before reduction.
    PerKeyword,
    /// The summed series before the final standardization.
    #[default]
    Composite,
    /// Both of the above.
    Both,
}

impl SeasonalMode {
    pub fn per_keyword(&self) -> bool {
        matches!(self, SeasonalMode::PerKeyword | SeasonalMode::Both)
    }

    pub fn composite(&self) -> bool {
        matches!(self, SeasonalMode::Composite | SeasonalMode::Both)
    }
}

impl std::str::FromStr for SeasonalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(SeasonalMode::None),
            "per_keyword" | "per-keyword" => Ok(SeasonalMode::PerKeyword),
            "composite" => Ok(SeasonalMode::Composite),
            "both" => Ok(SeasonalMode::Both),
            other => Err(format!(
                "unknown seasonal mode '{other}' (expected none, per_keyword, composite or both)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub name: String,
    pub reduction: Reduction,
    pub seasonal: SeasonalMode,
    /// Observations per seasonal cycle.
    pub period: usize,
}

#[derive(Debug, Clone)]
pub struct IndexOutput {
    pub index: IndexSeries,
    /// Aggregated trends, before any seasonal adjustment.
    pub trends: KeywordTable,
    /// Trends with each column seasonally adjusted. `None` when the series
    /// is shorter than two seasonal cycles.
    pub trends_sa: Option<KeywordTable>,
    /// Why `trends_sa` is missing, if it is.
    pub trends_sa_error: Option<String>,
    /// Whether the summed series was seasonally adjusted. `false` when the
    /// mode asks for it but the series is too short.
    pub composite_adjusted: bool,
}

/// Build the index from aggregated trends.
///
/// An empty `trends` table yields an empty index; deciding whether that is a
/// problem is the caller's business.
pub fn build_index(trends: KeywordTable, settings: &IndexSettings) -> Result<IndexOutput, IndexError> {
    if trends.is_empty() {
        return Ok(IndexOutput {
            index: IndexSeries {
                name: settings.name.clone(),
                dates: Vec::new(),
                values: Vec::new(),
            },
            trends,
            trends_sa: None,
            trends_sa_error: Some("no complete periods".into()),
            composite_adjusted: false,
        });
    }

    let (trends_sa, sa_error) =
        match trends.try_map_columns(|col| seasonally_adjust(col, settings.period)) {
            Ok(t) => (Some(t), None),
            Err(e) => (None, Some(e)),
        };

    let base = match (&trends_sa, settings.seasonal.per_keyword()) {
        (Some(adjusted), true) => adjusted,
        (None, true) => {
            return Err(sa_error.unwrap_or_else(|| {
                IndexError::DegenerateIndex("per-keyword seasonal adjustment unavailable".into())
            }))
        }
        (_, false) => &trends,
    };
    let trends_sa_error = sa_error.map(|e| e.to_string());

    let mut summed = match settings.reduction {
        Reduction::Standard => base.row_sums(),
        Reduction::NormalizedThenSummed => {
            let mut total = vec![0.0; base.len()];
            for column in base.columns() {
                // a constant column carries no signal
                let z = zscore(column).unwrap_or_else(|| vec![0.0; column.len()]);
                for (t, v) in total.iter_mut().zip(z) {
                    *t += v;
                }
            }
            total
        }
    };

    let mut composite_adjusted = false;
    if settings.seasonal.composite() {
        match seasonally_adjust(&summed, settings.period) {
            Ok(adjusted) => {
                summed = adjusted;
                composite_adjusted = true;
            }
            // too short to adjust: standardize the raw sum
            Err(IndexError::SeriesTooShort { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    let values = zscore(&summed).ok_or_else(|| {
        IndexError::DegenerateIndex(format!(
            "{} period(s) with no variation to standardize",
            summed.len()
        ))
    })?;

    Ok(IndexOutput {
        index: IndexSeries {
            name: settings.name.clone(),
            dates: trends.dates().to_vec(),
            values,
        },
        trends,
        trends_sa,
        trends_sa_error,
        composite_adjusted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::stats::{mean, sample_std};
    use chrono::{Days, NaiveDate};

    fn table(columns: Vec<Vec<f64>>) -> KeywordTable {
        let n = columns[0].len() as u64;
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..n).map(|i| start + Days::new(i)).collect();
        let keywords = (0..columns.len()).map(|i| format!("k{i}")).collect();
        KeywordTable::new(dates, keywords, columns).unwrap()
    }

    fn settings(reduction: Reduction, seasonal: SeasonalMode) -> IndexSettings {
        IndexSettings {
            name: "test".into(),
            reduction,
            seasonal,
            period: 7,
        }
    }

    fn wavy(n: usize, scale: f64, offset: f64) -> Vec<f64> {
        (0..n)
            .map(|i| offset + scale * ((i as f64) * 0.3).sin() + (i % 7) as f64)
            .collect()
    }

    #[test]
    fn standard_index_is_standardized() {
        let t = table(vec![wavy(60, 5.0, 20.0), wavy(60, 2.0, 40.0)]);
        let out = build_index(t, &settings(Reduction::Standard, SeasonalMode::None)).unwrap();
        assert_eq!(out.index.len(), 60);
        assert!(mean(&out.index.values).unwrap().abs() < 1e-9);
        assert!((sample_std(&out.index.values).unwrap() - 1.0).abs() < 1e-9);
        assert!(out.trends_sa.is_some());
    }

    #[test]
    fn normalized_reduction_ignores_column_scale() {
        let a = wavy(40, 5.0, 20.0);
        let scaled_b: Vec<f64> = wavy(40, 1.0, 3.0).iter().map(|v| v * 100.0).collect();
        let b = wavy(40, 1.0, 3.0);
        let s = settings(Reduction::NormalizedThenSummed, SeasonalMode::None);
        let one = build_index(table(vec![a.clone(), b]), &s).unwrap();
        let two = build_index(table(vec![a, scaled_b]), &s).unwrap();
        for (x, y) in one.index.values.iter().zip(&two.index.values) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_column_contributes_zero_when_normalized() {
        let t = table(vec![wavy(30, 5.0, 20.0), vec![42.0; 30]]);
        let out = build_index(t, &settings(Reduction::NormalizedThenSummed, SeasonalMode::None));
        assert!(out.is_ok());
    }

    #[test]
    fn composite_seasonal_removes_weekly_cycle() {
        let values: Vec<f64> = (0..56).map(|i| 10.0 + (i % 7) as f64 + 0.1 * i as f64).collect();
        let out = build_index(
            table(vec![values]),
            &settings(Reduction::Standard, SeasonalMode::Composite),
        )
        .unwrap();
        // trend is linear, so the adjusted index is monotonic
        assert!(out.index.values.windows(2).all(|w| w[1] > w[0]));
        assert!(out.composite_adjusted);
    }

    #[test]
    fn short_series_skips_trends_sa_but_builds_index() {
        let t = table(vec![vec![1.0, 3.0, 2.0, 5.0, 4.0]]);
        let out = build_index(t, &settings(Reduction::Standard, SeasonalMode::None)).unwrap();
        assert!(out.trends_sa.is_none());
        assert!(out.trends_sa_error.is_some());
        assert_eq!(out.index.len(), 5);
    }

    #[test]
    fn short_series_standardizes_unadjusted_composite() {
        let raw = vec![1.0, 3.0, 2.0, 5.0, 4.0];
        let t = table(vec![raw.clone()]);
        let out = build_index(t, &settings(Reduction::Standard, SeasonalMode::Composite)).unwrap();
        assert!(!out.composite_adjusted);
        assert!(out.trends_sa.is_none());
        assert_eq!(out.index.values, zscore(&raw).unwrap());
    }

    #[test]
    fn short_series_with_per_keyword_mode_fails() {
        for mode in [SeasonalMode::PerKeyword, SeasonalMode::Both] {
            let t = table(vec![vec![1.0, 3.0, 2.0, 5.0, 4.0]]);
            let err = build_index(t, &settings(Reduction::Standard, mode)).unwrap_err();
            assert!(matches!(err, IndexError::SeriesTooShort { .. }));
        }
    }

    #[test]
    fn constant_sum_is_degenerate() {
        let t = table(vec![vec![5.0; 20], vec![5.0; 20]]);
        let err = build_index(t, &settings(Reduction::Standard, SeasonalMode::None)).unwrap_err();
        assert!(matches!(err, IndexError::DegenerateIndex(_)));
    }

    #[test]
    fn empty_trends_give_empty_index() {
        let t = KeywordTable::empty(vec!["a".into()]);
        let out = build_index(t, &settings(Reduction::Standard, SeasonalMode::Composite)).unwrap();
        assert!(out.index.is_empty());
        assert!(out.trends_sa.is_none());
    }
}
