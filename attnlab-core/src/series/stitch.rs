//! Folding window fragments into one continuous daily series.
//!
//! Each new fragment is rescaled per keyword by the ratio of the running
//! series' mean to the fragment's mean over their shared dates, then only its
//! rows dated after the running series' last date are appended.
//!
//! Ratios below 1.0 are floored at 1.0 so a later window is never scaled
//! down. This is a heuristic carried over deliberately: it keeps late
//! windows from collapsing when the overlap happens to sit on a spike, at the
//! cost of exact recovery in that case.

use crate::domain::{AdjustmentFactor, KeywordRatio, KeywordTable};
use crate::error::IndexError;

#[derive(Debug, Clone)]
pub struct StitchResult {
    pub series: KeywordTable,
    pub adjustments: Vec<AdjustmentFactor>,
}

/// Incremental stitcher: push fragments in window order, then `finish`.
#[derive(Debug, Default)]
pub struct WindowStitcher {
    running: Option<KeywordTable>,
    adjustments: Vec<AdjustmentFactor>,
    pushed: usize,
}

impl WindowStitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the next fragment in. Returns the adjustment applied and the
    /// number of rows appended, or `None` for the first fragment.
    pub fn push(
        &mut self,
        fragment: &KeywordTable,
    ) -> Result<Option<(&AdjustmentFactor, usize)>, IndexError> {
        let window_index = self.pushed;
        self.pushed += 1;

        let Some(running) = self.running.as_mut() else {
            self.running = Some(fragment.clone());
            return Ok(None);
        };

        if running.keywords() != fragment.keywords() {
            return Err(IndexError::Shape(format!(
                "window {window_index} has columns {:?}, expected {:?}",
                fragment.keywords(),
                running.keywords()
            )));
        }

        let shared = running.shared_dates(fragment);
        if shared.is_empty() {
            return Err(IndexError::DisjointWindows { window_index });
        }

        let ratios: Vec<KeywordRatio> = running
            .keywords()
            .iter()
            .enumerate()
            .map(|(col, keyword)| {
                let running_mean = running.mean_on(col, &shared).unwrap_or(0.0);
                let fragment_mean = fragment.mean_on(col, &shared).unwrap_or(0.0);
                let raw = if fragment_mean > 0.0 {
                    running_mean / fragment_mean
                } else {
                    1.0
                };
                KeywordRatio {
                    keyword: keyword.clone(),
                    running_mean,
                    fragment_mean,
                    ratio: raw.max(1.0),
                }
            })
            .collect();

        let factors: Vec<f64> = ratios.iter().map(|r| r.ratio).collect();
        let appended = running.extend_after(&fragment.scale_columns(&factors));

        self.adjustments.push(AdjustmentFactor {
            window_index,
            overlap_days: shared.len(),
            ratios,
        });
        Ok(self.adjustments.last().map(|a| (a, appended)))
    }

    pub fn finish(self) -> Result<StitchResult, IndexError> {
        let series = self
            .running
            .ok_or_else(|| IndexError::InvalidPlan("no fragments to stitch".into()))?;
        Ok(StitchResult {
            series,
            adjustments: self.adjustments,
        })
    }
}

/// Stitch a complete list of fragments.
pub fn stitch(fragments: &[KeywordTable]) -> Result<StitchResult, IndexError> {
    let mut stitcher = WindowStitcher::new();
    for fragment in fragments {
        stitcher.push(fragment)?;
    }
    stitcher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn frag(offset: u64, values: Vec<f64>) -> KeywordTable {
        let dates = (0..values.len() as u64)
            .map(|i| start() + Days::new(offset + i))
            .collect();
        KeywordTable::new(dates, vec!["k".into()], vec![values]).unwrap()
    }

    #[test]
    fn rescales_second_window_onto_first() {
        // truth 1..=10, second window reported at half scale
        let first = frag(0, (1..=6).map(f64::from).collect());
        let second = frag(4, (5..=10).map(|v| f64::from(v) / 2.0).collect());
        let out = stitch(&[first, second]).unwrap();
        assert_eq!(out.series.len(), 10);
        let expected: Vec<f64> = (1..=10).map(f64::from).collect();
        for (got, want) in out.series.column("k").unwrap().iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(out.adjustments.len(), 1);
        assert_eq!(out.adjustments[0].window_index, 1);
        assert_eq!(out.adjustments[0].overlap_days, 2);
        assert!((out.adjustments[0].ratios[0].ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn ratio_below_one_is_floored() {
        let first = frag(0, vec![1.0, 1.0, 1.0]);
        let second = frag(1, vec![4.0, 4.0, 4.0]);
        let out = stitch(&[first, second]).unwrap();
        assert_eq!(out.adjustments[0].ratio_for("k"), Some(1.0));
        assert_eq!(out.series.column("k").unwrap(), &[1.0, 1.0, 1.0, 4.0]);
    }

    #[test]
    fn zero_fragment_overlap_uses_unit_ratio() {
        let first = frag(0, vec![3.0, 3.0, 3.0]);
        let second = frag(1, vec![0.0, 0.0, 5.0]);
        let out = stitch(&[first, second]).unwrap();
        assert_eq!(out.adjustments[0].ratio_for("k"), Some(1.0));
        assert_eq!(out.series.column("k").unwrap()[3], 5.0);
    }

    #[test]
    fn disjoint_windows_are_an_error() {
        let first = frag(0, vec![1.0, 2.0]);
        let second = frag(5, vec![1.0, 2.0]);
        assert!(matches!(
            stitch(&[first, second]),
            Err(IndexError::DisjointWindows { window_index: 1 })
        ));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let first = frag(0, vec![1.0, 2.0]);
        let dates = vec![start() + Days::new(1)];
        let other = KeywordTable::new(dates, vec!["j".into()], vec![vec![1.0]]).unwrap();
        assert!(matches!(stitch(&[first, other]), Err(IndexError::Shape(_))));
    }

    #[test]
    fn no_fragments_is_an_error() {
        assert!(stitch(&[]).is_err());
    }
}
