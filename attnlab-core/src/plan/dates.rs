//! Default date range resolution.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{DateWindow, Frequency};
use crate::error::IndexError;

/// How far back a run reaches when no start date is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    /// Default history for daily and weekly output.
    pub daily_days: i64,
    /// Default history for monthly and quarterly output.
    pub long_days: i64,
    /// Minimum history for monthly and quarterly output when a start date
    /// is given.
    pub long_min_history_days: i64,
}

impl Default for Lookback {
    fn default() -> Self {
        Self {
            daily_days: 260,
            long_days: 1900,
            long_min_history_days: 2000,
        }
    }
}

/// Resolve optional start/end dates into the range to fetch.
///
/// `end` defaults to `today`. Monthly and quarterly runs need several
/// complete periods, so a short explicit range is pushed back to
/// `long_min_history_days`.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    frequency: Frequency,
    today: NaiveDate,
    lookback: &Lookback,
) -> Result<DateWindow, IndexError> {
    let end = end.unwrap_or(today);
    let back = |days: i64| {
        end.checked_sub_days(Days::new(days.max(0) as u64))
            .ok_or_else(|| {
                IndexError::InvalidPlan(format!(
                    "lookback of {days} days from {end} is out of range"
                ))
            })
    };

    let start = match (frequency, start) {
        (Frequency::Daily | Frequency::Weekly, Some(s)) => s,
        (Frequency::Daily | Frequency::Weekly, None) => back(lookback.daily_days)?,
        (Frequency::Monthly | Frequency::Quarterly, None) => back(lookback.long_days)?,
        (Frequency::Monthly | Frequency::Quarterly, Some(s)) => {
            if (end - s).num_days() < lookback.long_min_history_days {
                let pushed = back(lookback.long_min_history_days)?;
                tracing::info!(
                    requested = %s,
                    start = %pushed,
                    %frequency,
                    "start date moved back to cover enough complete periods"
                );
                pushed
            } else {
                s
            }
        }
    };

    if end < start {
        return Err(IndexError::InvalidPlan(format!(
            "end date {end} is before start date {start}"
        )));
    }
    Ok(DateWindow::new(start, end))
}
