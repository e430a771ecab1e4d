//! Overlapping date windows under the per-request day cap.

use chrono::{Days, NaiveDate};

use crate::domain::DateWindow;
use crate::error::IndexError;

/// Default per-window span in days, kept under the source's own cap.
pub const DEFAULT_DAY_CAP: i64 = 260;
/// Default overlap between consecutive windows in days.
pub const DEFAULT_OVERLAP: i64 = 45;

/// Partition `[start, end]` into chronological windows.
///
/// Each window spans at most `cap` days and consecutive windows share
/// exactly `overlap` days. The final window is cut short to end at `end`.
pub fn plan_windows(
    start: NaiveDate,
    end: NaiveDate,
    cap: i64,
    overlap: i64,
) -> Result<Vec<DateWindow>, IndexError> {
    if end < start {
        return Err(IndexError::InvalidPlan(format!(
            "end date {end} is before start date {start}"
        )));
    }
    if cap <= 0 {
        return Err(IndexError::InvalidPlan(format!(
            "day cap must be positive, got {cap}"
        )));
    }
    if overlap < 0 || overlap >= cap {
        return Err(IndexError::InvalidPlan(format!(
            "overlap must be in [0, {cap}), got {overlap}"
        )));
    }

    let total = (end - start).num_days();
    if total <= cap {
        return Ok(vec![DateWindow::new(start, end)]);
    }

    let step = cap - overlap;
    let at = |offset: i64| start + Days::new(offset as u64);
    let mut windows = Vec::new();
    let mut offset = 0;
    loop {
        let stop = offset + cap;
        if stop >= total {
            windows.push(DateWindow::new(at(offset), end));
            break;
        }
        windows.push(DateWindow::new(at(offset), at(stop)));
        offset += step;
    }

    tracing::debug!(
        %start,
        %end,
        cap,
        overlap,
        windows = windows.len(),
        "planned date windows"
    );
    Ok(windows)
}
