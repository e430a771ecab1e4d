//! Classical additive seasonal decomposition.
//!
//! trend: centered moving average over one period (a 2 x m average for even
//! periods), with both ends filled by a least-squares line fitted to the
//! nearest `period` trend values.
//! seasonal: mean detrended value per phase, centered to sum to zero.
//! residual: what is left.
//!
//! Seasonal adjustment keeps `trend + residual`, i.e. the input minus the
//! seasonal component.

use crate::error::IndexError;

#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

impl Decomposition {
    /// `trend + residual`.
    pub fn adjusted(&self) -> Vec<f64> {
        self.trend
            .iter()
            .zip(&self.residual)
            .map(|(t, r)| t + r)
            .collect()
    }
}

/// Decompose `values` with the given seasonal `period`.
///
/// Needs `period >= 2` and at least two full cycles.
pub fn decompose(values: &[f64], period: usize) -> Result<Decomposition, IndexError> {
    let n = values.len();
    if period < 2 || n < 2 * period {
        return Err(IndexError::SeriesTooShort {
            period,
            required: 2 * period.max(2),
            actual: n,
        });
    }

    let trend = trend(values, period);

    let detrended: Vec<f64> = values.iter().zip(&trend).map(|(v, t)| v - t).collect();
    let mut phase_means: Vec<f64> = (0..period)
        .map(|phase| {
            let (sum, count) = detrended
                .iter()
                .skip(phase)
                .step_by(period)
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            sum / count as f64
        })
        .collect();
    let center = phase_means.iter().sum::<f64>() / period as f64;
    for m in &mut phase_means {
        *m -= center;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| phase_means[i % period]).collect();
    let residual = detrended
        .iter()
        .zip(&seasonal)
        .map(|(d, s)| d - s)
        .collect();

    Ok(Decomposition {
        trend,
        seasonal,
        residual,
    })
}

/// `values` minus their seasonal component.
pub fn seasonally_adjust(values: &[f64], period: usize) -> Result<Vec<f64>, IndexError> {
    Ok(decompose(values, period)?.adjusted())
}

fn trend(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let p = period as f64;
    let filter: Vec<f64> = if period % 2 == 0 {
        let mut f = vec![1.0 / p; period + 1];
        f[0] = 0.5 / p;
        f[period] = 0.5 / p;
        f
    } else {
        vec![1.0 / p; period]
    };
    let half = filter.len() / 2;

    let mut trend = vec![0.0; n];
    for (i, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        *slot = filter
            .iter()
            .enumerate()
            .map(|(j, w)| w * values[i - half + j])
            .sum();
    }

    // [front, back] is the span the moving average covers
    let front = half;
    let back = n - 1 - half;
    let npoints = period;

    let head_end = (front + npoints).min(back);
    let (slope, intercept) = fit_line(&trend, front, head_end);
    for (i, slot) in trend.iter_mut().enumerate().take(front) {
        *slot = slope * i as f64 + intercept;
    }

    let tail_start = back.saturating_sub(npoints).max(front);
    let (slope, intercept) = if back > tail_start {
        fit_line(&trend, tail_start, back)
    } else {
        (0.0, trend[back])
    };
    for (i, slot) in trend.iter_mut().enumerate().skip(back + 1) {
        *slot = slope * i as f64 + intercept;
    }

    trend
}

/// Least-squares line through `(i, values[i])` for `i` in `lo..hi`.
fn fit_line(values: &[f64], lo: usize, hi: usize) -> (f64, f64) {
    let count = (hi - lo) as f64;
    let mean_x = (lo..hi).map(|i| i as f64).sum::<f64>() / count;
    let mean_y = values[lo..hi].iter().sum::<f64>() / count;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for i in lo..hi {
        let dx = i as f64 - mean_x;
        sxy += dx * (values[i] - mean_y);
        sxx += dx * dx;
    }
    if sxx == 0.0 {
        return (0.0, mean_y);
    }
    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x)
}
