//! Small statistics helpers.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Standardize to mean 0 and sample std 1.
///
/// `None` when the series has fewer than two values, is not finite, or has
/// (numerically) zero spread.
pub fn zscore(values: &[f64]) -> Option<Vec<f64>> {
    let m = mean(values)?;
    let sd = sample_std(values)?;
    if !m.is_finite() || !sd.is_finite() || sd <= 1e-12 * m.abs().max(1.0) {
        return None;
    }
    Some(values.iter().map(|v| (v - m) / sd).collect())
}
