//! Ensemble statistics across models
//!
//! A model's value is compared against the median of all models for the same
//! variable and statistic. Values further than [`Z_SCORE_LIMIT`] standard
//! deviations from the median are flagged as outliers.

/// |z-score| above which a value is flagged
pub const Z_SCORE_LIMIT: f64 = 3.0;

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Median of the finite values, `None` when there are none
pub fn nan_median(values: &[f64]) -> Option<f64> {
    let mut v = finite(values);
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    Some(if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    })
}

/// Sample standard deviation (n - 1) of the finite values; needs two of them
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let v = finite(values);
    if v.len() < 2 {
        return None;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// |x - median| / σ for every value, σ replaced by 1 when it is zero.
///
/// Entries are NaN where the value is not finite or where the ensemble has
/// fewer than two finite members.
pub fn abs_z_scores(values: &[f64]) -> Vec<f64> {
    let (Some(median), Some(std)) = (nan_median(values), sample_std(values)) else {
        return vec![f64::NAN; values.len()];
    };
    let scale = if std == 0.0 { 1.0 } else { std };
    values
        .iter()
        .map(|&x| {
            if x.is_finite() {
                ((x - median) / scale).abs()
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Whether `z` marks an outlier
pub fn is_outlier(z: f64) -> bool {
    z.is_finite() && z > Z_SCORE_LIMIT
}
