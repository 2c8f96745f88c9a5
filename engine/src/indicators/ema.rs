//! Exponentially weighted statistics over plain `f64` slices
//!
//! Weights follow the adjusted form: each output is
//! `sum((1-a)^i * x[t-i]) / sum((1-a)^i)` with `a = 2 / (span + 1)`.
//! Non-finite inputs are skipped but still decay the earlier weights.

/// Exponentially weighted mean for every position of `values`.
///
/// Positions with fewer than `min_periods` finite observations so far are NaN.
pub fn ewm_mean(values: &[f64], span: f64, min_periods: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1.0) + 1.0);
    let decay = 1.0 - alpha;
    let min_periods = min_periods.max(1);

    let mut num = 0.0;
    let mut den = 0.0;
    let mut seen = 0usize;

    values
        .iter()
        .map(|&x| {
            num *= decay;
            den *= decay;
            if x.is_finite() {
                num += x;
                den += 1.0;
                seen += 1;
            }
            if seen >= min_periods && den > 0.0 {
                num / den
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Last value of the exponentially weighted mean, NaN when undefined
pub fn ewm_last(values: &[f64], span: f64) -> f64 {
    ewm_mean(values, span, 1).last().copied().unwrap_or(f64::NAN)
}

/// Successive differences `x[i+1] - x[i]`
pub fn diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Successive percent changes, times 100
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| {
            if w[0] != 0.0 {
                (w[1] - w[0]) / w[0] * 100.0
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Mean of the finite values, NaN if there are none
pub fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}

/// Sample standard deviation (ddof = 1) of the finite values
pub fn std_dev(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return f64::NAN;
    }
    let m = finite.iter().sum::<f64>() / finite.len() as f64;
    let var = finite.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (finite.len() - 1) as f64;
    var.sqrt()
}

/// Replace NaN/inf with `fallback`
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
