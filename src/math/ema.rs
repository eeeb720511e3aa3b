//! Exponentially weighted moving average.

use crate::domain::{DayCurve, SmoothingConfig};

/// Bias-adjusted EMA with `alpha = 2 / (span + 1)`.
///
/// Output `i` is `sum_k w_k x_{i-k} / sum_k w_k` with `w_k = (1 - alpha)^k`, so
/// early values are not pulled toward zero.
///
/// A non-finite input (a missing bin) still counts as a step: earlier weights
/// decay across it and its output repeats the running mean. Outputs before the
/// first finite input are NaN.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let span = span.max(1) as f64;
    let alpha = 2.0 / (span + 1.0);
    let decay = 1.0 - alpha;

    let mut num = 0.0;
    let mut den = 0.0;
    let mut mean = f64::NAN;
    let mut out = Vec::with_capacity(values.len());
    for &x in values {
        if x.is_finite() {
            num = x + decay * num;
            den = 1.0 + decay * den;
            mean = num / den;
        } else {
            num *= decay;
            den *= decay;
        }
        out.push(mean);
    }
    out
}

/// Smooth a curve's counts in place (times are untouched).
pub fn smooth_curve(curve: &mut DayCurve, smoothing: SmoothingConfig) {
    if !smoothing.enabled {
        return;
    }
    let smoothed = ema(&curve.counts(), smoothing.span);
    for (point, y) in curve.points.iter_mut().zip(smoothed) {
        point.1 = y;
    }
}
