//! Small numerical helpers shared by the engines.
//!
//! Every helper maps degenerate input (empty slices, zero denominators) to a
//! defined value instead of producing NaN or infinity.

use std::cmp::Ordering;

/// Divides `numerator` by `denominator`, returning `fallback` when the
/// denominator is zero or the quotient is not finite.
pub fn safe_div(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        return fallback;
    }
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        fallback
    }
}

/// Like [`safe_div`] but returns `None` for an undefined ratio.
pub fn checked_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let q = numerator / denominator;
    q.is_finite().then_some(q)
}

/// Clamps to `[0, 1]`; NaN maps to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). Zero for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_squared_diff: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    let variance = sum_squared_diff / (values.len() - 1) as f64;
    if variance <= 0.0 {
        0.0
    } else {
        variance.sqrt()
    }
}

/// Pearson correlation of two equally long series. `None` when undefined.
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    let denom = (va * vb).sqrt();
    checked_ratio(cov, denom).map(|c| c.clamp(-1.0, 1.0))
}

/// Simple period-over-period returns of a price series.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Least-squares slope of `values` against their index.
pub fn trend_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let mx = mean(&xs);
    let my = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(values) {
        num += (x - mx) * (y - my);
        den += (x - mx) * (x - mx);
    }
    safe_div(num, den, 0.0)
}

/// Sorts a copy of `values` ascending, treating NaN as equal.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Nearest-rank percentile over an ascending slice. `pct` is in `[0, 100]`.
///
/// Monotone in `pct` for any sorted input.
pub fn percentile_sorted(sorted_values: &[f64], pct: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let n = sorted_values.len();
    let rank = (pct.clamp(0.0, 100.0) * n as f64 / 100.0).ceil() as usize;
    let idx = rank.saturating_sub(1).min(n - 1);
    sorted_values[idx]
}

/// Standard normal CDF (Abramowitz & Stegun 26.2.17).
pub fn norm_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return 0.5;
    }
    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.398_942_3 * (-x * x / 2.0).exp();
    let p = d * t * (0.319_381_5 + t * (-0.356_563_8 + t * (1.781_478 + t * (-1.821_256 + t * 1.330_274))));
    if x > 0.0 {
        1.0 - p
    } else {
        p
    }
}

/// Herfindahl-Hirschman index of a set of weights. `None` for an empty set.
pub fn herfindahl(weights: &[f64]) -> Option<f64> {
    if weights.is_empty() {
        return None;
    }
    Some(clamp01(weights.iter().map(|w| w * w).sum()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_div_sentinels() {
        assert_eq!(safe_div(1.0, 0.0, 0.0), 0.0);
        assert_eq!(safe_div(1.0, 4.0, 0.0), 0.25);
        assert_eq!(checked_ratio(1.0, 0.0), None);
        assert_eq!(checked_ratio(3.0, 2.0), Some(1.5));
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[1.0]), 0.0);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.138).abs() < 1e-3);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile_sorted(&values, 5.0), 5.0);
        assert_eq!(percentile_sorted(&values, 50.0), 50.0);
        assert_eq!(percentile_sorted(&values, 95.0), 95.0);
        assert_eq!(percentile_sorted(&values, 0.0), 1.0);
        assert_eq!(percentile_sorted(&[], 50.0), 0.0);
    }

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn test_herfindahl() {
        assert_eq!(herfindahl(&[]), None);
        assert!((herfindahl(&[0.5, 0.5]).unwrap() - 0.5).abs() < 1e-12);
        assert!((herfindahl(&[1.0]).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_correlation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        assert!((correlation(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(correlation(&[1.0, 1.0], &[2.0, 3.0]), None);
    }

    #[test]
    fn test_trend_slope() {
        assert!((trend_slope(&[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
        assert_eq!(trend_slope(&[5.0]), 0.0);
    }
}
