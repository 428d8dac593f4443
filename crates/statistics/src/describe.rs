//! Shared descriptive-statistics helpers.
//!
//! These are the numeric building blocks the segmentation, metrics and
//! insights engines fold their grouped data through. All of them silently
//! drop non-finite values and return `0.0` (or an empty vector) on empty
//! input.

use std::cmp::Ordering;

/// Retains only the finite values of a sequence.
pub(crate) fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean. Empty input returns `0.0`.
pub fn mean(values: &[f64]) -> f64 {
    let clean = finite(values);
    if clean.is_empty() {
        return 0.0;
    }
    clean.iter().sum::<f64>() / clean.len() as f64
}

/// Population standard deviation (ddof = 0). Empty input returns `0.0`.
pub fn population_std(values: &[f64]) -> f64 {
    let clean = finite(values);
    if clean.is_empty() {
        return 0.0;
    }
    let m = clean.iter().sum::<f64>() / clean.len() as f64;
    let variance = clean.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / clean.len() as f64;
    variance.sqrt()
}

/// Median value. Empty input returns `0.0`.
pub fn median(values: &[f64]) -> f64 {
    let mut clean = finite(values);
    if clean.is_empty() {
        return 0.0;
    }
    clean.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = clean.len() / 2;
    if clean.len() % 2 == 1 {
        clean[mid]
    } else {
        (clean[mid - 1] + clean[mid]) / 2.0
    }
}

/// Quantile `q` in `[0, 1]` using linear interpolation between order
/// statistics, the same convention as the non-parametric percentile method
/// used for the turnover confidence interval.
///
/// Empty input returns `0.0`; `q` is clamped to `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut clean = finite(values);
    if clean.is_empty() {
        return 0.0;
    }
    clean.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let q = q.clamp(0.0, 1.0);
    let pos = (clean.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        clean[lo]
    } else {
        let frac = pos - lo as f64;
        clean[lo] + (clean[hi] - clean[lo]) * frac
    }
}

/// Percentile ranks in `(0, 1]` using the average method: tied values share
/// the mean of the positions they occupy, and ranks are normalized by the
/// sequence length. The output is aligned to the input.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // Find the run of values tied with order[i].
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions are 1-based; tied entries share the average position.
        let avg_rank = (i + 1..=j).map(|p| p as f64).sum::<f64>() / (j - i) as f64;
        for &idx in &order[i..j] {
            ranks[idx] = avg_rank / n as f64;
        }
        i = j;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std_drop_non_finite() {
        let values = [10.0, f64::NAN, 14.0, f64::INFINITY];
        assert_eq!(mean(&values), 12.0);
        assert_eq!(population_std(&values), 2.0);
    }

    #[test]
    fn median_of_even_and_odd_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [10.0, 12.0, 14.0, 16.0, 18.0];
        assert!((quantile(&values, 0.1) - 10.8).abs() < 1e-9);
        assert!((quantile(&values, 0.9) - 17.2).abs() < 1e-9);
        assert_eq!(quantile(&values, 0.0), 10.0);
        assert_eq!(quantile(&values, 1.0), 18.0);
    }

    #[test]
    fn percentile_ranks_average_ties() {
        // Two tied values occupy positions 2 and 3 -> shared rank 2.5/4.
        let ranks = percentile_ranks(&[1.0, 5.0, 5.0, 9.0]);
        assert_eq!(ranks[0], 0.25);
        assert_eq!(ranks[1], 0.625);
        assert_eq!(ranks[2], 0.625);
        assert_eq!(ranks[3], 1.0);
    }

    #[test]
    fn percentile_ranks_empty() {
        assert!(percentile_ranks(&[]).is_empty());
    }
}
