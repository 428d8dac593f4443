//! The statistical primitives behind the R.I.C.O. rules and turnover
//! analytics: repurchase recurrence, turnover confidence interval, volume
//! outlier detection, turnover variability and Bayesian survival scoring.

use crate::describe::{finite, mean, population_std, quantile};
use chrono::{DateTime, Utc};

/// Rounds to 4 decimal places, the precision carried by all scores.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Probability that a client repurchases within `window_days`, measured as
/// the fraction of historical inter-purchase intervals at or below the
/// window.
///
/// Requires at least two dates; otherwise returns `0.0`. The result is in
/// `[0, 1]`, rounded to 4 decimals.
pub fn repurchase_probability(dates: &[DateTime<Utc>], window_days: i64) -> f64 {
    if dates.len() < 2 {
        return 0.0;
    }

    let mut sorted: Vec<DateTime<Utc>> = dates.to_vec();
    sorted.sort();

    let deltas: Vec<i64> = sorted
        .windows(2)
        .map(|w| w[1].signed_duration_since(w[0]).num_days())
        .collect();
    if deltas.is_empty() {
        return 0.0;
    }

    let hits = deltas.iter().filter(|d| **d <= window_days).count();
    round4(hits as f64 / deltas.len() as f64)
}

/// Non-parametric confidence interval for the turnover (inter-purchase
/// interval) distribution.
///
/// Uses the percentile method with `alpha = 1 - confidence`, returning the
/// `[alpha/2, 1 - alpha/2]` quantiles. Robust to skewed distributions since
/// no normality is assumed. Empty input returns `(0.0, 0.0)`.
pub fn turnover_confidence_interval(intervals: &[f64], confidence: f64) -> (f64, f64) {
    let clean = finite(intervals);
    if clean.is_empty() {
        return (0.0, 0.0);
    }

    let alpha = 1.0 - confidence;
    let low = quantile(&clean, alpha / 2.0);
    let high = quantile(&clean, 1.0 - alpha / 2.0);
    (low, high)
}

/// Flags volume observations whose Z-score against the sequence mean exceeds
/// `z_threshold` in absolute value.
///
/// The returned mask is aligned to the input; non-finite entries are excluded
/// from the mean/deviation and never flagged. A zero or undefined deviation
/// yields an all-false mask.
pub fn volume_outliers(values: &[f64], z_threshold: f64) -> Vec<bool> {
    let clean = finite(values);
    if clean.is_empty() {
        return vec![false; values.len()];
    }

    let m = mean(&clean);
    let std = population_std(&clean);
    if std == 0.0 || !std.is_finite() {
        return vec![false; values.len()];
    }

    values
        .iter()
        .map(|v| v.is_finite() && ((v - m) / std).abs() > z_threshold)
        .collect()
}

/// Coefficient of variation of the turnover intervals (population standard
/// deviation over mean). Zero mean or empty input returns `0.0`.
pub fn coefficient_of_variation(intervals: &[f64]) -> f64 {
    let clean = finite(intervals);
    if clean.is_empty() {
        return 0.0;
    }
    let m = mean(&clean);
    if m == 0.0 {
        return 0.0;
    }
    population_std(&clean) / m
}

/// Expected survival probability under a Beta-Bernoulli model.
///
/// `events` holds one entry per cycle: `true` for a repurchase, `false` for a
/// cycle without one. The result is the Beta posterior mean
/// `(successes + alpha) / (n + alpha + beta)`, rounded to 4 decimals: the
/// expected probability the client stays active in the next cycle. Empty
/// input returns `0.0`.
pub fn bayesian_survival_score(events: &[bool], alpha: f64, beta: f64) -> f64 {
    if events.is_empty() {
        return 0.0;
    }
    let successes = events.iter().filter(|e| **e).count() as f64;
    round4((successes + alpha) / (events.len() as f64 + alpha + beta))
}
