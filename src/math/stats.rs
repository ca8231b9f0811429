//! Descriptive statistics over score and compensation distributions.
//!
//! All functions are total: an empty input yields 0 (or an empty result)
//! instead of NaN, so the diagnostic never carries undefined numbers.

use crate::math::clamp_unit;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`) around a precomputed mean.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Median; the average of the two middle values for even `n`.
pub fn median(values: &[f64]) -> f64 {
    let sorted = sorted_copy(values);
    median_sorted(&sorted)
}

fn median_sorted(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Interpolated percentile over an already sorted slice.
///
/// `index = (n - 1) * p / 100`, interpolated between the floor and the next
/// rank; the last element is returned when that rank is out of bounds.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = p.clamp(0.0, 100.0);
    let index = (sorted.len() - 1) as f64 * (p / 100.0);
    let lower = index.floor() as usize;
    let upper = lower + 1;
    let weight = index - lower as f64;

    if upper >= sorted.len() {
        return sorted[lower.min(sorted.len() - 1)];
    }
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// `[Q1, Q2, Q3]` by interpolated percentile.
pub fn quartiles(values: &[f64]) -> [f64; 3] {
    let sorted = sorted_copy(values);
    [
        percentile(&sorted, 25.0),
        percentile(&sorted, 50.0),
        percentile(&sorted, 75.0),
    ]
}

/// p10 / p25 / p50 / p75 / p90 in that order.
pub fn common_percentiles(values: &[f64]) -> [f64; 5] {
    let sorted = sorted_copy(values);
    [10.0, 25.0, 50.0, 75.0, 90.0].map(|p| percentile(&sorted, p))
}

/// Share of `values` strictly below `value`, as a rounded percentage.
pub fn percentile_rank(values: &[f64], value: f64) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let below = values.iter().filter(|&&v| v < value).count();
    ((below as f64 / values.len() as f64) * 100.0).round() as u32
}

/// Count values into `bins` equal-width buckets over `[0, 1]`.
///
/// Values are clamped first; exactly 1.0 lands in the last bucket.
pub fn histogram_counts(values: &[f64], bins: usize) -> Vec<usize> {
    let bins = bins.max(1);
    let mut counts = vec![0usize; bins];
    for &v in values {
        let z = clamp_unit(v);
        let idx = ((z * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

pub fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let s = [10.0, 20.0, 30.0, 40.0];
        assert!((percentile(&s, 50.0) - 25.0).abs() < 1e-12);
        assert_eq!(percentile(&s, 0.0), 10.0);
        assert_eq!(percentile(&s, 100.0), 40.0);
        assert!((percentile(&s, 25.0) - 17.5).abs() < 1e-12);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[30.0, 10.0, 20.0]), 20.0);
        assert_eq!(median(&[40.0, 10.0, 30.0, 20.0]), 25.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn std_dev_uses_population_formula() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&v);
        assert_eq!(m, 5.0);
        assert!((std_dev(&v, m) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quartiles_and_common_percentiles() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quartiles(&v), [2.0, 3.0, 4.0]);
        let p = common_percentiles(&v);
        assert!((p[0] - 1.4).abs() < 1e-12);
        assert!((p[4] - 4.6).abs() < 1e-12);
    }

    #[test]
    fn percentile_rank_counts_strictly_below() {
        let v = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile_rank(&v, 30.0), 50);
        assert_eq!(percentile_rank(&v, 5.0), 0);
        assert_eq!(percentile_rank(&v, 100.0), 100);
        assert_eq!(percentile_rank(&[], 1.0), 0);
    }

    #[test]
    fn histogram_keeps_one_in_last_bucket() {
        let counts = histogram_counts(&[0.0, 0.05, 0.55, 0.999, 1.0, 1.5, -0.3], 10);
        assert_eq!(counts.len(), 10);
        assert_eq!(counts[0], 3);
        assert_eq!(counts[5], 1);
        assert_eq!(counts[9], 3);
        assert_eq!(counts.iter().sum::<usize>(), 7);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[], 0.0), 0.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(min_max(&[]), (0.0, 0.0));
    }
}
