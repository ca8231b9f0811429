//! Min/max normalisation into the unit interval.
//!
//! Every feature the network sees and every score the engine reports lives in
//! `[0, 1]`. Values outside a training range saturate at the boundary instead of
//! extrapolating.

use serde::{Deserialize, Serialize};

/// Clamp a value into `[0, 1]`. NaN maps to 0.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// Map `value` from `[min, max]` into `[0, 1]`, clamped.
///
/// A degenerate range (`min == max`) returns 0 rather than dividing by zero.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if min == max {
        return 0.0;
    }
    clamp_unit((value - min) / (max - min))
}

/// A per-feature `(min, max)` range learned from a training population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    /// The identity range `[0, 1]`, used when there is nothing to learn from.
    pub fn unit() -> Self {
        Self { min: 0.0, max: 1.0 }
    }

    /// Range over the finite values in `values`.
    ///
    /// Empty input yields `[0, 1]`. A zero-width range is widened to `[min, min + 1]`.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
        }
        if !(min.is_finite() && max.is_finite()) {
            return Self::unit();
        }
        if min == max {
            return Self { min, max: min + 1.0 };
        }
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn normalize(&self, value: f64) -> f64 {
        normalize(value, self.min, self.max)
    }

    /// Inverse of `normalize`: `n * (max - min) + min`.
    pub fn denormalize(&self, normalized: f64) -> f64 {
        normalized * self.span() + self.min
    }
}

impl Default for MinMax {
    fn default() -> Self {
        Self::unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_hits_endpoints_and_stays_bounded() {
        assert_eq!(normalize(10.0, 10.0, 20.0), 0.0);
        assert_eq!(normalize(20.0, 10.0, 20.0), 1.0);
        assert!((normalize(15.0, 10.0, 20.0) - 0.5).abs() < 1e-12);
        for v in [-1e9, -3.0, 0.0, 12.5, 19.99, 1e9] {
            let n = normalize(v, 10.0, 20.0);
            assert!((0.0..=1.0).contains(&n), "{v} -> {n}");
        }
    }

    #[test]
    fn normalize_degenerate_range_is_defined() {
        let n = normalize(7.0, 7.0, 7.0);
        assert!(n.is_finite());
        assert!((0.0..=1.0).contains(&n));
    }

    #[test]
    fn from_values_widens_zero_width_range() {
        let r = MinMax::from_values([4.0, 4.0, 4.0]);
        assert_eq!(r, MinMax { min: 4.0, max: 5.0 });
        assert_eq!(r.normalize(4.0), 0.0);
    }

    #[test]
    fn from_values_ignores_non_finite_and_defaults_when_empty() {
        assert_eq!(MinMax::from_values(Vec::<f64>::new()), MinMax::unit());
        let r = MinMax::from_values([f64::NAN, 2.0, 8.0, f64::INFINITY]);
        assert_eq!(r, MinMax { min: 2.0, max: 8.0 });
    }

    #[test]
    fn denormalize_inverts_normalize_inside_range() {
        let r = MinMax { min: 30_000.0, max: 90_000.0 };
        let v = 54_321.0;
        assert!((r.denormalize(r.normalize(v)) - v).abs() < 1e-6);
    }

    #[test]
    fn clamp_unit_handles_nan() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
    }
}
