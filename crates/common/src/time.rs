//! Time primitives shared by the model and the composition core.
//!
//! All times are seconds as `f64`. Comparisons that must survive repeated
//! division (speed = trim / duration and back) go through [`approx_eq`].

use serde::{Deserialize, Serialize};

/// Tolerance used for time and geometry comparisons.
pub const EPSILON: f64 = 1e-9;

/// Whether two values are equal within [`EPSILON`], scaled for magnitude.
pub fn approx_eq(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= EPSILON * scale
}

/// A half-open span of time `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start time in seconds.
    pub start_secs: f64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl TimeRange {
    pub const ZERO: TimeRange = TimeRange {
        start_secs: 0.0,
        duration_secs: 0.0,
    };

    pub fn new(start_secs: f64, duration_secs: f64) -> Self {
        Self {
            start_secs,
            duration_secs,
        }
    }

    /// Range covering `[0, duration)`.
    pub fn from_duration(duration_secs: f64) -> Self {
        Self::new(0.0, duration_secs)
    }

    /// End time in seconds.
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Finite, non-negative start and duration.
    pub fn is_well_formed(&self) -> bool {
        self.start_secs.is_finite()
            && self.duration_secs.is_finite()
            && self.start_secs >= 0.0
            && self.duration_secs >= 0.0
    }

    /// Whether `t` lies in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_secs && t < self.end_secs()
    }

    /// Clamp `t` into `[start, end]`.
    pub fn clamp(&self, t: f64) -> f64 {
        t.clamp(self.start_secs, self.end_secs().max(self.start_secs))
    }

    /// Restrict this range to `[0, total_secs]`.
    ///
    /// A start past the end collapses to a zero-length range at `total_secs`.
    pub fn clipped_to(&self, total_secs: f64) -> TimeRange {
        let start = self.start_secs.clamp(0.0, total_secs);
        let end = self.end_secs().clamp(start, total_secs);
        TimeRange::new(start, end - start)
    }

    /// Whether two ranges are equal within tolerance.
    pub fn approx_eq(&self, other: &TimeRange) -> bool {
        approx_eq(self.start_secs, other.start_secs)
            && approx_eq(self.duration_secs, other.duration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains_is_half_open() {
        let r = TimeRange::new(2.0, 4.0);
        assert!(r.contains(2.0));
        assert!(r.contains(5.999));
        assert!(!r.contains(6.0));
        assert!(!r.contains(1.999));
    }

    #[test]
    fn test_clipped_to_source_length() {
        let r = TimeRange::new(8.0, 5.0).clipped_to(10.0);
        assert!(r.approx_eq(&TimeRange::new(8.0, 2.0)));

        let past = TimeRange::new(12.0, 1.0).clipped_to(10.0);
        assert!(past.approx_eq(&TimeRange::new(10.0, 0.0)));
    }

    #[test]
    fn test_malformed_ranges() {
        assert!(!TimeRange::new(-1.0, 2.0).is_well_formed());
        assert!(!TimeRange::new(0.0, f64::NAN).is_well_formed());
        assert!(TimeRange::new(0.0, 0.0).is_well_formed());
    }

    #[test]
    fn test_approx_eq_scales_with_magnitude() {
        assert!(approx_eq(1e6, 1e6 + 1e-4));
        assert!(!approx_eq(1.0, 1.0 + 1e-6));
    }
}
