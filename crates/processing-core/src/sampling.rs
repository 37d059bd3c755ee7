//! Snapshot time planning.

use serde::{Deserialize, Serialize};

use montage_common::{MontageError, MontageResult, TimeRange};

/// What a snapshot batch should sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorRequest {
    pub time_range: TimeRange,
    pub image_count: usize,
}

impl GeneratorRequest {
    pub fn new(time_range: TimeRange, image_count: usize) -> MontageResult<Self> {
        if image_count == 0 {
            return Err(MontageError::invalid_parameter("image count must be at least 1"));
        }
        if !time_range.is_well_formed() {
            return Err(MontageError::invalid_parameter(format!(
                "malformed time range [{} +{}]",
                time_range.start_secs, time_range.duration_secs
            )));
        }
        Ok(Self {
            time_range,
            image_count,
        })
    }

    /// Spacing between samples: `duration / max(count - 1, 1)`.
    pub fn time_interval(&self) -> f64 {
        self.time_range.duration_secs / self.image_count.saturating_sub(1).max(1) as f64
    }

    /// Evenly spaced sample times, first at the range start and, for two or
    /// more samples, last at the range end.
    pub fn target_times(&self) -> Vec<f64> {
        let start = self.time_range.start_secs;
        if self.image_count <= 1 {
            return vec![start];
        }
        let steps = (self.image_count - 1) as f64;
        (0..self.image_count)
            .map(|i| start + self.time_range.duration_secs * i as f64 / steps)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_samples_over_eight_seconds() {
        let request = GeneratorRequest::new(TimeRange::new(0.0, 8.0), 5).unwrap();
        assert_eq!(request.time_interval(), 2.0);
        assert_eq!(request.target_times(), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_single_sample_is_range_start() {
        let request = GeneratorRequest::new(TimeRange::new(3.5, 8.0), 1).unwrap();
        assert_eq!(request.time_interval(), 8.0);
        assert_eq!(request.target_times(), vec![3.5]);
    }

    #[test]
    fn test_last_sample_lands_on_range_end() {
        let request = GeneratorRequest::new(TimeRange::new(0.1, 0.7), 8).unwrap();
        let times = request.target_times();
        assert_eq!(times.len(), 8);
        assert!((times[7] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_invalid_requests() {
        assert!(GeneratorRequest::new(TimeRange::new(0.0, 8.0), 0).is_err());
        assert!(GeneratorRequest::new(TimeRange::new(-1.0, 8.0), 3).is_err());
        assert!(GeneratorRequest::new(TimeRange::new(0.0, f64::NAN), 3).is_err());
    }
}
