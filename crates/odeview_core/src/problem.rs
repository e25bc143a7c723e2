use crate::error::IntegrationError;
use serde::{Deserialize, Serialize};

/// Known state `y0` at time `t0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialCondition {
    pub t0: f64,
    pub y0: f64,
}

impl InitialCondition {
    pub fn new(t0: f64, y0: f64) -> Self {
        Self { t0, y0 }
    }
}

/// Upper bound on the number of output samples a span may ask for.
pub const MAX_SAMPLES: usize = 10_000_000;

/// How densely the time span is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Fixed spacing between samples; the last interval may be shorter.
    Step(f64),
    /// Evenly spaced samples including both ends.
    Points(usize),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Points(1000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub resolution: Resolution,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            resolution: Resolution::default(),
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn validate(&self) -> Result<(), IntegrationError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(IntegrationError::InvalidTimeSpan(
                "bounds must be finite".to_string(),
            ));
        }
        if self.end <= self.start {
            return Err(IntegrationError::InvalidTimeSpan(format!(
                "end ({}) must be greater than start ({})",
                self.end, self.start
            )));
        }
        match self.resolution {
            Resolution::Step(h) if !(h.is_finite() && h > 0.0) => Err(
                IntegrationError::InvalidTimeSpan(format!("step must be positive, got {h}")),
            ),
            Resolution::Points(n) if n < 2 => Err(IntegrationError::InvalidTimeSpan(format!(
                "at least 2 points are required, got {n}"
            ))),
            _ if self.sample_count() > MAX_SAMPLES as f64 => {
                Err(IntegrationError::InvalidTimeSpan(format!(
                    "resolution asks for about {:.0} samples, at most {MAX_SAMPLES} are allowed",
                    self.sample_count()
                )))
            }
            _ => Ok(()),
        }
    }

    // Counted in f64 so huge requests are caught before anything is allocated.
    fn sample_count(&self) -> f64 {
        match self.resolution {
            Resolution::Points(n) => n as f64,
            Resolution::Step(h) => ((self.end - self.start) / h).floor() + 2.0,
        }
    }

    /// Checks that the initial condition lies at or before the start of the span.
    pub fn validate_initial(&self, initial: &InitialCondition) -> Result<(), IntegrationError> {
        if !initial.t0.is_finite() || !initial.y0.is_finite() {
            return Err(IntegrationError::InvalidTimeSpan(
                "initial condition must be finite".to_string(),
            ));
        }
        if initial.t0 > self.start {
            return Err(IntegrationError::InvalidTimeSpan(format!(
                "initial time t0 = {} lies after the span start {}",
                initial.t0, self.start
            )));
        }
        Ok(())
    }

    /// Output sample times, strictly increasing, first `start`, last exactly `end`.
    pub fn sample_times(&self) -> Result<Vec<f64>, IntegrationError> {
        self.validate()?;
        let length = self.end - self.start;
        let times = match self.resolution {
            Resolution::Points(n) => {
                let spacing = length / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.end
                        } else {
                            self.start + spacing * i as f64
                        }
                    })
                    .collect()
            }
            Resolution::Step(h) => {
                let full_steps = (length / h).floor() as usize;
                let mut times: Vec<f64> = (0..=full_steps)
                    .map(|i| self.start + h * i as f64)
                    .filter(|&t| t < self.end)
                    .collect();
                times.push(self.end);
                // Drop a sliver interval produced by rounding right before `end`.
                let n = times.len();
                if n > 2 && times[n - 1] - times[n - 2] < h * 1e-9 {
                    times.remove(n - 2);
                }
                times
            }
        };
        Ok(times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_reversed_and_empty_spans() {
        for (start, end) in [(5.0, 0.0), (1.0, 1.0), (f64::NAN, 1.0), (0.0, f64::INFINITY)] {
            let err = TimeSpan::new(start, end)
                .validate()
                .expect_err("invalid span");
            assert!(matches!(err, IntegrationError::InvalidTimeSpan(_)));
        }
    }

    #[test]
    fn validate_rejects_bad_resolution() {
        let span = TimeSpan::new(0.0, 1.0);
        assert!(span.with_resolution(Resolution::Step(0.0)).validate().is_err());
        assert!(span.with_resolution(Resolution::Step(-0.1)).validate().is_err());
        assert!(span.with_resolution(Resolution::Points(1)).validate().is_err());
        assert!(span.with_resolution(Resolution::Points(2)).validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_sample_counts() {
        let span = TimeSpan::new(0.0, 1.0);
        for resolution in [Resolution::Points(usize::MAX), Resolution::Points(MAX_SAMPLES + 1)] {
            let err = span.with_resolution(resolution).sample_times().expect_err("too many");
            assert!(err.to_string().contains("samples"), "{err}");
        }
        let err = TimeSpan::new(0.0, 10.0)
            .with_resolution(Resolution::Step(1e-9))
            .validate()
            .expect_err("tiny step over a long span");
        assert!(matches!(err, IntegrationError::InvalidTimeSpan(_)));
        assert!(span
            .with_resolution(Resolution::Points(MAX_SAMPLES))
            .validate()
            .is_ok());
    }

    #[test]
    fn validate_initial_requires_t0_at_or_before_start() {
        let span = TimeSpan::new(1.0, 2.0);
        assert!(span.validate_initial(&InitialCondition::new(1.0, 0.0)).is_ok());
        assert!(span.validate_initial(&InitialCondition::new(0.0, 0.0)).is_ok());
        assert!(span
            .validate_initial(&InitialCondition::new(1.5, 0.0))
            .is_err());
        assert!(span
            .validate_initial(&InitialCondition::new(1.0, f64::NAN))
            .is_err());
    }

    #[test]
    fn sample_times_by_points_hit_both_ends() {
        let times = TimeSpan::new(0.0, 10.0)
            .with_resolution(Resolution::Points(5))
            .sample_times()
            .expect("times");
        assert_eq!(times, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn sample_times_by_step_end_with_short_interval() {
        let times = TimeSpan::new(0.0, 1.0)
            .with_resolution(Resolution::Step(0.3))
            .sample_times()
            .expect("times");
        assert_eq!(times.len(), 5);
        assert_eq!(*times.last().expect("last"), 1.0);
        assert!((times[3] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn sample_times_by_step_do_not_duplicate_end() {
        let times = TimeSpan::new(0.0, 1.0)
            .with_resolution(Resolution::Step(0.25))
            .sample_times()
            .expect("times");
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn default_resolution_matches_form_default() {
        let times = TimeSpan::new(0.0, 10.0).sample_times().expect("times");
        assert_eq!(times.len(), 1000);
    }
}
