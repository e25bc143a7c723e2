use serde::Serialize;

/// Step bookkeeping for one integration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: usize,
}

/// Ordered `(t, y)` samples produced by the integrator. All values are finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    times: Vec<f64>,
    values: Vec<f64>,
    pub stats: IntegrationStats,
}

impl Solution {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            times: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            stats: IntegrationStats::default(),
        }
    }

    pub(crate) fn push(&mut self, t: f64, y: f64) {
        self.times.push(t);
        self.values.push(y);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.times.last()?, *self.values.last()?))
    }

    /// Samples as `[t, y]` pairs, the shape plotting backends consume.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.samples().map(|(t, y)| [t, y]).collect()
    }
}
