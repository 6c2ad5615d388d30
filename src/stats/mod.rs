//! Latency statistics.
//!
//! Two deviation calculations live here and are not interchangeable:
//! [`StatsAccumulator`] is a streaming Welford mean/variance, and
//! [`calc_deviation`] is the historical bounded-window figure printed in the
//! `rtt ... dev` summary line.

use std::collections::VecDeque;

/// Number of recent samples kept for the summary deviation.
pub const WINDOW_SIZE: usize = 100;

/// Running mean and variance over an unbounded stream, in constant space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample (Welford's update).
    pub fn ingest(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        // Old mean on the left factor, new mean on the right one.
        let delta = value - self.mean;
        let new_mean = self.mean + delta / self.count as f64;
        self.m2 += (value - self.mean) * (value - new_mean);
        self.mean = new_mean;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// Sample variance (Bessel corrected). 0.0 below two samples.
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Extend<f64> for StatsAccumulator {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.ingest(value);
        }
    }
}

impl FromIterator<f64> for StatsAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}

/// Deviation of `values` around an externally supplied `average`:
/// `sqrt((1 / (n - 1)) * (sum(|x - average|) / n))`, 0 below two values.
///
/// This is not the textbook sample standard deviation. Summary output has
/// always been computed this way, so it is kept as is.
pub fn calc_deviation<'a>(values: impl IntoIterator<Item = &'a f64>, average: f64) -> f64 {
    let (size, abs_sum) = values
        .into_iter()
        .fold((0usize, 0.0_f64), |(n, sum), v| (n + 1, sum + (v - average).abs()));
    if size < 2 {
        return 0.0;
    }

    ((1.0 / (size - 1) as f64) * (abs_sum / size as f64)).sqrt()
}

/// The most recent [`WINDOW_SIZE`] latency samples.
#[derive(Debug, Clone, Default)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
}

impl LatencyWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() == WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// [`calc_deviation`] over the window around its own mean.
    pub fn deviation(&self) -> f64 {
        calc_deviation(&self.samples, self.mean())
    }
}
