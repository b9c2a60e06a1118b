use crate::core::types::SimTime;
use serde::{Deserialize, Serialize};

/// Time-weighted accumulator for a piecewise-constant quantity such as a queue length.
///
/// The quantity holds its last recorded value until the next update; averages integrate
/// that step function from the moment the statistic was started.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStat {
    start: SimTime,
    last_time: SimTime,
    value: f64,
    integral: f64,
    min: f64,
    max: f64,
}

impl TimeStat {
    /// Start observing at `start` with an initial value
    pub fn new(start: SimTime, initial: f64) -> Self {
        Self {
            start,
            last_time: start,
            value: initial,
            integral: 0.0,
            min: initial,
            max: initial,
        }
    }

    /// Record that the quantity changed to `value` at time `now`
    pub fn update(&mut self, value: f64, now: SimTime) {
        debug_assert!(now >= self.last_time, "time-weighted statistic went back in time");
        self.integral += self.value * (now - self.last_time);
        self.last_time = now;
        self.value = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Integral of the quantity over `[start, now]`, including the still-open segment
    pub fn integral_until(&self, now: SimTime) -> f64 {
        self.integral + self.value * (now - self.last_time).max(0.0)
    }

    /// Mean over `[start, now]`, or the current value if no time has passed
    pub fn mean_until(&self, now: SimTime) -> f64 {
        let span = now - self.start;
        if span > 0.0 {
            self.integral_until(now) / span
        } else {
            self.value
        }
    }

    pub fn report(&self, now: SimTime) -> TimeReport {
        TimeReport {
            start: self.start,
            end: now,
            current: self.value,
            min: self.min,
            max: self.max,
            mean: self.mean_until(now),
        }
    }
}

/// Snapshot of a [`TimeStat`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeReport {
    pub start: SimTime,
    pub end: SimTime,
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}
