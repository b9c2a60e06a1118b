use super::sample::{SampleReport, SampleStat};
use crate::core::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Fixed-width histogram with underflow and overflow counters.
///
/// Bucket `i` covers `[lower_bound + i * bucket_width, lower_bound + (i + 1) * bucket_width)`.
#[derive(Debug, Clone)]
pub struct Histogram {
    name: String,
    lower_bound: f64,
    bucket_width: f64,
    buckets: Vec<u64>,
    underflow: u64,
    overflow: u64,
    /// Every recorded value, NaN included
    total: u64,
    /// Summary of the values that are not NaN
    stat: SampleStat,
}

impl Histogram {
    /// Create a histogram. Fails on a non-positive width or zero buckets.
    pub fn new(
        name: impl Into<String>,
        lower_bound: f64,
        bucket_width: f64,
        bucket_count: usize,
    ) -> SimResult<Self> {
        let name = name.into();
        if !lower_bound.is_finite() {
            return Err(SimError::InvalidHistogram {
                name,
                reason: format!("lower bound must be finite, got {}", lower_bound),
            });
        }
        if !bucket_width.is_finite() || bucket_width <= 0.0 {
            return Err(SimError::InvalidHistogram {
                name,
                reason: format!("bucket width must be positive, got {}", bucket_width),
            });
        }
        if bucket_count == 0 {
            return Err(SimError::InvalidHistogram {
                name,
                reason: "bucket count must be at least 1".to_string(),
            });
        }

        Ok(Self {
            name,
            lower_bound,
            bucket_width,
            buckets: vec![0; bucket_count],
            underflow: 0,
            overflow: 0,
            total: 0,
            stat: SampleStat::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record one value. NaN is counted as overflow and kept out of the summary.
    pub fn record(&mut self, value: f64) {
        self.total += 1;
        if !value.is_nan() {
            self.stat.record(value);
        }

        let index = ((value - self.lower_bound) / self.bucket_width).floor();
        if index < 0.0 {
            self.underflow += 1;
        } else if index < self.buckets.len() as f64 {
            self.buckets[index as usize] += 1;
        } else {
            // NaN lands here too
            self.overflow += 1;
        }
    }

    pub fn count(&self) -> u64 {
        self.total
    }

    pub fn bucket_counts(&self) -> &[u64] {
        &self.buckets
    }

    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn stat(&self) -> &SampleStat {
        &self.stat
    }

    /// Forget all recorded values
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(|b| *b = 0);
        self.underflow = 0;
        self.overflow = 0;
        self.total = 0;
        self.stat.clear();
    }

    pub fn report(&self) -> HistogramReport {
        let total = self.total;
        let relative = |n: u64| if total > 0 { n as f64 / total as f64 } else { 0.0 };

        let mut running = self.underflow;
        let buckets = self
            .buckets
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                running += count;
                let from = self.lower_bound + i as f64 * self.bucket_width;
                BucketReport {
                    from,
                    to: from + self.bucket_width,
                    count,
                    relative: relative(count),
                    cumulative: relative(running),
                }
            })
            .collect();

        HistogramReport {
            name: self.name.clone(),
            lower_bound: self.lower_bound,
            bucket_width: self.bucket_width,
            bucket_count: self.buckets.len(),
            underflow: self.underflow,
            overflow: self.overflow,
            buckets,
            summary: self.stat.report(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketReport {
    pub from: f64,
    pub to: f64,
    pub count: u64,
    pub relative: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramReport {
    pub name: String,
    pub lower_bound: f64,
    pub bucket_width: f64,
    pub bucket_count: usize,
    pub underflow: u64,
    pub overflow: u64,
    pub buckets: Vec<BucketReport>,
    pub summary: SampleReport,
}
