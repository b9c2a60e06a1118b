//! Configuration for simulation runs
//!
//! This module provides the time window and seed of a single run, and the settings used
//! when many independent runs are executed as a sweep.

use crate::core::error::{SimError, SimResult};
use crate::core::types::SimTime;
use serde::{Deserialize, Serialize};

/// Enumeration of supported execution modes for replications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Replications run one after another on the calling thread
    Sequential,
    /// Replications run concurrently on a Rayon thread pool
    Rayon,
}

impl Default for ConcurrencyMode {
    fn default() -> Self {
        ConcurrencyMode::Sequential
    }
}

/// Time window and seed of a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub start_time: SimTime,
    /// Horizon: no event after this time is processed
    pub end_time: SimTime,
    /// Seed of the random source; `None` draws one from OS entropy
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Create a configuration for the window `[start_time, end_time]`
    pub fn new(start_time: SimTime, end_time: SimTime) -> Self {
        Self {
            start_time,
            end_time,
            seed: None,
        }
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(SimError::Config(format!(
                "simulation window [{}, {}] must be finite",
                self.start_time, self.end_time
            )));
        }
        if self.end_time < self.start_time {
            return Err(SimError::Config(format!(
                "end time {} precedes start time {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Configuration for a batch of independent seeded runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub replications: usize,
    /// Replication `i` is seeded with `base_seed + i`
    pub base_seed: u64,
    pub concurrency_mode: ConcurrencyMode,
    /// Only relevant when concurrency_mode is Rayon
    pub thread_pool_size: Option<usize>,
}

impl SweepConfig {
    pub fn new(replications: usize, base_seed: u64) -> Self {
        Self {
            replications,
            base_seed,
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
        }
    }

    /// Set the concurrency mode for the sweep
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    /// Seeds of all replications in order
    pub fn seeds(&self) -> Vec<u64> {
        (0..self.replications as u64)
            .map(|i| self.base_seed.wrapping_add(i))
            .collect()
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.thread_pool_size == Some(0) {
            return Err(SimError::Config("thread pool size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sweep_is_sequential() {
        let config = SweepConfig::new(4, 10);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Sequential);
        assert_eq!(config.thread_pool_size, None);
        assert_eq!(config.seeds(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_sweep_builder() {
        let config = SweepConfig::new(2, 0)
            .with_concurrency(ConcurrencyMode::Rayon)
            .with_thread_pool_size(4);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Rayon);
        assert_eq!(config.thread_pool_size, Some(4));
        assert!(config.validate().is_ok());
        assert!(SweepConfig::new(2, 0).with_thread_pool_size(0).validate().is_err());
    }

    #[test]
    fn test_simulation_window_validation() {
        assert!(SimulationConfig::new(0.0, 100.0).validate().is_ok());
        assert!(SimulationConfig::new(0.0, 0.0).validate().is_ok());
        assert!(SimulationConfig::new(10.0, 5.0).validate().is_err());
        assert!(SimulationConfig::new(0.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_with_seed() {
        let config = SimulationConfig::new(0.0, 1.0).with_seed(99);
        assert_eq!(config.seed, Some(99));
    }
}
