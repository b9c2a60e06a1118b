use super::error::{SimError, SimResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

/// Seedable stream of random draws shared by every stochastic step of a simulation.
///
/// All draws of one run come from this single generator so a run is fully determined by
/// its seed and the order in which processes ask for numbers.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
    seed: u64,
}

impl RandomSource {
    /// Create a source seeded with `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create a source seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Restart the stream from `seed`
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Seed the stream was last (re)started from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Exponentially distributed draw with the given mean
    pub fn exponential(&mut self, mean: f64) -> SimResult<f64> {
        if !mean.is_finite() || mean <= 0.0 {
            return Err(SimError::InvalidDistribution(format!(
                "exponential mean must be positive and finite, got {}",
                mean
            )));
        }
        let exp = Exp::new(1.0 / mean)
            .map_err(|e| SimError::InvalidDistribution(format!("exponential({}): {}", mean, e)))?;
        Ok(exp.sample(&mut self.rng))
    }

    /// Uniform draw from `[low, high)`. A degenerate range `low == high` yields `low`.
    pub fn uniform(&mut self, low: f64, high: f64) -> SimResult<f64> {
        if !low.is_finite() || !high.is_finite() {
            return Err(SimError::InvalidDistribution(format!(
                "uniform bounds must be finite, got [{}, {})",
                low, high
            )));
        }
        if low > high {
            return Err(SimError::InvalidDistribution(format!(
                "uniform lower bound {} exceeds upper bound {}",
                low, high
            )));
        }
        if low == high {
            return Ok(low);
        }
        if !(high - low).is_finite() {
            return Err(SimError::InvalidDistribution(format!(
                "uniform range [{}, {}) is too wide to sample",
                low, high
            )));
        }
        Ok(self.rng.gen_range(low..high))
    }

    /// Uniform draw from `[0, 1)`
    pub fn uniform01(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new(0)
    }
}
