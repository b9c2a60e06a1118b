use crate::core::error::{SimError, SimResult};
use crate::core::execution::config::{ConcurrencyMode, SweepConfig};
use log::info;
use rayon::prelude::*;

/// Run one independent simulation per seed of `config` and collect the results in seed order.
///
/// `run` builds and drives its own engine from the seed it is given; nothing is shared
/// between replications, so the Rayon mode produces the same results as the sequential one.
pub fn run_replications<R, F>(config: &SweepConfig, run: F) -> SimResult<Vec<R>>
where
    F: Fn(u64) -> SimResult<R> + Sync + Send,
    R: Send,
{
    config.validate()?;
    let seeds = config.seeds();
    info!(
        "running {} replications ({:?}) from seed {}",
        seeds.len(),
        config.concurrency_mode,
        config.base_seed
    );

    match config.concurrency_mode {
        ConcurrencyMode::Sequential => seeds.into_iter().map(&run).collect(),
        ConcurrencyMode::Rayon => match config.thread_pool_size {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| SimError::Config(format!("cannot build thread pool: {}", e)))?;
                pool.install(|| seeds.par_iter().map(|&seed| run(seed)).collect())
            }
            None => seeds.par_iter().map(|&seed| run(seed)).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::RandomSource;

    fn draw(seed: u64) -> SimResult<f64> {
        let mut rng = RandomSource::new(seed);
        rng.exponential(10.0)
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let sequential = run_replications(&SweepConfig::new(8, 100), draw).unwrap();
        let parallel = run_replications(
            &SweepConfig::new(8, 100)
                .with_concurrency(ConcurrencyMode::Rayon)
                .with_thread_pool_size(3),
            draw,
        )
        .unwrap();
        assert_eq!(sequential.len(), 8);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_first_error_is_reported() {
        let result = run_replications(&SweepConfig::new(4, 0), |seed| {
            if seed == 2 {
                Err(SimError::Config("boom".to_string()))
            } else {
                Ok(seed)
            }
        });
        assert_eq!(result, Err(SimError::Config("boom".to_string())));
    }
}
