pub mod config;
pub mod simulation_engine;
pub mod sweep;

// Re-export commonly used types
pub use config::{ConcurrencyMode, SimulationConfig, SweepConfig};
pub use simulation_engine::{SimulationEngine, SimulationObserver};
pub use sweep::run_replications;
