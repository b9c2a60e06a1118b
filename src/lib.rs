pub mod core;
pub mod workload;

// Re-export commonly used types
pub use crate::core::error::{SimError, SimResult};
pub use crate::core::execution::{
    run_replications, ConcurrencyMode, SimulationConfig, SimulationEngine, SimulationObserver,
    SweepConfig,
};
pub use crate::core::process::{Action, FnProcess, Process, ProcessContext};
pub use crate::core::random::RandomSource;
pub use crate::core::report::{RunSummary, SimulationReport};
pub use crate::core::types::{
    FacilityId, HistogramId, Priority, ProcessId, ProcessState, SimTime, StoreId,
};
pub use crate::workload::{run_factory, FactoryConfig, FactoryRun};
