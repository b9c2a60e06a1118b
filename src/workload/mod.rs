//! Label factory model built on the simulation kernel
//!
//! Orders arrive at random, optionally get a custom design, are printed after a
//! supervisor approves a sample, may be stamped, and are cut and finished. Printers are
//! periodically taken offline to replace their material.

pub mod config;
pub mod factory;
pub mod generators;
pub mod order;
pub mod selection;

pub use config::{
    FactoryConfig, HistogramLayout, MaterialReplacementConfig, MaterialShare, Probabilities,
    ResourceCounts, StageTimes,
};
pub use factory::{run_factory, Factory, FactoryRun, ORDER_DURATION_HISTOGRAM};
pub use generators::{MaterialReplacement, MaterialReplacementGenerator, OrderGenerator};
pub use order::{Order, OrderRecord};
pub use selection::shortest_queue;
