pub mod calendar;
pub mod error;
pub mod execution;
pub mod process;
pub mod random;
pub mod report;
pub mod resources;
pub mod stats;
pub mod types;
