use super::types::{ProcessId, SimTime};
use thiserror::Error;

/// Errors raised by the simulation kernel.
///
/// Configuration and random-source errors are authoring mistakes reported at the call that
/// made them. Protocol violations abort the run that hit them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store '{store}' must have a positive capacity")]
    InvalidCapacity { store: String },

    #[error("histogram '{name}' is invalid: {reason}")]
    InvalidHistogram { name: String, reason: String },

    #[error("invalid distribution parameter: {0}")]
    InvalidDistribution(String),

    #[error("{process} requested a delay of {delay}, delays must be finite and non-negative")]
    InvalidDelay { process: ProcessId, delay: SimTime },

    #[error("cannot schedule at {at}, the clock is already at {now}")]
    ScheduleInPast { at: SimTime, now: SimTime },

    #[error("{process} is unknown to this simulation")]
    UnknownProcess { process: ProcessId },

    #[error("{process} is {state} and cannot be rescheduled")]
    NotSchedulable { process: ProcessId, state: String },

    #[error("facility '{facility}' released by {process}, which does not hold it")]
    ReleaseByNonHolder { facility: String, process: ProcessId },

    #[error("{process} seized facility '{facility}' which it already holds")]
    DoubleSeize { facility: String, process: ProcessId },

    #[error("{process} left store '{store}' with {units} units but holds only {held}")]
    LeaveWithoutHolding {
        store: String,
        process: ProcessId,
        units: usize,
        held: usize,
    },

    #[error("{process} requested {units} units from store '{store}' of capacity {capacity}")]
    RequestExceedsCapacity {
        store: String,
        process: ProcessId,
        units: usize,
        capacity: usize,
    },

    #[error("{process} finished while still holding '{resource}'")]
    FinishedHoldingResource { process: ProcessId, resource: String },

    #[error("no resource registered under {0}")]
    UnknownResource(String),

    #[error("the event calendar is empty")]
    EmptyCalendar,
}

pub type SimResult<T> = Result<T, SimError>;
