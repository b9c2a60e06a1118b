use serde::{Deserialize, Serialize};

/// Simulated time. The unit is whatever the workload decides (the label factory uses minutes).
pub type SimTime = f64;

/// Scheduling priority. Higher values are served first.
pub type Priority = i32;

/// Default priority for processes that do not override [`Process::priority`].
///
/// [`Process::priority`]: crate::core::process::Process::priority
pub const DEFAULT_PRIORITY: Priority = 0;

/// Identifier of a process owned by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub(crate) u64);

impl ProcessId {
    /// Get the raw numeric id
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "process#{}", self.0)
    }
}

/// Handle for a facility registered with a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FacilityId(pub(crate) usize);

impl FacilityId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle for a store registered with a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreId(pub(crate) usize);

impl StoreId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle for a histogram registered with a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistogramId(pub(crate) usize);

impl HistogramId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle for a calendar entry, used to cancel it before it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub(crate) u64);

/// Life-cycle state of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Scheduled to run at the current instant
    Ready,
    /// Its body is executing
    Running,
    /// Queued on a facility or store
    Waiting,
    /// Sleeping until a future calendar entry fires
    SuspendedTimed,
    /// Body completed
    Finished,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Waiting => "waiting",
            ProcessState::SuspendedTimed => "suspended",
            ProcessState::Finished => "finished",
        };
        f.write_str(name)
    }
}
