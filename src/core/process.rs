use super::error::{SimError, SimResult};
use super::random::RandomSource;
use super::resources::{Facility, Store};
use super::stats::Histogram;
use super::types::{
    FacilityId, HistogramId, Priority, ProcessId, SimTime, StoreId, DEFAULT_PRIORITY,
};

/// What a process asks the kernel to do when it hands control back.
///
/// `Wait`, `Seize` and `Enter` suspend the process. `Release` and `Leave` never do: the
/// kernel applies them and resumes the same process in the same instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Sleep for the given duration
    Wait(SimTime),
    /// Take a facility, queueing if it is held
    Seize(FacilityId),
    /// Give a held facility back
    Release(FacilityId),
    /// Take units from a store, queueing if they are not available
    Enter(StoreId, usize),
    /// Give units back to a store
    Leave(StoreId, usize),
    /// The body is complete
    Finish,
}

/// Sequential, suspendable workflow logic.
///
/// The kernel calls [`Process::resume`] each time the process is due. An implementation
/// is a state machine: it runs its current stage, stores where it has to continue, and
/// returns the [`Action`] that ends the stage. Fields of the implementing type survive
/// across suspensions.
pub trait Process {
    /// Run until the next action
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> SimResult<Action>;

    /// Priority used for calendar ties and resource queues
    fn priority(&self) -> Priority {
        DEFAULT_PRIORITY
    }

    /// Name used in logs
    fn name(&self) -> &str {
        "process"
    }
}

/// A process whose body is a closure, handy for small generators and tests
pub struct FnProcess<F> {
    name: String,
    priority: Priority,
    body: F,
}

impl<F> FnProcess<F>
where
    F: FnMut(&mut ProcessContext<'_>) -> SimResult<Action>,
{
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            priority: DEFAULT_PRIORITY,
            body,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

impl<F> Process for FnProcess<F>
where
    F: FnMut(&mut ProcessContext<'_>) -> SimResult<Action>,
{
    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> SimResult<Action> {
        (self.body)(ctx)
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A process created from inside another process, waiting to be registered
pub(crate) struct Spawned {
    pub id: ProcessId,
    pub at: SimTime,
    pub process: Box<dyn Process>,
}

/// View of the simulation handed to a process while it runs
pub struct ProcessContext<'a> {
    pub(crate) id: ProcessId,
    pub(crate) now: SimTime,
    pub(crate) rng: &'a mut RandomSource,
    pub(crate) facilities: &'a [Facility],
    pub(crate) stores: &'a [Store],
    pub(crate) histograms: &'a mut [Histogram],
    pub(crate) spawned: &'a mut Vec<Spawned>,
    pub(crate) next_process_id: &'a mut u64,
}

impl<'a> ProcessContext<'a> {
    /// Id of the running process
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Current simulation time
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn rng(&mut self) -> &mut RandomSource {
        self.rng
    }

    pub fn exponential(&mut self, mean: f64) -> SimResult<f64> {
        self.rng.exponential(mean)
    }

    pub fn uniform(&mut self, low: f64, high: f64) -> SimResult<f64> {
        self.rng.uniform(low, high)
    }

    pub fn uniform01(&mut self) -> f64 {
        self.rng.uniform01()
    }

    pub fn facility(&self, id: FacilityId) -> SimResult<&Facility> {
        self.facilities
            .get(id.0)
            .ok_or_else(|| SimError::UnknownResource(format!("facility #{}", id.0)))
    }

    pub fn store(&self, id: StoreId) -> SimResult<&Store> {
        self.stores
            .get(id.0)
            .ok_or_else(|| SimError::UnknownResource(format!("store #{}", id.0)))
    }

    /// Current wait-queue length of a facility
    pub fn queue_len(&self, id: FacilityId) -> SimResult<usize> {
        Ok(self.facility(id)?.queue_len())
    }

    /// Add a value to a histogram
    pub fn record(&mut self, id: HistogramId, value: f64) -> SimResult<()> {
        let histogram = self
            .histograms
            .get_mut(id.0)
            .ok_or_else(|| SimError::UnknownResource(format!("histogram #{}", id.0)))?;
        histogram.record(value);
        Ok(())
    }

    /// Create a process that first runs at the current instant
    pub fn activate(&mut self, process: Box<dyn Process>) -> ProcessId {
        self.push_spawn(process, self.now)
    }

    /// Create a process that first runs at `at`
    pub fn activate_at(&mut self, process: Box<dyn Process>, at: SimTime) -> SimResult<ProcessId> {
        if !(at >= self.now) {
            return Err(SimError::ScheduleInPast { at, now: self.now });
        }
        Ok(self.push_spawn(process, at))
    }

    fn push_spawn(&mut self, process: Box<dyn Process>, at: SimTime) -> ProcessId {
        let id = ProcessId(*self.next_process_id);
        *self.next_process_id += 1;
        self.spawned.push(Spawned { id, at, process });
        id
    }
}
