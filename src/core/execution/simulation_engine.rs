use crate::core::calendar::EventCalendar;
use crate::core::error::{SimError, SimResult};
use crate::core::execution::config::SimulationConfig;
use crate::core::process::{Action, Process, ProcessContext};
use crate::core::random::RandomSource;
use crate::core::report::{RunSummary, SimulationReport};
use crate::core::resources::{EnterOutcome, Facility, SeizeOutcome, Store};
use crate::core::stats::Histogram;
use crate::core::types::{
    EventId, FacilityId, HistogramId, Priority, ProcessId, ProcessState, SimTime, StoreId,
};
use log::{debug, info, trace};
use std::collections::HashMap;
use uuid::Uuid;

/// Observer trait for simulation events
pub trait SimulationObserver {
    /// Called when the clock jumps forward
    fn on_clock_advance(&mut self, _old_time: SimTime, _new_time: SimTime) {}

    /// Called right before a process is resumed from a calendar entry
    fn on_resume(&mut self, _time: SimTime, _process: ProcessId) {}
}

struct ProcessSlot {
    /// `None` while the body is executing
    body: Option<Box<dyn Process>>,
    name: String,
    priority: Priority,
    state: ProcessState,
    pending: Option<EventId>,
}

/// What the engine does with a process after applying one of its actions
enum Flow {
    Continue,
    Suspend(ProcessState),
    Finished,
}

/// Simulation context: clock, calendar, processes, resources and statistics of one run.
///
/// Everything a run mutates lives here, so independent runs never share state.
pub struct SimulationEngine {
    run_id: Uuid,
    config: SimulationConfig,
    seed: u64,
    clock: SimTime,
    calendar: EventCalendar,
    rng: RandomSource,
    processes: HashMap<ProcessId, ProcessSlot>,
    next_process_id: u64,
    facilities: Vec<Facility>,
    stores: Vec<Store>,
    histograms: Vec<Histogram>,
    observers: Vec<Box<dyn SimulationObserver>>,
    summary: RunSummary,
}

impl SimulationEngine {
    /// Create an engine for the window and seed in `config`
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => RandomSource::new(seed),
            None => RandomSource::from_entropy(),
        };
        let seed = rng.seed();

        Ok(Self {
            run_id: Uuid::new_v4(),
            clock: config.start_time,
            seed,
            config,
            calendar: EventCalendar::new(),
            rng,
            processes: HashMap::new(),
            next_process_id: 0,
            facilities: Vec::new(),
            stores: Vec::new(),
            histograms: Vec::new(),
            observers: Vec::new(),
            summary: RunSummary::default(),
        })
    }

    /// Reset clock, calendar, processes and all statistics, and set a new window.
    ///
    /// Registered facilities, stores and histograms are kept but emptied.
    pub fn init(&mut self, start_time: SimTime, end_time: SimTime) -> SimResult<()> {
        let config = SimulationConfig {
            start_time,
            end_time,
            seed: self.config.seed,
        };
        config.validate()?;

        self.config = config;
        self.clock = start_time;
        self.calendar.clear();
        self.processes.clear();
        self.summary = RunSummary::default();
        for facility in &mut self.facilities {
            facility.clear(start_time);
        }
        for store in &mut self.stores {
            store.clear(start_time);
        }
        for histogram in &mut self.histograms {
            histogram.clear();
        }
        debug!("simulation {} initialized for [{}, {}]", self.run_id, start_time, end_time);
        Ok(())
    }

    /// Add an observer to the simulation
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current simulation time
    pub fn now(&self) -> SimTime {
        self.clock
    }

    pub fn start_time(&self) -> SimTime {
        self.config.start_time
    }

    pub fn end_time(&self) -> SimTime {
        self.config.end_time
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    // ---- resources ----

    pub fn add_facility(&mut self, name: impl Into<String>) -> FacilityId {
        self.facilities.push(Facility::new(name, self.clock));
        FacilityId(self.facilities.len() - 1)
    }

    /// Add `count` interchangeable facilities named "`prefix` 1" .. "`prefix` count"
    pub fn add_facilities(&mut self, prefix: &str, count: usize) -> Vec<FacilityId> {
        (1..=count)
            .map(|i| self.add_facility(format!("{} {}", prefix, i)))
            .collect()
    }

    pub fn add_store(&mut self, name: impl Into<String>, capacity: usize) -> SimResult<StoreId> {
        self.stores.push(Store::new(name, capacity, self.clock)?);
        Ok(StoreId(self.stores.len() - 1))
    }

    pub fn add_histogram(
        &mut self,
        name: impl Into<String>,
        lower_bound: f64,
        bucket_width: f64,
        bucket_count: usize,
    ) -> SimResult<HistogramId> {
        self.histograms
            .push(Histogram::new(name, lower_bound, bucket_width, bucket_count)?);
        Ok(HistogramId(self.histograms.len() - 1))
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

    pub fn histogram(&self, id: HistogramId) -> SimResult<&Histogram> {
        self.histograms
            .get(id.0)
            .ok_or_else(|| SimError::UnknownResource(format!("histogram #{}", id.0)))
    }

    pub fn record(&mut self, id: HistogramId, value: f64) -> SimResult<()> {
        self.histograms
            .get_mut(id.0)
            .ok_or_else(|| SimError::UnknownResource(format!("histogram #{}", id.0)))?
            .record(value);
        Ok(())
    }

    // ---- processes ----

    /// Register a process and schedule its first resumption now
    pub fn spawn(&mut self, process: Box<dyn Process>) -> ProcessId {
        let id = self.allocate_process_id();
        self.register(id, process, self.clock);
        id
    }

    /// Register a process and schedule its first resumption at `at`
    pub fn spawn_at(&mut self, process: Box<dyn Process>, at: SimTime) -> SimResult<ProcessId> {
        self.check_not_past(at)?;
        let id = self.allocate_process_id();
        self.register(id, process, at);
        Ok(id)
    }

    /// Move a ready or sleeping process to `at`, replacing its pending wake-up
    pub fn schedule(&mut self, process: ProcessId, at: SimTime) -> SimResult<()> {
        self.check_not_past(at)?;
        let slot = self
            .processes
            .get_mut(&process)
            .ok_or(SimError::UnknownProcess { process })?;
        match slot.state {
            ProcessState::Ready | ProcessState::SuspendedTimed => {}
            state => {
                return Err(SimError::NotSchedulable {
                    process,
                    state: state.to_string(),
                })
            }
        }

        if let Some(pending) = slot.pending.take() {
            self.calendar.cancel(pending);
        }
        let entry = self.calendar.insert(at, slot.priority, process);
        slot.pending = Some(entry);
        slot.state = if at == self.clock {
            ProcessState::Ready
        } else {
            ProcessState::SuspendedTimed
        };
        Ok(())
    }

    pub fn process_state(&self, process: ProcessId) -> Option<ProcessState> {
        self.processes.get(&process).map(|slot| slot.state)
    }

    /// Number of processes that have not finished
    pub fn active_processes(&self) -> usize {
        self.processes.len()
    }

    /// Names of the facilities and stores `process` currently holds
    pub fn held_resources(&self, process: ProcessId) -> Vec<String> {
        let facilities = self
            .facilities
            .iter()
            .filter(|f| f.holder() == Some(process))
            .map(|f| f.name().to_string());
        let stores = self
            .stores
            .iter()
            .filter(|s| s.held_by(process) > 0)
            .map(|s| s.name().to_string());
        facilities.chain(stores).collect()
    }

    // ---- main loop ----

    /// Run until the calendar is empty or the next event lies beyond the horizon.
    ///
    /// Processes still waiting at the horizon are abandoned together with their pending
    /// wake-ups.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        info!(
            "simulation {} running [{}, {}] with seed {}",
            self.run_id, self.config.start_time, self.config.end_time, self.seed
        );

        while !self.calendar.is_empty() {
            self.step()?;
        }

        self.summary.final_time = self.clock;
        self.summary.processes_abandoned = self.processes.len() as u64;
        info!(
            "simulation {} finished at {}: {} events, {} processes finished, {} abandoned",
            self.run_id,
            self.clock,
            self.summary.events_processed,
            self.summary.processes_finished,
            self.summary.processes_abandoned
        );
        Ok(self.summary.clone())
    }

    /// Process one calendar entry, returns true if entries remain.
    ///
    /// If the earliest entry lies beyond the horizon nothing is resumed: the clock moves to
    /// the end time, every pending entry is dropped and false is returned.
    pub fn step(&mut self) -> SimResult<bool> {
        let next_time = self
            .calendar
            .peek_earliest()
            .map(|entry| entry.wake_time)
            .ok_or(SimError::EmptyCalendar)?;
        if next_time > self.config.end_time {
            self.stop_at_horizon();
            return Ok(false);
        }

        let entry = self.calendar.pop_earliest().ok_or(SimError::EmptyCalendar)?;
        self.advance_clock(entry.wake_time);
        self.summary.events_processed += 1;

        let slot = self
            .processes
            .get_mut(&entry.target)
            .ok_or(SimError::UnknownProcess {
                process: entry.target,
            })?;
        slot.pending = None;

        for observer in &mut self.observers {
            observer.on_resume(self.clock, entry.target);
        }
        self.resume(entry.target)?;

        Ok(!self.calendar.is_empty())
    }

    fn stop_at_horizon(&mut self) {
        debug!(
            "simulation {} reached its horizon {} with {} processes left",
            self.run_id,
            self.config.end_time,
            self.processes.len()
        );
        self.advance_clock(self.config.end_time);
        self.summary.stopped_at_horizon = true;
        self.calendar.clear();
    }

    fn advance_clock(&mut self, time: SimTime) {
        if time > self.clock {
            let old = self.clock;
            self.clock = time;
            for observer in &mut self.observers {
                observer.on_clock_advance(old, time);
            }
        }
    }

    /// Drive one process until it suspends or finishes
    fn resume(&mut self, id: ProcessId) -> SimResult<()> {
        let slot = self
            .processes
            .get_mut(&id)
            .ok_or(SimError::UnknownProcess { process: id })?;
        let mut body = slot.body.take().ok_or(SimError::UnknownProcess { process: id })?;
        slot.state = ProcessState::Running;
        let priority = slot.priority;
        trace!("resuming {} ({}) at {}", id, slot.name, self.clock);

        loop {
            let mut spawned = Vec::new();
            let action = {
                let mut ctx = ProcessContext {
                    id,
                    now: self.clock,
                    rng: &mut self.rng,
                    facilities: &self.facilities,
                    stores: &self.stores,
                    histograms: &mut self.histograms,
                    spawned: &mut spawned,
                    next_process_id: &mut self.next_process_id,
                };
                body.resume(&mut ctx)
            };
            for child in spawned {
                self.register(child.id, child.process, child.at);
            }

            let flow = match action.and_then(|action| self.apply(id, priority, action)) {
                Ok(flow) => flow,
                Err(err) => {
                    self.put_back(id, body, ProcessState::Running);
                    return Err(err);
                }
            };

            match flow {
                Flow::Continue => continue,
                Flow::Suspend(state) => {
                    self.put_back(id, body, state);
                    return Ok(());
                }
                Flow::Finished => {
                    let held = self.held_resources(id);
                    if let Some(resource) = held.into_iter().next() {
                        self.put_back(id, body, ProcessState::Finished);
                        return Err(SimError::FinishedHoldingResource {
                            process: id,
                            resource,
                        });
                    }
                    if let Some(slot) = self.processes.remove(&id) {
                        debug!("{} ({}) finished at {}", id, slot.name, self.clock);
                    }
                    self.summary.processes_finished += 1;
                    return Ok(());
                }
            }
        }
    }

    fn apply(&mut self, id: ProcessId, priority: Priority, action: Action) -> SimResult<Flow> {
        let now = self.clock;
        match action {
            Action::Wait(delay) => {
                if !delay.is_finite() || delay < 0.0 {
                    return Err(SimError::InvalidDelay { process: id, delay });
                }
                self.wake_at(id, now + delay);
                Ok(Flow::Suspend(if delay > 0.0 {
                    ProcessState::SuspendedTimed
                } else {
                    ProcessState::Ready
                }))
            }
            Action::Seize(facility_id) => {
                let facility = self
                    .facilities
                    .get_mut(facility_id.0)
                    .ok_or_else(|| SimError::UnknownResource(format!("facility #{}", facility_id.0)))?;
                match facility.seize(id, priority, now)? {
                    SeizeOutcome::Granted => {
                        // yield once so other processes due now keep their turn
                        self.wake_at(id, now);
                        Ok(Flow::Suspend(ProcessState::Ready))
                    }
                    SeizeOutcome::Queued => Ok(Flow::Suspend(ProcessState::Waiting)),
                }
            }
            Action::Release(facility_id) => {
                let facility = self
                    .facilities
                    .get_mut(facility_id.0)
                    .ok_or_else(|| SimError::UnknownResource(format!("facility #{}", facility_id.0)))?;
                if let Some(next) = facility.release(id, now)? {
                    self.grant(next);
                }
                Ok(Flow::Continue)
            }
            Action::Enter(store_id, units) => {
                if units == 0 {
                    return Err(SimError::Config(format!(
                        "{} tried to enter a store with zero units",
                        id
                    )));
                }
                let store = self
                    .stores
                    .get_mut(store_id.0)
                    .ok_or_else(|| SimError::UnknownResource(format!("store #{}", store_id.0)))?;
                match store.enter(id, units, priority, now)? {
                    EnterOutcome::Admitted => {
                        self.wake_at(id, now);
                        Ok(Flow::Suspend(ProcessState::Ready))
                    }
                    EnterOutcome::Queued => Ok(Flow::Suspend(ProcessState::Waiting)),
                }
            }
            Action::Leave(store_id, units) => {
                let store = self
                    .stores
                    .get_mut(store_id.0)
                    .ok_or_else(|| SimError::UnknownResource(format!("store #{}", store_id.0)))?;
                for admitted in store.leave(id, units, now)? {
                    self.grant(admitted);
                }
                Ok(Flow::Continue)
            }
            Action::Finish => Ok(Flow::Finished),
        }
    }

    /// Wake a process whose resource request was just satisfied
    fn grant(&mut self, process: ProcessId) {
        if let Some(slot) = self.processes.get_mut(&process) {
            slot.state = ProcessState::Ready;
        }
        self.wake_at(process, self.clock);
    }

    fn wake_at(&mut self, process: ProcessId, at: SimTime) {
        if let Some(slot) = self.processes.get_mut(&process) {
            let entry = self.calendar.insert(at, slot.priority, process);
            slot.pending = Some(entry);
        }
    }

    fn put_back(&mut self, id: ProcessId, body: Box<dyn Process>, state: ProcessState) {
        if let Some(slot) = self.processes.get_mut(&id) {
            slot.body = Some(body);
            slot.state = state;
        }
    }

    fn register(&mut self, id: ProcessId, process: Box<dyn Process>, at: SimTime) {
        let priority = process.priority();
        let name = process.name().to_string();
        let entry = self.calendar.insert(at, priority, id);
        let state = if at > self.clock {
            ProcessState::SuspendedTimed
        } else {
            ProcessState::Ready
        };
        trace!("registered {} ({}) for {}", id, name, at);
        self.processes.insert(
            id,
            ProcessSlot {
                body: Some(process),
                name,
                priority,
                state,
                pending: Some(entry),
            },
        );
        self.summary.processes_spawned += 1;
    }

    fn allocate_process_id(&mut self) -> ProcessId {
        let id = ProcessId(self.next_process_id);
        self.next_process_id += 1;
        id
    }

    fn check_not_past(&self, at: SimTime) -> SimResult<()> {
        if at >= self.clock {
            Ok(())
        } else {
            Err(SimError::ScheduleInPast { at, now: self.clock })
        }
    }

    // ---- reporting ----

    /// Snapshot of every resource and histogram. Does not touch any statistic.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            run_id: self.run_id,
            seed: self.seed,
            start_time: self.config.start_time,
            time: self.clock,
            summary: self.summary.clone(),
            histograms: self.histograms.iter().map(|h| h.report()).collect(),
            stores: self.stores.iter().map(|s| s.report(self.clock)).collect(),
            facilities: self.facilities.iter().map(|f| f.report(self.clock)).collect(),
        }
    }
}
