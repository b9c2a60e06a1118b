use super::wait_queue::{QueueReport, WaitQueue};
use crate::core::error::{SimError, SimResult};
use crate::core::types::{Priority, ProcessId, SimTime};
use log::debug;
use serde::{Deserialize, Serialize};

/// Result of a seize request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeizeOutcome {
    /// The facility was free and now belongs to the caller
    Granted,
    /// The caller joined the wait queue
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Holder {
    process: ProcessId,
    since: SimTime,
}

/// Exclusive-use resource: at most one holder, everybody else waits in a priority queue
#[derive(Debug, Clone)]
pub struct Facility {
    name: String,
    holder: Option<Holder>,
    queue: WaitQueue<()>,
    stats_start: SimTime,
    busy_time: f64,
    requests: u64,
}

impl Facility {
    pub fn new(name: impl Into<String>, now: SimTime) -> Self {
        Self {
            name: name.into(),
            holder: None,
            queue: WaitQueue::new(now),
            stats_start: now,
            busy_time: 0.0,
            requests: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_busy(&self) -> bool {
        self.holder.is_some()
    }

    pub fn holder(&self) -> Option<ProcessId> {
        self.holder.map(|h| h.process)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Take the facility or join its queue
    pub fn seize(
        &mut self,
        process: ProcessId,
        priority: Priority,
        now: SimTime,
    ) -> SimResult<SeizeOutcome> {
        if self.holder() == Some(process) || self.queue.contains(process) {
            return Err(SimError::DoubleSeize {
                facility: self.name.clone(),
                process,
            });
        }

        self.requests += 1;
        if self.holder.is_none() {
            self.holder = Some(Holder { process, since: now });
            debug!("[{}] seized by {} at {}", self.name, process, now);
            Ok(SeizeOutcome::Granted)
        } else {
            self.queue.push(process, priority, (), now);
            debug!(
                "[{}] busy, {} queued at {} (queue length {})",
                self.name,
                process,
                now,
                self.queue.len()
            );
            Ok(SeizeOutcome::Queued)
        }
    }

    /// Give the facility up. Returns the waiter that was granted it, if any.
    pub fn release(&mut self, process: ProcessId, now: SimTime) -> SimResult<Option<ProcessId>> {
        let holder = match self.holder {
            Some(holder) if holder.process == process => holder,
            _ => {
                return Err(SimError::ReleaseByNonHolder {
                    facility: self.name.clone(),
                    process,
                })
            }
        };

        self.busy_time += now - holder.since.max(self.stats_start);
        self.holder = None;
        debug!("[{}] released by {} at {}", self.name, process, now);

        let next = self.queue.pop_front(now).map(|waiter| {
            self.holder = Some(Holder {
                process: waiter.process,
                since: now,
            });
            debug!("[{}] granted to waiting {} at {}", self.name, waiter.process, now);
            waiter.process
        });
        Ok(next)
    }

    /// Reset the facility to Free with an empty queue and fresh statistics
    pub fn clear(&mut self, now: SimTime) {
        self.holder = None;
        self.queue.clear(now);
        self.stats_start = now;
        self.busy_time = 0.0;
        self.requests = 0;
    }

    /// Accumulated busy time up to `now`, counting a hold still in progress
    pub fn busy_time_until(&self, now: SimTime) -> f64 {
        let in_flight = self
            .holder
            .map(|h| (now - h.since.max(self.stats_start)).max(0.0))
            .unwrap_or(0.0);
        self.busy_time + in_flight
    }

    pub fn report(&self, now: SimTime) -> FacilityReport {
        let span = now - self.stats_start;
        let busy_time = self.busy_time_until(now);
        FacilityReport {
            name: self.name.clone(),
            busy: self.is_busy(),
            holder: self.holder(),
            interval: (self.stats_start, now),
            requests: self.requests,
            busy_time,
            utilization: if span > 0.0 { busy_time / span } else { 0.0 },
            queue: self.queue.report(now),
        }
    }
}

/// Structured output of a facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityReport {
    pub name: String,
    pub busy: bool,
    pub holder: Option<ProcessId>,
    pub interval: (SimTime, SimTime),
    /// Seize requests, granted or queued
    pub requests: u64,
    pub busy_time: f64,
    /// Fraction of the interval the facility was held
    pub utilization: f64,
    pub queue: QueueReport,
}
