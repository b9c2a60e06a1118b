use super::wait_queue::{QueueReport, WaitQueue};
use crate::core::error::{SimError, SimResult};
use crate::core::stats::TimeStat;
use crate::core::types::{Priority, ProcessId, SimTime};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of an enter request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    Admitted,
    Queued,
}

/// Counting pool with a fixed capacity, e.g. a team of designers
#[derive(Debug, Clone)]
pub struct Store {
    name: String,
    capacity: usize,
    used: usize,
    holders: BTreeMap<ProcessId, usize>,
    queue: WaitQueue<usize>,
    usage: TimeStat,
    enters: u64,
}

impl Store {
    /// Create a store. A zero capacity is rejected.
    pub fn new(name: impl Into<String>, capacity: usize, now: SimTime) -> SimResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimError::InvalidCapacity { store: name });
        }
        Ok(Self {
            name,
            capacity,
            used: 0,
            holders: BTreeMap::new(),
            queue: WaitQueue::new(now),
            usage: TimeStat::new(now, 0.0),
            enters: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn free(&self) -> usize {
        self.capacity - self.used
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Units currently held by `process`
    pub fn held_by(&self, process: ProcessId) -> usize {
        self.holders.get(&process).copied().unwrap_or(0)
    }

    /// Sum of units held by every holder; always equal to [`Store::used`]
    pub fn held_total(&self) -> usize {
        self.holders.values().sum()
    }

    /// Take `units` from the pool or queue for them
    pub fn enter(
        &mut self,
        process: ProcessId,
        units: usize,
        priority: Priority,
        now: SimTime,
    ) -> SimResult<EnterOutcome> {
        if units > self.capacity {
            return Err(SimError::RequestExceedsCapacity {
                store: self.name.clone(),
                process,
                units,
                capacity: self.capacity,
            });
        }

        if units <= self.free() {
            self.admit(process, units, now);
            Ok(EnterOutcome::Admitted)
        } else {
            self.queue.push(process, priority, units, now);
            debug!(
                "[{}] {} queued for {} units at {} ({} of {} used)",
                self.name, process, units, now, self.used, self.capacity
            );
            Ok(EnterOutcome::Queued)
        }
    }

    /// Return `units` to the pool and admit queued requests that now fit, in queue order.
    ///
    /// Admission stops at the first request that does not fit.
    pub fn leave(&mut self, process: ProcessId, units: usize, now: SimTime) -> SimResult<Vec<ProcessId>> {
        let held = self.held_by(process);
        if units == 0 || units > held {
            return Err(SimError::LeaveWithoutHolding {
                store: self.name.clone(),
                process,
                units,
                held,
            });
        }

        if held == units {
            self.holders.remove(&process);
        } else {
            self.holders.insert(process, held - units);
        }
        self.used -= units;
        self.usage.update(self.used as f64, now);
        debug!("[{}] {} returned {} units at {}", self.name, process, units, now);

        let mut admitted = Vec::new();
        while let Some(front) = self.queue.front() {
            if front.request > self.free() {
                break;
            }
            if let Some(waiter) = self.queue.pop_front(now) {
                self.admit(waiter.process, waiter.request, now);
                admitted.push(waiter.process);
            }
        }
        Ok(admitted)
    }

    fn admit(&mut self, process: ProcessId, units: usize, now: SimTime) {
        *self.holders.entry(process).or_insert(0) += units;
        self.used += units;
        self.enters += 1;
        self.usage.update(self.used as f64, now);
        debug!(
            "[{}] {} admitted with {} units at {} ({} of {} used)",
            self.name, process, units, now, self.used, self.capacity
        );
    }

    /// Empty the pool and the queue and restart statistics at `now`
    pub fn clear(&mut self, now: SimTime) {
        self.used = 0;
        self.holders.clear();
        self.queue.clear(now);
        self.usage = TimeStat::new(now, 0.0);
        self.enters = 0;
    }

    pub fn report(&self, now: SimTime) -> StoreReport {
        let usage = self.usage.report(now);
        StoreReport {
            name: self.name.clone(),
            capacity: self.capacity,
            used: self.used,
            interval: (usage.start, now),
            enters: self.enters,
            min_used: usage.min as usize,
            max_used: usage.max as usize,
            mean_used: usage.mean,
            utilization: usage.mean / self.capacity as f64,
            queue: self.queue.report(now),
        }
    }
}

/// Structured output of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReport {
    pub name: String,
    pub capacity: usize,
    pub used: usize,
    pub interval: (SimTime, SimTime),
    /// Successful admissions
    pub enters: u64,
    pub min_used: usize,
    pub max_used: usize,
    pub mean_used: f64,
    pub utilization: f64,
    pub queue: QueueReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> ProcessId {
        ProcessId(n)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            Store::new("Designer", 0, 0.0),
            Err(SimError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn test_admits_up_to_capacity() {
        let mut store = Store::new("Designer", 2, 0.0).unwrap();
        assert_eq!(store.enter(pid(1), 1, 0, 0.0).unwrap(), EnterOutcome::Admitted);
        assert_eq!(store.enter(pid(2), 1, 0, 0.0).unwrap(), EnterOutcome::Admitted);
        assert_eq!(store.enter(pid(3), 1, 0, 1.0).unwrap(), EnterOutcome::Queued);
        assert_eq!(store.used(), 2);
        assert_eq!(store.held_total(), store.used());

        assert_eq!(store.leave(pid(1), 1, 2.0).unwrap(), vec![pid(3)]);
        assert_eq!(store.used(), 2);
        assert_eq!(store.held_by(pid(3)), 1);
        assert_eq!(store.held_total(), store.used());
    }

    #[test]
    fn test_blocked_head_is_not_bypassed() {
        let mut store = Store::new("Crew", 3, 0.0).unwrap();
        store.enter(pid(1), 3, 0, 0.0).unwrap();
        assert_eq!(store.enter(pid(2), 3, 0, 0.0).unwrap(), EnterOutcome::Queued);
        assert_eq!(store.enter(pid(3), 1, 0, 0.0).unwrap(), EnterOutcome::Queued);

        // one unit frees up, the small request behind the big one must keep waiting
        assert!(store.leave(pid(1), 1, 1.0).unwrap().is_empty());
        assert_eq!(store.queue_len(), 2);

        assert_eq!(store.leave(pid(1), 2, 2.0).unwrap(), vec![pid(2)]);
        assert_eq!(store.queue_len(), 1);
        assert_eq!(store.used(), 3);
    }

    #[test]
    fn test_leave_admits_several_waiters() {
        let mut store = Store::new("Crew", 4, 0.0).unwrap();
        store.enter(pid(1), 4, 0, 0.0).unwrap();
        store.enter(pid(2), 1, 0, 0.0).unwrap();
        store.enter(pid(3), 2, 0, 0.0).unwrap();
        store.enter(pid(4), 2, 0, 0.0).unwrap();

        assert_eq!(store.leave(pid(1), 4, 1.0).unwrap(), vec![pid(2), pid(3)]);
        assert_eq!(store.used(), 3);
        assert_eq!(store.queue_len(), 1);
    }

    #[test]
    fn test_protocol_violations() {
        let mut store = Store::new("Supervisor", 1, 0.0).unwrap();
        assert!(matches!(
            store.enter(pid(1), 2, 0, 0.0),
            Err(SimError::RequestExceedsCapacity { .. })
        ));
        assert!(matches!(
            store.leave(pid(1), 1, 0.0),
            Err(SimError::LeaveWithoutHolding { .. })
        ));
        store.enter(pid(1), 1, 0, 0.0).unwrap();
        assert!(matches!(
            store.leave(pid(2), 1, 0.0),
            Err(SimError::LeaveWithoutHolding { .. })
        ));
    }

    #[test]
    fn test_report() {
        let mut store = Store::new("Designer", 2, 0.0).unwrap();
        store.enter(pid(1), 2, 0, 0.0).unwrap();
        store.leave(pid(1), 2, 5.0).unwrap();

        let report = store.report(10.0);
        assert_eq!(report.enters, 1);
        assert_eq!(report.max_used, 2);
        assert_eq!(report.min_used, 0);
        assert!((report.mean_used - 1.0).abs() < 1e-12);
        assert!((report.utilization - 0.5).abs() < 1e-12);
        assert_eq!(report, store.report(10.0));
    }
}
