use crate::core::stats::{SampleReport, SampleStat, TimeStat};
use crate::core::types::{Priority, ProcessId, SimTime};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// A process parked in a resource queue together with what it asked for
#[derive(Debug, Clone, PartialEq)]
pub struct Waiter<T> {
    pub process: ProcessId,
    pub priority: Priority,
    pub enqueued_at: SimTime,
    pub request: T,
}

/// Resource wait queue ordered by (priority descending, arrival ascending).
///
/// Keeps its own length-over-time and time-in-queue statistics.
#[derive(Debug, Clone)]
pub struct WaitQueue<T> {
    waiters: BTreeMap<(Reverse<Priority>, u64), Waiter<T>>,
    arrivals: u64,
    length: TimeStat,
    waited: SampleStat,
}

impl<T> WaitQueue<T> {
    pub fn new(now: SimTime) -> Self {
        Self {
            waiters: BTreeMap::new(),
            arrivals: 0,
            length: TimeStat::new(now, 0.0),
            waited: SampleStat::new(),
        }
    }

    /// Park `process` behind every waiter of equal or higher priority
    pub fn push(&mut self, process: ProcessId, priority: Priority, request: T, now: SimTime) {
        let key = (Reverse(priority), self.arrivals);
        self.arrivals += 1;
        self.waiters.insert(
            key,
            Waiter {
                process,
                priority,
                enqueued_at: now,
                request,
            },
        );
        self.length.update(self.waiters.len() as f64, now);
    }

    /// Highest-priority, earliest-arrived waiter
    pub fn front(&self) -> Option<&Waiter<T>> {
        self.waiters.values().next()
    }

    /// Remove the front waiter, recording how long it waited
    pub fn pop_front(&mut self, now: SimTime) -> Option<Waiter<T>> {
        let (_, waiter) = self.waiters.pop_first()?;
        self.waited.record(now - waiter.enqueued_at);
        self.length.update(self.waiters.len() as f64, now);
        Some(waiter)
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub fn contains(&self, process: ProcessId) -> bool {
        self.waiters.values().any(|w| w.process == process)
    }

    /// Drop all waiters and restart statistics at `now`
    pub fn clear(&mut self, now: SimTime) {
        self.waiters.clear();
        self.arrivals = 0;
        self.length = TimeStat::new(now, 0.0);
        self.waited.clear();
    }

    pub fn report(&self, now: SimTime) -> QueueReport {
        QueueReport {
            entries: self.arrivals,
            current_len: self.waiters.len(),
            max_len: self.length.max() as usize,
            mean_len: self.length.mean_until(now),
            wait: self.waited.report(),
        }
    }
}

/// Snapshot of a resource queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueReport {
    /// Processes that had to queue since the statistics were started
    pub entries: u64,
    pub current_len: usize,
    pub max_len: usize,
    pub mean_len: f64,
    /// Time spent in the queue by processes that left it
    pub wait: SampleReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_then_fifo() {
        let mut queue = WaitQueue::new(0.0);
        queue.push(ProcessId(1), 0, (), 0.0);
        queue.push(ProcessId(2), 0, (), 1.0);
        queue.push(ProcessId(3), 1, (), 2.0);
        queue.push(ProcessId(4), 0, (), 3.0);

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop_front(4.0))
            .map(|w| w.process.raw())
            .collect();
        assert_eq!(order, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_statistics() {
        let mut queue = WaitQueue::new(0.0);
        queue.push(ProcessId(1), 0, (), 0.0);
        queue.push(ProcessId(2), 0, (), 2.0);
        queue.pop_front(4.0);
        queue.pop_front(6.0);

        let report = queue.report(10.0);
        assert_eq!(report.entries, 2);
        assert_eq!(report.max_len, 2);
        assert_eq!(report.current_len, 0);
        // length 1 on [0,2), 2 on [2,4), 1 on [4,6), 0 afterwards
        assert!((report.mean_len - 0.8).abs() < 1e-12);
        assert_eq!(report.wait.mean, Some(4.0));
        assert_eq!(report.wait.max, Some(4.0));
    }
}
