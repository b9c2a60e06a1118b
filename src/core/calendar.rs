use super::types::{EventId, Priority, ProcessId, SimTime};
use log::trace;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// A pending wake-up of a process
#[derive(Debug, Clone)]
pub struct CalendarEntry {
    pub wake_time: SimTime,
    pub priority: Priority,
    pub sequence: u64,
    pub target: ProcessId,
}

impl CalendarEntry {
    /// Handle that can be passed to [`EventCalendar::cancel`]
    pub fn id(&self) -> EventId {
        EventId(self.sequence)
    }
}

impl PartialEq for CalendarEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CalendarEntry {}

impl PartialOrd for CalendarEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CalendarEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default):
        // earliest time first, then highest priority, then oldest insertion
        other
            .wake_time
            .total_cmp(&self.wake_time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Ordered set of pending wake-ups
pub struct EventCalendar {
    entries: BinaryHeap<CalendarEntry>,
    /// Sequence numbers of entries that are neither popped nor cancelled
    live: HashSet<u64>,
    /// Cancelled entries still sitting in the heap
    cancelled: HashSet<u64>,
    sequence_counter: u64,
}

impl EventCalendar {
    /// Create an empty calendar
    pub fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
            live: HashSet::new(),
            cancelled: HashSet::new(),
            sequence_counter: 0,
        }
    }

    /// Insert a wake-up for `target` and return its handle
    pub fn insert(&mut self, wake_time: SimTime, priority: Priority, target: ProcessId) -> EventId {
        let entry = CalendarEntry {
            wake_time,
            priority,
            sequence: self.sequence_counter,
            target,
        };
        self.sequence_counter += 1;

        trace!("calendar: insert {} at {} (priority {})", target, wake_time, priority);
        let id = entry.id();
        self.live.insert(entry.sequence);
        self.entries.push(entry);
        id
    }

    /// Cancel a pending entry. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if self.live.remove(&id.0) {
            self.cancelled.insert(id.0);
            trace!("calendar: cancel entry {}", id.0);
            true
        } else {
            false
        }
    }

    /// Remove and return the earliest live entry, or `None` if the calendar is empty
    pub fn pop_earliest(&mut self) -> Option<CalendarEntry> {
        self.discard_cancelled();
        let entry = self.entries.pop()?;
        self.live.remove(&entry.sequence);
        Some(entry)
    }

    /// Earliest live entry without removing it
    pub fn peek_earliest(&mut self) -> Option<&CalendarEntry> {
        self.discard_cancelled();
        self.entries.peek()
    }

    /// Check if there are any live entries left
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Drop every pending entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.live.clear();
        self.cancelled.clear();
        self.sequence_counter = 0;
    }

    fn discard_cancelled(&mut self) {
        while let Some(head) = self.entries.peek() {
            if self.cancelled.remove(&head.sequence) {
                self.entries.pop();
            } else {
                break;
            }
        }
    }
}

impl Default for EventCalendar {
    fn default() -> Self {
        Self::new()
    }
}
