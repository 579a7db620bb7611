//! Point-in-time status and lifetime statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::util::serde::Priority;

/// Pending job counts per priority tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepths {
    /// Pending high-priority jobs.
    pub high: usize,
    /// Pending normal-priority jobs.
    pub normal: usize,
    /// Pending low-priority jobs.
    pub low: usize,
}

impl QueueDepths {
    /// Total pending jobs.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.high + self.normal + self.low
    }

    /// Depth of one tier.
    #[must_use]
    pub const fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }
}

/// Consistent snapshot of queue depths and active workers, taken under the
/// scheduler's state lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Pending high-priority jobs.
    pub high: usize,
    /// Pending normal-priority jobs.
    pub normal: usize,
    /// Pending low-priority jobs.
    pub low: usize,
    /// Jobs currently holding a concurrency slot.
    pub active: usize,
}

impl SchedulerStatus {
    /// Build a status from queue depths and the active count.
    #[must_use]
    pub const fn new(depths: QueueDepths, active: usize) -> Self {
        Self {
            high: depths.high,
            normal: depths.normal,
            low: depths.low,
            active,
        }
    }

    /// Total pending jobs.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.high + self.normal + self.low
    }

    /// Nothing pending and nothing running.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.pending() == 0 && self.active == 0
    }
}

/// Lifetime counters of a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Concurrency cap.
    pub max_concurrent: usize,
    /// Jobs accepted into the queue.
    pub submitted: u64,
    /// `add_job` calls refused (duplicate, queue full, shutdown, halted).
    pub rejected: u64,
    /// `add_job` calls folded into an already scheduled job.
    pub coalesced: u64,
    /// Jobs that finished with every step successful.
    pub completed: u64,
    /// Jobs that finished with at least one failed step.
    pub failed: u64,
    /// Jobs whose deadline elapsed.
    pub timed_out: u64,
    /// Jobs cancelled while running.
    pub cancelled: u64,
    /// Pending jobs dropped by `clear_queues`, `cancel_connection` or shutdown.
    pub cleared: u64,
}

/// Internal counters (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub submitted: AtomicU64,
    pub rejected: AtomicU64,
    pub coalesced: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub cancelled: AtomicU64,
    pub cleared: AtomicU64,
}

impl SchedulerCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, max_concurrent: usize) -> SchedulerStats {
        SchedulerStats {
            max_concurrent,
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            cleared: self.cleared.load(Ordering::Relaxed),
        }
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}
