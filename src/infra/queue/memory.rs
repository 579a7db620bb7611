//! In-memory queue with one FIFO per priority tier.

use std::collections::VecDeque;

use crate::core::{JobQueue, QueueDepths, SchedulerError, SyncJob};
use crate::util::serde::Priority;

/// In-memory queue storing pending jobs in three FIFO tiers.
/// Enqueue and dequeue are O(1); dequeue always serves the highest non-empty
/// tier, and jobs within a tier leave in arrival order.
pub struct TieredQueue {
    max_depth: usize,
    high: VecDeque<SyncJob>,
    normal: VecDeque<SyncJob>,
    low: VecDeque<SyncJob>,
}

impl TieredQueue {
    /// Create a new queue bounded to `max_depth` pending jobs in total.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            high: VecDeque::new(),
            normal: VecDeque::new(),
            low: VecDeque::new(),
        }
    }

    fn tier_mut(&mut self, priority: Priority) -> &mut VecDeque<SyncJob> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    /// Pending job ids in dispatch order, for diagnostics.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<crate::util::serde::JobId> {
        self.high
            .iter()
            .chain(&self.normal)
            .chain(&self.low)
            .map(SyncJob::id)
            .collect()
    }
}

impl Default for TieredQueue {
    fn default() -> Self {
        Self::new(crate::core::SchedulerLimits::DEFAULT_MAX_QUEUE_DEPTH)
    }
}

impl JobQueue for TieredQueue {
    fn enqueue(&mut self, job: SyncJob) -> Result<(), SchedulerError> {
        if self.len() >= self.max_depth() {
            return Err(SchedulerError::QueueFull(format!(
                "max queue depth {} reached",
                self.max_depth
            )));
        }
        self.tier_mut(job.priority()).push_back(job);
        Ok(())
    }

    fn dequeue_next(&mut self) -> Option<SyncJob> {
        Priority::DISPATCH_ORDER
            .into_iter()
            .find_map(|p| self.tier_mut(p).pop_front())
    }

    fn depths(&self) -> QueueDepths {
        QueueDepths {
            high: self.high.len(),
            normal: self.normal.len(),
            low: self.low.len(),
        }
    }

    fn clear(&mut self) -> Vec<SyncJob> {
        let mut dropped = Vec::with_capacity(self.len());
        dropped.extend(self.high.drain(..));
        dropped.extend(self.normal.drain(..));
        dropped.extend(self.low.drain(..));
        dropped
    }

    fn remove_connection(&mut self, connection_id: &str) -> Vec<SyncJob> {
        let mut removed = Vec::new();
        for priority in Priority::DISPATCH_ORDER {
            let tier = self.tier_mut(priority);
            let (matching, kept): (Vec<_>, Vec<_>) = tier
                .drain(..)
                .partition(|job| job.connection_id() == connection_id);
            *tier = kept.into();
            removed.extend(matching);
        }
        removed
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }
}
