//! In-memory mailbox backend.

use std::collections::{HashMap, VecDeque};

use crate::core::{JobReport, ReportMailbox, SchedulerError};

/// Simple in-memory mailbox keyed by user, for development and testing.
///
/// Keeps at most `max_per_user` reports per user, dropping the oldest.
pub struct InMemoryMailbox {
    reports: HashMap<String, VecDeque<JobReport>>,
    max_per_user: usize,
}

impl InMemoryMailbox {
    /// Default number of reports retained per user.
    pub const DEFAULT_MAX_PER_USER: usize = 256;

    /// Create a new mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_per_user(Self::DEFAULT_MAX_PER_USER)
    }

    /// Create a mailbox retaining up to `max_per_user` reports per user.
    #[must_use]
    pub fn with_capacity_per_user(max_per_user: usize) -> Self {
        Self {
            reports: HashMap::new(),
            max_per_user,
        }
    }

    /// Fetch reports for a user, oldest first, optionally only those finished
    /// at or after `since_ms`.
    #[must_use]
    pub fn fetch(&self, user_id: &str, since_ms: Option<u128>, limit: usize) -> Vec<JobReport> {
        self.reports
            .get(user_id)
            .map(|reports| {
                reports
                    .iter()
                    .filter(|r| since_ms.map_or(true, |s| r.finished_at_ms >= s))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent report for a connection, across users.
    #[must_use]
    pub fn latest_for_connection(&self, connection_id: &str) -> Option<JobReport> {
        self.reports
            .values()
            .flat_map(|reports| reports.iter())
            .filter(|r| r.connection_id == connection_id)
            .max_by_key(|r| r.finished_at_ms)
            .cloned()
    }

    /// Remove and return every report held for a user.
    pub fn take(&mut self, user_id: &str) -> Vec<JobReport> {
        self.reports
            .remove(user_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Total reports held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.values().map(VecDeque::len).sum()
    }

    /// Whether no report is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportMailbox for InMemoryMailbox {
    fn deliver(&mut self, report: JobReport) -> Result<(), SchedulerError> {
        if self.max_per_user == 0 {
            return Ok(());
        }
        let entry = self.reports.entry(report.user_id.clone()).or_default();
        if entry.len() >= self.max_per_user {
            entry.pop_front();
        }
        entry.push_back(report);
        Ok(())
    }
}
