//! Audit sink implementations.
//!
//! Records job lifecycle transitions (enqueue, dispatch, completion, drops)
//! for later inspection by monitoring or support tooling.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::JobId;

/// Lifecycle transition being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Job accepted into a queue tier.
    Enqueue,
    /// Job refused at admission.
    Reject,
    /// Job folded into one already scheduled for the same connection.
    Coalesce,
    /// Job took a concurrency slot.
    Dispatch,
    /// Job finished; detail carries the outcome.
    Complete,
    /// Pending job dropped before dispatch.
    Drop,
    /// Running job asked to cancel.
    Cancel,
}

impl AuditAction {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enqueue => "enqueue",
            Self::Reject => "reject",
            Self::Coalesce => "coalesce",
            Self::Dispatch => "dispatch",
            Self::Complete => "complete",
            Self::Drop => "drop",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related job identifier.
    pub job_id: JobId,
    /// Connection the job targets.
    pub connection_id: String,
    /// Owning user.
    pub user_id: String,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Stored events for one job, oldest first.
    #[must_use]
    pub fn events_for(&self, job_id: JobId) -> Vec<AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Sink that forwards events to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            target: "exchange_sync_scheduler::audit",
            event_id = %event.event_id,
            job_id = %event.job_id,
            connection_id = %event.connection_id,
            user_id = %event.user_id,
            action = %event.action,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    job_id: JobId,
    connection_id: impl Into<String>,
    user_id: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    let created_at_ms = now_ms();
    AuditEvent {
        event_id: format!("{job_id}-{action}-{created_at_ms}"),
        job_id,
        connection_id: connection_id.into(),
        user_id: user_id.into(),
        action,
        created_at_ms,
        detail,
    }
}
