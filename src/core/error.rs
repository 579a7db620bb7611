//! Error types for scheduler operations.

use thiserror::Error;

use crate::util::serde::SyncType;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Job failed validation and was never enqueued.
    #[error("invalid job: {0}")]
    InvalidJob(String),
    /// Queue is full.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// A job for the same connection is already queued or running.
    #[error("connection already scheduled: {0}")]
    DuplicateConnection(String),
    /// Scheduler limits are unusable, or disagree with the queue's own bound.
    #[error("invalid scheduler limits: {0}")]
    InvalidLimits(String),
    /// Scheduler is shutting down and accepts no new work.
    #[error("scheduler is shutting down")]
    ShuttingDown,
    /// Concurrency slot accounting is broken; the scheduler refuses to continue.
    #[error("scheduler invariant violated: {0}")]
    InvariantViolation(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors returned by an exchange client for a single sync step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The exchange API returned an error.
    #[error("exchange error: {0}")]
    Exchange(String),
    /// The exchange rejected the call because of rate limiting.
    #[error("rate limited by exchange")]
    RateLimited,
    /// The client cannot fetch this kind of data.
    #[error("sync type `{0}` not supported")]
    Unsupported(SyncType),
    /// The client observed cancellation and stopped.
    #[error("cancelled")]
    Cancelled,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
