//! Core scheduling abstractions, job model and slot accounting.

pub mod audit;
pub mod error;
pub mod executor;
pub mod job;
pub mod scheduler;
pub mod status;
pub mod worker;

pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
pub use error::{AppResult, SchedulerError, SyncError};
pub use executor::{ExchangeClient, SyncOutcome, SyncRequest};
pub use job::{JobOutcome, JobReport, JobSpec, SyncJob, SyncResult, SyncWindow};
pub use scheduler::{
    Admission, DuplicatePolicy, JobQueue, ReportMailbox, SchedulerLimits, Spawn, SyncScheduler,
};
pub use status::{QueueDepths, SchedulerStats, SchedulerStatus};
pub use worker::{run_job, CANCELLED_ERROR, TIMEOUT_ERROR};
