//! Sync job entity, per-step results and job reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::clock::now_ms;
use crate::util::serde::{JobId, Priority, SyncType};

/// Optional time window bounding the data fetched by a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncWindow {
    /// Inclusive lower bound.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl SyncWindow {
    /// Window without bounds: fetch everything the exchange returns.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start_date: None,
            end_date: None,
        }
    }

    /// Window with both bounds set.
    #[must_use]
    pub const fn between(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => {
                Err(format!("startDate {start} is after endDate {end}"))
            }
            _ => Ok(()),
        }
    }
}

/// Unvalidated job description as handed over by a caller (cron trigger,
/// HTTP handler, UI action). Field names follow the caller's camelCase JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Exchange connection (credential) being synced.
    pub connection_id: String,
    /// Owning user.
    pub user_id: String,
    /// Target exchange identifier.
    pub exchange_name: String,
    /// Priority tier.
    #[serde(default)]
    pub priority: Priority,
    /// Data kinds to fetch, in order.
    pub sync_types: Vec<SyncType>,
    /// Optional time window.
    #[serde(default)]
    pub options: SyncWindow,
}

impl JobSpec {
    /// Spec for a full sync (all sync types, no window) at normal priority.
    pub fn full_sync(
        connection_id: impl Into<String>,
        user_id: impl Into<String>,
        exchange_name: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            user_id: user_id.into(),
            exchange_name: exchange_name.into(),
            priority: Priority::Normal,
            sync_types: SyncType::ALL.to_vec(),
            options: SyncWindow::unbounded(),
        }
    }

    /// Set the priority tier.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Replace the sync types.
    #[must_use]
    pub fn with_sync_types(mut self, sync_types: impl IntoIterator<Item = SyncType>) -> Self {
        self.sync_types = sync_types.into_iter().collect();
        self
    }

    /// Set the time window.
    #[must_use]
    pub fn with_window(mut self, options: SyncWindow) -> Self {
        self.options = options;
        self
    }
}

/// Validated, immutable unit of sync work for one exchange connection.
///
/// Built with [`SyncJob::new`]; there are no setters. Re-running a sync means
/// building and enqueuing a new job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    id: JobId,
    connection_id: String,
    user_id: String,
    exchange_name: String,
    priority: Priority,
    sync_types: Vec<SyncType>,
    options: SyncWindow,
    created_at_ms: u128,
}

impl SyncJob {
    /// Validate a spec and build a job with a fresh id.
    ///
    /// Duplicate sync types are collapsed, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidJob` when an identifier is blank, no
    /// sync type is given, or the window is inverted.
    pub fn new(spec: JobSpec) -> Result<Self, SchedulerError> {
        let connection_id = required("connectionId", &spec.connection_id)?;
        let user_id = required("userId", &spec.user_id)?;
        let exchange_name = required("exchangeName", &spec.exchange_name)?.to_ascii_lowercase();

        let mut sync_types = Vec::with_capacity(spec.sync_types.len());
        for sync_type in spec.sync_types {
            if !sync_types.contains(&sync_type) {
                sync_types.push(sync_type);
            }
        }
        if sync_types.is_empty() {
            return Err(SchedulerError::InvalidJob(
                "syncTypes must not be empty".into(),
            ));
        }

        spec.options.validate().map_err(SchedulerError::InvalidJob)?;

        Ok(Self {
            id: JobId::new_v4(),
            connection_id,
            user_id,
            exchange_name,
            priority: spec.priority,
            sync_types,
            options: spec.options,
            created_at_ms: now_ms(),
        })
    }

    /// Job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Exchange connection being synced.
    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Owning user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Lower-cased exchange identifier.
    #[must_use]
    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    /// Priority tier.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Sync types in execution order; never empty.
    #[must_use]
    pub fn sync_types(&self) -> &[SyncType] {
        &self.sync_types
    }

    /// Time window.
    #[must_use]
    pub const fn options(&self) -> SyncWindow {
        self.options
    }

    /// Creation time in milliseconds since epoch.
    #[must_use]
    pub const fn created_at_ms(&self) -> u128 {
        self.created_at_ms
    }
}

impl TryFrom<JobSpec> for SyncJob {
    type Error = SchedulerError;

    fn try_from(spec: JobSpec) -> Result<Self, Self::Error> {
        Self::new(spec)
    }
}

fn required(field: &str, value: &str) -> Result<String, SchedulerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SchedulerError::InvalidJob(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Outcome of one (job, sync type) step.
///
/// `error` is present exactly when `success` is false; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    connection_id: String,
    sync_type: SyncType,
    success: bool,
    items_processed: u64,
    error: Option<String>,
}

impl SyncResult {
    /// Successful step.
    pub fn succeeded(
        connection_id: impl Into<String>,
        sync_type: SyncType,
        items_processed: u64,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            sync_type,
            success: true,
            items_processed,
            error: None,
        }
    }

    /// Failed step with an error message.
    pub fn failed(
        connection_id: impl Into<String>,
        sync_type: SyncType,
        error: impl Into<String>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            sync_type,
            success: false,
            items_processed: 0,
            error: Some(error.into()),
        }
    }

    /// Connection the step ran for.
    #[must_use]
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Data kind fetched.
    #[must_use]
    pub const fn sync_type(&self) -> SyncType {
        self.sync_type
    }

    /// Whether the step succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Records fetched and persisted by the client.
    #[must_use]
    pub const fn items_processed(&self) -> u64 {
        self.items_processed
    }

    /// Failure message, if the step failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Aggregate outcome of a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every step succeeded.
    Succeeded,
    /// Some steps failed, some succeeded.
    PartiallyFailed,
    /// Every step failed.
    Failed,
    /// The job deadline elapsed before all steps finished.
    TimedOut,
    /// The job was cancelled while running.
    Cancelled,
}

impl JobOutcome {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PartiallyFailed => "partially_failed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    /// Classify finished steps of a job that ran to the end.
    #[must_use]
    pub fn classify(results: &[SyncResult]) -> Self {
        let failed = results.iter().filter(|r| !r.success()).count();
        if failed == 0 {
            Self::Succeeded
        } else if failed == results.len() {
            Self::Failed
        } else {
            Self::PartiallyFailed
        }
    }
}

/// Report delivered when a dispatched job finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    /// Job identifier.
    pub job_id: JobId,
    /// Connection the job synced.
    pub connection_id: String,
    /// Owning user.
    pub user_id: String,
    /// Exchange identifier.
    pub exchange_name: String,
    /// One result per sync type, in job order.
    pub results: Vec<SyncResult>,
    /// Aggregate outcome.
    pub outcome: JobOutcome,
    /// Dispatch time in milliseconds since epoch.
    pub started_at_ms: u128,
    /// Completion time in milliseconds since epoch.
    pub finished_at_ms: u128,
}

impl JobReport {
    /// Build a report for `job`.
    #[must_use]
    pub fn new(
        job: &SyncJob,
        results: Vec<SyncResult>,
        outcome: JobOutcome,
        started_at_ms: u128,
    ) -> Self {
        Self {
            job_id: job.id(),
            connection_id: job.connection_id().to_string(),
            user_id: job.user_id().to_string(),
            exchange_name: job.exchange_name().to_string(),
            results,
            outcome,
            started_at_ms,
            finished_at_ms: now_ms(),
        }
    }

    /// Whether every step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == JobOutcome::Succeeded
    }

    /// Total records processed across all steps.
    #[must_use]
    pub fn items_processed(&self) -> u64 {
        self.results.iter().map(SyncResult::items_processed).sum()
    }
}
