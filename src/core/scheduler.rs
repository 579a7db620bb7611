//! Sync scheduler: priority queues, concurrency slots and the dispatch loop.
//!
//! All shared mutable state (the queue tiers, the active-slot counter, the
//! loop's running flag and connection bookkeeping) lives behind a single
//! `parking_lot::Mutex`. Admission and release both happen under that lock, so
//! `active` can never exceed `max_concurrent` and a slot is never counted
//! twice.
//!
//! The loop is event driven: it sleeps on a `tokio::sync::Notify` and is woken
//! by `add_job`, by a worker releasing its slot, and by administrative calls.
//! It exits as soon as the queues are empty and no worker is active, and the
//! next `add_job` starts a fresh one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::status::{QueueDepths, SchedulerCounters, SchedulerStats, SchedulerStatus};
use crate::core::{worker, ExchangeClient, JobOutcome, JobReport, JobSpec, SchedulerError, SyncJob};
use crate::util::serde::JobId;

/// Abstraction for pending-job storage.
pub trait JobQueue: Send {
    /// Append a job to the tier matching its priority.
    ///
    /// # Errors
    ///
    /// `SchedulerError::QueueFull` when the queue is at `max_depth`.
    fn enqueue(&mut self, job: SyncJob) -> Result<(), SchedulerError>;
    /// Remove and return the head of the highest non-empty tier.
    fn dequeue_next(&mut self) -> Option<SyncJob>;
    /// Pending counts per tier.
    fn depths(&self) -> QueueDepths;
    /// Drop every pending job, returning them.
    fn clear(&mut self) -> Vec<SyncJob>;
    /// Drop every pending job for one connection, returning them.
    fn remove_connection(&mut self, connection_id: &str) -> Vec<SyncJob>;
    /// Maximum number of pending jobs.
    fn max_depth(&self) -> usize;
    /// Current number of pending jobs.
    fn len(&self) -> usize {
        self.depths().total()
    }
    /// Whether no job is pending.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receives the report of every finished job.
pub trait ReportMailbox: Send {
    /// Deliver a job report.
    ///
    /// # Errors
    ///
    /// Backend-specific; the scheduler logs the error and moves on.
    fn deliver(&mut self, report: JobReport) -> Result<(), SchedulerError>;
}

/// Abstraction for spawning the loop and worker tasks on a runtime.
pub trait Spawn {
    /// Spawn a detached task.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// What `add_job` does with a job whose connection is already queued or running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse with `SchedulerError::DuplicateConnection`.
    #[default]
    Reject,
    /// Accept the call but keep only the job already scheduled.
    Coalesce,
    /// Enqueue anyway; the caller guarantees it does not double-sync.
    Allow,
}

/// Configuration values enforced by a scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Maximum jobs executing at once.
    pub max_concurrent: usize,
    /// Maximum pending jobs across all tiers. Must equal the queue's own
    /// `max_depth`.
    pub max_queue_depth: usize,
    /// Deadline for a whole job; `None` disables it.
    pub job_timeout: Option<Duration>,
    /// Handling of jobs for an already scheduled connection.
    pub duplicate_policy: DuplicatePolicy,
}

impl SchedulerLimits {
    /// Default concurrency cap, sized for exchange rate limits shared by all users.
    pub const DEFAULT_MAX_CONCURRENT: usize = 3;
    /// Default pending-job bound.
    pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 10_000;
    /// Default job deadline.
    pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(300);

    /// Check that the limits can make progress.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidLimits` when either bound is zero.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_concurrent == 0 {
            return Err(SchedulerError::InvalidLimits(
                "max_concurrent must be greater than 0".into(),
            ));
        }
        if self.max_queue_depth == 0 {
            return Err(SchedulerError::InvalidLimits(
                "max_queue_depth must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            max_queue_depth: Self::DEFAULT_MAX_QUEUE_DEPTH,
            job_timeout: Some(Self::DEFAULT_JOB_TIMEOUT),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// Result of a successful `add_job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "job_id")]
pub enum Admission {
    /// Job was enqueued.
    Queued(JobId),
    /// A job for the same connection was already scheduled; carries its id.
    Coalesced(JobId),
}

impl Admission {
    /// Id of the job that will do the work.
    #[must_use]
    pub const fn job_id(self) -> JobId {
        match self {
            Self::Queued(id) | Self::Coalesced(id) => id,
        }
    }
}

struct InFlight {
    connection_id: String,
    user_id: String,
    token: CancellationToken,
}

struct Dispatch {
    job: SyncJob,
    token: CancellationToken,
}

/// Everything guarded by the scheduler mutex.
struct SchedulerState<Q> {
    queue: Q,
    active: usize,
    running: bool,
    shutting_down: bool,
    halted: bool,
    /// Connection -> most recently queued job for it.
    queued: HashMap<String, JobId>,
    in_flight: HashMap<JobId, InFlight>,
}

impl<Q: JobQueue> SchedulerState<Q> {
    fn new(queue: Q) -> Self {
        Self {
            queue,
            active: 0,
            running: false,
            shutting_down: false,
            halted: false,
            queued: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    fn scheduled_job(&self, connection_id: &str) -> Option<JobId> {
        self.queued.get(connection_id).copied().or_else(|| {
            self.in_flight
                .iter()
                .find(|(_, f)| f.connection_id == connection_id)
                .map(|(id, _)| *id)
        })
    }

    fn enqueue(
        &mut self,
        job: SyncJob,
        policy: DuplicatePolicy,
    ) -> Result<Admission, SchedulerError> {
        if self.halted {
            return Err(SchedulerError::InvariantViolation(
                "scheduler halted after a slot accounting error".into(),
            ));
        }
        if self.shutting_down {
            return Err(SchedulerError::ShuttingDown);
        }
        if policy != DuplicatePolicy::Allow {
            if let Some(existing) = self.scheduled_job(job.connection_id()) {
                return match policy {
                    DuplicatePolicy::Coalesce => Ok(Admission::Coalesced(existing)),
                    _ => Err(SchedulerError::DuplicateConnection(
                        job.connection_id().to_string(),
                    )),
                };
            }
        }

        let id = job.id();
        let connection_id = job.connection_id().to_string();
        self.queue.enqueue(job)?;
        self.queued.insert(connection_id, id);
        Ok(Admission::Queued(id))
    }

    /// Move jobs from the queue into free slots, highest tier first.
    fn admit(&mut self, max_concurrent: usize, root: &CancellationToken) -> Vec<Dispatch> {
        let mut batch = Vec::new();
        if self.halted {
            return batch;
        }
        while self.active < max_concurrent {
            let Some(job) = self.queue.dequeue_next() else {
                break;
            };
            if self.queued.get(job.connection_id()) == Some(&job.id()) {
                self.queued.remove(job.connection_id());
            }
            let token = root.child_token();
            self.in_flight.insert(
                job.id(),
                InFlight {
                    connection_id: job.connection_id().to_string(),
                    user_id: job.user_id().to_string(),
                    token: token.clone(),
                },
            );
            self.active += 1;
            batch.push(Dispatch { job, token });
        }
        debug_assert!(self.active <= max_concurrent);
        batch
    }

    /// Give back the slot held by `job_id`. A second release of the same job,
    /// or any release while no slot is held, halts the scheduler.
    fn release(&mut self, job_id: JobId) -> Result<(), SchedulerError> {
        if self.in_flight.remove(&job_id).is_none() {
            self.halted = true;
            return Err(SchedulerError::InvariantViolation(format!(
                "slot released for job {job_id} which holds none"
            )));
        }
        if let Some(active) = self.active.checked_sub(1) {
            self.active = active;
            Ok(())
        } else {
            self.halted = true;
            Err(SchedulerError::InvariantViolation(format!(
                "slot released for job {job_id} with no active workers"
            )))
        }
    }

    fn clear_pending(&mut self) -> Vec<SyncJob> {
        self.queued.clear();
        self.queue.clear()
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus::new(self.queue.depths(), self.active)
    }

    const fn is_idle(&self) -> bool {
        !self.running && self.active == 0
    }
}

#[derive(Default)]
struct Hooks {
    mailbox: Option<Arc<Mutex<dyn ReportMailbox>>>,
    audit: Option<Arc<Mutex<dyn AuditSink>>>,
}

/// State shared by the handle, the loop task and every worker task.
struct Shared<C, Q> {
    limits: SchedulerLimits,
    state: Mutex<SchedulerState<Q>>,
    /// Wakes the loop: new job, released slot, administrative change.
    wake: Notify,
    /// Wakes `wait_idle` callers when the scheduler goes idle.
    idle: Notify,
    client: C,
    root: CancellationToken,
    counters: SchedulerCounters,
    hooks: RwLock<Hooks>,
}

impl<C, Q: JobQueue> Shared<C, Q> {
    fn audit(
        &self,
        job_id: JobId,
        connection_id: &str,
        user_id: &str,
        action: AuditAction,
        detail: Option<String>,
    ) {
        let sink = self.hooks.read().audit.clone();
        if let Some(sink) = sink {
            sink.lock()
                .record(build_audit_event(job_id, connection_id, user_id, action, detail));
        }
    }

    fn audit_dropped(&self, jobs: &[SyncJob], reason: &str) {
        for job in jobs {
            self.audit(
                job.id(),
                job.connection_id(),
                job.user_id(),
                AuditAction::Drop,
                Some(reason.to_string()),
            );
        }
    }

    fn release_slot(&self, job_id: JobId) {
        let (result, idle) = {
            let mut state = self.state.lock();
            let result = state.release(job_id).map(|()| state.active);
            (result, state.is_idle())
        };
        match result {
            Ok(active) => debug!(job_id = %job_id, active, "concurrency slot released"),
            Err(e) => error!(job_id = %job_id, error = %e, "halting scheduler"),
        }
        self.wake.notify_one();
        if idle {
            self.idle.notify_waiters();
        }
    }

    fn record_report(&self, job: &SyncJob, report: JobReport) {
        let counter = match report.outcome {
            JobOutcome::Succeeded => &self.counters.completed,
            JobOutcome::PartiallyFailed | JobOutcome::Failed => &self.counters.failed,
            JobOutcome::TimedOut => &self.counters.timed_out,
            JobOutcome::Cancelled => &self.counters.cancelled,
        };
        SchedulerCounters::bump(counter);

        info!(
            job_id = %report.job_id,
            connection_id = %report.connection_id,
            outcome = report.outcome.as_str(),
            items = report.items_processed(),
            elapsed_ms = u64::try_from(report.finished_at_ms.saturating_sub(report.started_at_ms))
                .unwrap_or(u64::MAX),
            "sync job finished"
        );
        self.audit(
            job.id(),
            job.connection_id(),
            job.user_id(),
            AuditAction::Complete,
            Some(report.outcome.as_str().to_string()),
        );

        let mailbox = self.hooks.read().mailbox.clone();
        if let Some(mailbox) = mailbox {
            if let Err(e) = mailbox.lock().deliver(report) {
                error!(job_id = %job.id(), error = %e, "failed to deliver job report");
            }
        }
    }
}

/// Releases a concurrency slot when dropped, including during unwinding.
struct SlotGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SlotGuard {
    fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Concurrency-bounded, priority-ordered scheduler for exchange sync jobs.
///
/// Construct one per application (or per test) and share it by reference or
/// `Arc`. Jobs are executed by `C` on tasks spawned through `S`.
///
/// # Example
///
/// ```rust,ignore
/// use exchange_sync_scheduler::core::{JobSpec, SchedulerLimits, SyncScheduler};
/// use exchange_sync_scheduler::infra::TieredQueue;
/// use exchange_sync_scheduler::runtime::TokioSpawner;
///
/// let limits = SchedulerLimits::default();
/// let scheduler = SyncScheduler::new(
///     limits.clone(),
///     TieredQueue::new(limits.max_queue_depth),
///     my_exchange_client,
///     TokioSpawner::try_current()?,
/// )?;
/// scheduler.submit(JobSpec::full_sync("conn-1", "user-1", "binance"))?;
/// scheduler.wait_idle().await;
/// ```
pub struct SyncScheduler<C, Q, S> {
    shared: Arc<Shared<C, Q>>,
    spawner: S,
}

impl<C, Q, S> SyncScheduler<C, Q, S>
where
    C: ExchangeClient,
    Q: JobQueue + 'static,
    S: Spawn + Clone + Send + 'static,
{
    /// Create a scheduler from components. Nothing runs until the first job
    /// is added.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidLimits` when a limit is zero or the queue's
    /// bound differs from `limits.max_queue_depth`.
    pub fn new(
        limits: SchedulerLimits,
        queue: Q,
        client: C,
        spawner: S,
    ) -> Result<Self, SchedulerError> {
        limits.validate()?;
        if queue.max_depth() != limits.max_queue_depth {
            return Err(SchedulerError::InvalidLimits(format!(
                "queue bound {} differs from max_queue_depth {}",
                queue.max_depth(),
                limits.max_queue_depth
            )));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                limits,
                state: Mutex::new(SchedulerState::new(queue)),
                wake: Notify::new(),
                idle: Notify::new(),
                client,
                root: CancellationToken::new(),
                counters: SchedulerCounters::default(),
                hooks: RwLock::new(Hooks::default()),
            }),
            spawner,
        })
    }

    /// Attach a mailbox that receives every job report.
    #[must_use]
    pub fn with_mailbox<M>(self, mailbox: Arc<Mutex<M>>) -> Self
    where
        M: ReportMailbox + 'static,
    {
        let mailbox: Arc<Mutex<dyn ReportMailbox>> = mailbox;
        self.shared.hooks.write().mailbox = Some(mailbox);
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit<A>(self, audit: Arc<Mutex<A>>) -> Self
    where
        A: AuditSink + 'static,
    {
        let audit: Arc<Mutex<dyn AuditSink>> = audit;
        self.shared.hooks.write().audit = Some(audit);
        self
    }

    /// Limits this scheduler enforces.
    #[must_use]
    pub fn limits(&self) -> &SchedulerLimits {
        &self.shared.limits
    }

    /// Validate a job spec and add it.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidJob` for a malformed spec, otherwise as
    /// [`SyncScheduler::add_job`].
    pub fn submit(&self, spec: JobSpec) -> Result<Admission, SchedulerError> {
        let job = SyncJob::new(spec).inspect_err(|e| {
            SchedulerCounters::bump(&self.shared.counters.rejected);
            warn!(error = %e, "sync job rejected");
        })?;
        self.add_job(job)
    }

    /// Enqueue a job and start the loop if it is idle.
    ///
    /// Fire-and-forget: failures inside the job end up in its report, never
    /// here.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::DuplicateConnection` under `DuplicatePolicy::Reject`
    /// - `SchedulerError::QueueFull` when the queue is at its bound
    /// - `SchedulerError::ShuttingDown` after [`SyncScheduler::shutdown`]
    /// - `SchedulerError::InvariantViolation` once slot accounting has broken
    pub fn add_job(&self, job: SyncJob) -> Result<Admission, SchedulerError> {
        let job_id = job.id();
        let connection_id = job.connection_id().to_string();
        let user_id = job.user_id().to_string();
        let priority = job.priority();

        let (result, start_loop) = {
            let mut state = self.shared.state.lock();
            let result = state.enqueue(job, self.shared.limits.duplicate_policy);
            let start_loop = matches!(result, Ok(Admission::Queued(_))) && !state.running;
            if start_loop {
                state.running = true;
            }
            (result, start_loop)
        };

        match &result {
            Ok(Admission::Queued(_)) => {
                SchedulerCounters::bump(&self.shared.counters.submitted);
                info!(
                    job_id = %job_id,
                    connection_id = %connection_id,
                    priority = %priority,
                    "sync job enqueued"
                );
                self.shared
                    .audit(job_id, &connection_id, &user_id, AuditAction::Enqueue, None);
                if start_loop {
                    debug!("starting scheduler loop");
                    self.spawner
                        .spawn(run_loop(Arc::clone(&self.shared), self.spawner.clone()));
                } else {
                    self.shared.wake.notify_one();
                }
            }
            Ok(Admission::Coalesced(existing)) => {
                SchedulerCounters::bump(&self.shared.counters.coalesced);
                debug!(
                    job_id = %job_id,
                    existing = %existing,
                    connection_id = %connection_id,
                    "sync job coalesced into scheduled job"
                );
                self.shared.audit(
                    job_id,
                    &connection_id,
                    &user_id,
                    AuditAction::Coalesce,
                    Some(existing.to_string()),
                );
            }
            Err(e) => {
                SchedulerCounters::bump(&self.shared.counters.rejected);
                warn!(
                    job_id = %job_id,
                    connection_id = %connection_id,
                    error = %e,
                    "sync job rejected"
                );
                self.shared.audit(
                    job_id,
                    &connection_id,
                    &user_id,
                    AuditAction::Reject,
                    Some(e.to_string()),
                );
            }
        }
        result
    }

    /// Queue depths per tier plus active workers, read under the state lock.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        self.shared.state.lock().status()
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.shared
            .counters
            .snapshot(self.shared.limits.max_concurrent)
    }

    /// Whether the dispatch loop is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Whether the loop has exited and no worker holds a slot.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.shared.state.lock().is_idle()
    }

    /// Drop every pending job. In-flight jobs keep running and keep their
    /// slots. Returns how many jobs were dropped.
    pub fn clear_queues(&self) -> usize {
        let dropped = self.shared.state.lock().clear_pending();
        let count = dropped.len();
        SchedulerCounters::add(&self.shared.counters.cleared, count);
        self.shared.audit_dropped(&dropped, "queues cleared");
        info!(dropped = count, "pending sync jobs cleared");
        self.shared.wake.notify_one();
        count
    }

    /// Drop pending jobs for a connection and cancel its running job, if any.
    /// Returns whether anything was affected.
    pub fn cancel_connection(&self, connection_id: &str) -> bool {
        let (dropped, cancelled) = {
            let mut state = self.shared.state.lock();
            let dropped = state.queue.remove_connection(connection_id);
            state.queued.remove(connection_id);
            let cancelled: Vec<(JobId, String)> = state
                .in_flight
                .iter()
                .filter(|(_, f)| f.connection_id == connection_id)
                .map(|(id, f)| {
                    f.token.cancel();
                    (*id, f.user_id.clone())
                })
                .collect();
            (dropped, cancelled)
        };

        SchedulerCounters::add(&self.shared.counters.cleared, dropped.len());
        self.shared.audit_dropped(&dropped, "connection cancelled");
        for (job_id, user_id) in &cancelled {
            self.shared
                .audit(*job_id, connection_id, user_id, AuditAction::Cancel, None);
        }
        info!(
            connection_id,
            dropped = dropped.len(),
            cancelled = cancelled.len(),
            "connection sync cancelled"
        );
        self.shared.wake.notify_one();
        !dropped.is_empty() || !cancelled.is_empty()
    }

    /// Refuse new jobs, drop pending ones and cancel every running job.
    /// Use [`SyncScheduler::wait_idle`] to wait for workers to wind down.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
        }
        info!("sync scheduler shutting down");
        self.clear_queues();
        self.shared.root.cancel();
        self.shared.wake.notify_one();
    }

    /// Wait until the loop has exited and every worker released its slot.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

async fn run_loop<C, Q, S>(shared: Arc<Shared<C, Q>>, spawner: S)
where
    C: ExchangeClient,
    Q: JobQueue + 'static,
    S: Spawn + Clone + Send + 'static,
{
    debug!("scheduler loop started");
    loop {
        let batch = {
            let mut state = shared.state.lock();
            let batch = state.admit(shared.limits.max_concurrent, &shared.root);
            let drained = batch.is_empty() && state.queue.is_empty() && state.active == 0;
            if state.halted || drained {
                state.running = false;
                None
            } else {
                Some(batch)
            }
        };

        let Some(batch) = batch else {
            debug!("scheduler loop idle, exiting");
            shared.idle.notify_waiters();
            return;
        };

        for dispatch in batch {
            spawn_worker(&shared, &spawner, dispatch);
        }

        shared.wake.notified().await;
    }
}

fn spawn_worker<C, Q, S>(shared: &Arc<Shared<C, Q>>, spawner: &S, dispatch: Dispatch)
where
    C: ExchangeClient,
    Q: JobQueue + 'static,
    S: Spawn,
{
    let Dispatch { job, token } = dispatch;
    info!(
        job_id = %job.id(),
        connection_id = job.connection_id(),
        exchange = job.exchange_name(),
        priority = %job.priority(),
        "sync job dispatched"
    );
    shared.audit(
        job.id(),
        job.connection_id(),
        job.user_id(),
        AuditAction::Dispatch,
        None,
    );

    let slot = {
        let shared = Arc::clone(shared);
        let job_id = job.id();
        SlotGuard::new(move || shared.release_slot(job_id))
    };
    let shared = Arc::clone(shared);
    spawner.spawn(async move {
        let _slot = slot;
        let report = worker::run_job(&shared.client, &job, &token, shared.limits.job_timeout).await;
        shared.record_report(&job, report);
    });
}
