//! Worker execution: runs one job's sync types against the exchange client.
//!
//! Each sync type is isolated: an error or a panic in one step is recorded in
//! that step's `SyncResult` and the next step still runs. A job deadline or a
//! cancellation interrupts the step in flight, abandons its future and marks
//! it and every remaining step failed.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ExchangeClient, JobOutcome, JobReport, SyncJob, SyncRequest, SyncResult};
use crate::util::clock::now_ms;
use crate::util::serde::SyncType;

/// Error recorded for steps cut off by the job deadline.
pub const TIMEOUT_ERROR: &str = "timeout";
/// Error recorded for steps cut off by cancellation.
pub const CANCELLED_ERROR: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interruption {
    TimedOut,
    Cancelled,
}

impl Interruption {
    const fn message(self) -> &'static str {
        match self {
            Self::TimedOut => TIMEOUT_ERROR,
            Self::Cancelled => CANCELLED_ERROR,
        }
    }

    const fn outcome(self) -> JobOutcome {
        match self {
            Self::TimedOut => JobOutcome::TimedOut,
            Self::Cancelled => JobOutcome::Cancelled,
        }
    }
}

enum Step {
    Finished(SyncResult),
    Interrupted(Interruption),
}

/// Run every sync type of `job` in order and build its report.
///
/// `timeout` bounds the whole job, not each step. A timeout too large to
/// represent as an instant is treated as no deadline. The returned report
/// always holds exactly one result per sync type.
pub async fn run_job<C>(
    client: &C,
    job: &SyncJob,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> JobReport
where
    C: ExchangeClient + ?Sized,
{
    let started_at_ms = now_ms();
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let mut results = Vec::with_capacity(job.sync_types().len());
    let mut interrupted: Option<Interruption> = None;

    for &sync_type in job.sync_types() {
        if let Some(reason) = interrupted {
            results.push(SyncResult::failed(
                job.connection_id(),
                sync_type,
                reason.message(),
            ));
            continue;
        }

        match run_step(client, job, sync_type, cancel, deadline).await {
            Step::Finished(result) => {
                if let Some(error) = result.error() {
                    warn!(
                        job_id = %job.id(),
                        connection_id = job.connection_id(),
                        sync_type = %sync_type,
                        error,
                        "sync step failed"
                    );
                } else {
                    debug!(
                        job_id = %job.id(),
                        sync_type = %sync_type,
                        items = result.items_processed(),
                        "sync step completed"
                    );
                }
                results.push(result);
            }
            Step::Interrupted(reason) => {
                warn!(
                    job_id = %job.id(),
                    connection_id = job.connection_id(),
                    sync_type = %sync_type,
                    reason = reason.message(),
                    "sync step interrupted"
                );
                results.push(SyncResult::failed(
                    job.connection_id(),
                    sync_type,
                    reason.message(),
                ));
                interrupted = Some(reason);
            }
        }
    }

    let outcome = interrupted.map_or_else(|| JobOutcome::classify(&results), Interruption::outcome);
    JobReport::new(job, results, outcome, started_at_ms)
}

async fn run_step<C>(
    client: &C,
    job: &SyncJob,
    sync_type: SyncType,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Step
where
    C: ExchangeClient + ?Sized,
{
    if cancel.is_cancelled() {
        return Step::Interrupted(Interruption::Cancelled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Step::Interrupted(Interruption::TimedOut);
    }

    let step_token = cancel.child_token();
    let call = AssertUnwindSafe(client.sync(
        SyncRequest::for_job(job, sync_type),
        step_token.clone(),
    ))
    .catch_unwind();
    let expired = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            step_token.cancel();
            Step::Interrupted(Interruption::Cancelled)
        }
        () = expired => {
            step_token.cancel();
            Step::Interrupted(Interruption::TimedOut)
        }
        caught = call => {
            let result = match caught {
                Ok(Ok(outcome)) => {
                    SyncResult::succeeded(job.connection_id(), sync_type, outcome.items_processed)
                }
                Ok(Err(err)) => SyncResult::failed(job.connection_id(), sync_type, err.to_string()),
                Err(panic) => SyncResult::failed(
                    job.connection_id(),
                    sync_type,
                    format!("sync panicked: {}", panic_message(panic.as_ref())),
                ),
            };
            Step::Finished(result)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
