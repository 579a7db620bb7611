//! Builders to construct a sync scheduler from configuration.

use crate::config::SchedulerConfig;
use crate::core::{ExchangeClient, JobQueue, SchedulerError, Spawn, SyncScheduler};
use crate::infra::TieredQueue;

/// Build a scheduler backed by the in-memory tiered queue.
///
/// # Errors
///
/// `SchedulerError::Backend` when the configuration fails validation.
pub fn build_scheduler<C, S>(
    cfg: &SchedulerConfig,
    client: C,
    spawner: S,
) -> Result<SyncScheduler<C, TieredQueue, S>, SchedulerError>
where
    C: ExchangeClient,
    S: Spawn + Clone + Send + 'static,
{
    build_scheduler_with_queue(cfg, |cfg| Ok(TieredQueue::new(cfg.max_queue_depth)), client, spawner)
}

/// Build a scheduler using a caller-supplied queue factory.
///
/// # Errors
///
/// `SchedulerError::Backend` when the configuration fails validation,
/// `SchedulerError::InvalidLimits` when the queue's bound differs from
/// `max_queue_depth`, or whatever the factory returns.
pub fn build_scheduler_with_queue<C, Q, S, FQ>(
    cfg: &SchedulerConfig,
    queue_factory: FQ,
    client: C,
    spawner: S,
) -> Result<SyncScheduler<C, Q, S>, SchedulerError>
where
    C: ExchangeClient,
    Q: JobQueue + 'static,
    S: Spawn + Clone + Send + 'static,
    FQ: FnOnce(&SchedulerConfig) -> Result<Q, SchedulerError>,
{
    cfg.validate()
        .map_err(|e| SchedulerError::Backend(format!("config invalid: {e}")))?;

    let queue = queue_factory(cfg)?;
    SyncScheduler::new(cfg.limits(), queue, client, spawner)
}
