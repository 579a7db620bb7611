//! Tests for builder modules

use async_trait::async_trait;
use exchange_sync_scheduler::builders::{build_scheduler, build_scheduler_with_queue};
use exchange_sync_scheduler::config::SchedulerConfig;
use exchange_sync_scheduler::core::{
    ExchangeClient, SchedulerError, SyncError, SyncOutcome, SyncRequest,
};
use exchange_sync_scheduler::infra::TieredQueue;
use exchange_sync_scheduler::runtime::TokioSpawner;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct NoopClient;

#[async_trait]
impl ExchangeClient for NoopClient {
    async fn sync(
        &self,
        _request: SyncRequest,
        _cancel: CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        Ok(SyncOutcome::default())
    }
}

#[tokio::test]
async fn test_build_scheduler_applies_limits() {
    let cfg = SchedulerConfig {
        max_concurrent: 7,
        max_queue_depth: 20,
        job_timeout_secs: 0,
        ..SchedulerConfig::default()
    };

    let scheduler = build_scheduler(&cfg, NoopClient, TokioSpawner::try_current().unwrap()).unwrap();
    let limits = scheduler.limits();
    assert_eq!(limits.max_concurrent, 7);
    assert_eq!(limits.max_queue_depth, 20);
    assert_eq!(limits.job_timeout, None);
    assert!(scheduler.is_idle());
}

#[tokio::test]
async fn test_build_scheduler_rejects_invalid_config() {
    let cfg = SchedulerConfig {
        max_concurrent: 0,
        ..SchedulerConfig::default()
    };

    let result = build_scheduler(&cfg, NoopClient, TokioSpawner::try_current().unwrap());
    assert!(matches!(result, Err(SchedulerError::Backend(ref msg)) if msg.contains("config invalid")));
}

#[tokio::test]
async fn test_build_scheduler_with_custom_queue() {
    let cfg = SchedulerConfig::default();
    let scheduler = build_scheduler_with_queue(
        &cfg,
        |cfg| Ok(TieredQueue::new(cfg.max_queue_depth)),
        NoopClient,
        TokioSpawner::try_current().unwrap(),
    )
    .unwrap();
    assert_eq!(scheduler.limits().job_timeout, Some(Duration::from_secs(300)));

    let mismatched = build_scheduler_with_queue(
        &cfg,
        |cfg| Ok(TieredQueue::new(cfg.max_queue_depth / 2)),
        NoopClient,
        TokioSpawner::try_current().unwrap(),
    );
    assert!(matches!(mismatched, Err(SchedulerError::InvalidLimits(_))));

    let failing = build_scheduler_with_queue::<_, TieredQueue, _, _>(
        &cfg,
        |_| Err(SchedulerError::Backend("queue unavailable".into())),
        NoopClient,
        TokioSpawner::try_current().unwrap(),
    );
    assert!(failing.is_err());
}

#[tokio::test]
async fn test_build_scheduler_rejects_oversized_timeout() {
    let cfg = SchedulerConfig::from_lookup(|key| {
        (key == "SYNC_JOB_TIMEOUT_SECS").then(|| u64::MAX.to_string())
    });
    assert!(cfg.is_err());

    let cfg = SchedulerConfig {
        job_timeout_secs: u64::MAX,
        ..SchedulerConfig::default()
    };
    let result = build_scheduler(&cfg, NoopClient, TokioSpawner::try_current().unwrap());
    assert!(matches!(result, Err(SchedulerError::Backend(_))));
}
