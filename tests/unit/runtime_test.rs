//! Tests for tokio spawner utilities

use exchange_sync_scheduler::core::{SchedulerError, Spawn};
use exchange_sync_scheduler::runtime::tokio_spawner::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_try_current_outside_runtime() {
    let result = TokioSpawner::try_current();
    assert!(matches!(result, Err(SchedulerError::Backend(_))));
}
