//! Tests for error types

use exchange_sync_scheduler::core::{SchedulerError, SyncError};
use exchange_sync_scheduler::util::serde::SyncType;

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull("max queue depth 2 reached".to_string());
    assert_eq!(format!("{}", err), "queue full: max queue depth 2 reached");
}

#[test]
fn test_duplicate_connection_error() {
    let err = SchedulerError::DuplicateConnection("conn-1".to_string());
    assert_eq!(format!("{}", err), "connection already scheduled: conn-1");
}

#[test]
fn test_shutting_down_error() {
    let err = SchedulerError::ShuttingDown;
    assert_eq!(format!("{}", err), "scheduler is shutting down");
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
}

#[test]
fn test_sync_errors() {
    assert_eq!(
        SyncError::Exchange("HTTP 429".into()).to_string(),
        "exchange error: HTTP 429"
    );
    assert_eq!(
        SyncError::Unsupported(SyncType::Deposits).to_string(),
        "sync type `deposits` not supported"
    );
    assert_eq!(SyncError::Cancelled.to_string(), "cancelled");
}

#[test]
fn test_into_anyhow() {
    fn fails() -> exchange_sync_scheduler::core::AppResult<()> {
        Err(SchedulerError::ShuttingDown)?
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}

#[test]
fn test_invalid_limits_error() {
    let err = SchedulerError::InvalidLimits("max_concurrent must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid scheduler limits: max_concurrent must be greater than 0"
    );
}
