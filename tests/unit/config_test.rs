//! Tests for configuration validation

use exchange_sync_scheduler::config::scheduler::{
    ENV_DUPLICATE_POLICY, ENV_JOB_TIMEOUT_SECS, ENV_MAX_QUEUE_DEPTH,
};
use exchange_sync_scheduler::config::SchedulerConfig;
use exchange_sync_scheduler::core::DuplicatePolicy;
use std::time::Duration;

#[test]
fn test_scheduler_config_validation() {
    let valid = SchedulerConfig {
        max_concurrent: 3,
        max_queue_depth: 50,
        job_timeout_secs: 60,
        duplicate_policy: DuplicatePolicy::Reject,
    };
    assert!(valid.validate().is_ok());
}

#[test]
fn test_scheduler_config_invalid_max_concurrent() {
    let invalid = SchedulerConfig {
        max_concurrent: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_queue_depth() {
    let invalid = SchedulerConfig {
        max_queue_depth: 0,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_zero_timeout_disables_deadline() {
    let cfg = SchedulerConfig {
        job_timeout_secs: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.limits().job_timeout, None);
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = SchedulerConfig::from_json_str(r#"{ "max_concurrent": 5, "duplicate_policy": "coalesce" }"#)
        .unwrap();
    assert_eq!(cfg.max_concurrent, 5);
    assert_eq!(cfg.max_queue_depth, 10_000);
    assert_eq!(cfg.job_timeout(), Some(Duration::from_secs(300)));
    assert_eq!(cfg.duplicate_policy, DuplicatePolicy::Coalesce);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str("not json").is_err());
    let err = SchedulerConfig::from_json_str(r#"{ "max_concurrent": 0 }"#).unwrap_err();
    assert!(err.contains("max_concurrent"));
}

#[test]
fn test_from_lookup() {
    let cfg = SchedulerConfig::from_lookup(|key| match key {
        k if k == ENV_MAX_QUEUE_DEPTH => Some("25".to_string()),
        k if k == ENV_JOB_TIMEOUT_SECS => Some("30".to_string()),
        k if k == ENV_DUPLICATE_POLICY => Some("allow".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(cfg.max_concurrent, 3);
    assert_eq!(cfg.max_queue_depth, 25);
    assert_eq!(cfg.job_timeout_secs, 30);
    assert_eq!(cfg.duplicate_policy, DuplicatePolicy::Allow);
}

#[test]
fn test_config_json_roundtrip() {
    let cfg = SchedulerConfig::default();
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"duplicate_policy\":\"reject\""));
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_scheduler_config_rejects_oversized_timeout() {
    let invalid = SchedulerConfig {
        job_timeout_secs: u64::MAX,
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());

    let err = SchedulerConfig::from_json_str(r#"{ "job_timeout_secs": 18446744073709551615 }"#)
        .unwrap_err();
    assert!(err.contains("job_timeout_secs"));
}
