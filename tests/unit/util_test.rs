//! Tests for utility functions

use exchange_sync_scheduler::util::{now_ms, JobId, Priority, SyncType};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
    assert_eq!(Priority::default(), Priority::Normal);
    assert_eq!(
        Priority::DISPATCH_ORDER,
        [Priority::High, Priority::Normal, Priority::Low]
    );
}

#[test]
fn test_priority_parse_and_display() {
    assert_eq!(" HIGH ".parse::<Priority>().unwrap(), Priority::High);
    assert_eq!(Priority::Low.to_string(), "low");
    assert!("urgent".parse::<Priority>().is_err());
    assert_eq!(serde_json::to_string(&Priority::Normal).unwrap(), "\"normal\"");
}

#[test]
fn test_sync_type_names() {
    for sync_type in SyncType::ALL {
        assert_eq!(sync_type.as_str().parse::<SyncType>().unwrap(), sync_type);
    }
    assert_eq!(
        serde_json::from_str::<SyncType>("\"withdrawals\"").unwrap(),
        SyncType::Withdrawals
    );
    assert!("positions".parse::<SyncType>().is_err());
}

#[test]
fn test_job_id_and_clock() {
    assert_ne!(JobId::new_v4(), JobId::new_v4());
    assert!(now_ms() > 1_600_000_000_000);
}

#[test]
fn test_init_tracing_installs_once() {
    use exchange_sync_scheduler::util::{init_tracing, init_tracing_with};

    // Whichever call runs first in this process installs the subscriber.
    let _ = init_tracing();
    assert!(!init_tracing());
    assert!(!init_tracing_with("debug"));
    tracing::info!("tracing initialised");
}
