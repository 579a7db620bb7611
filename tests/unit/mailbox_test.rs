//! Tests for mailbox implementations

use exchange_sync_scheduler::core::{JobOutcome, JobReport, JobSpec, ReportMailbox, SyncJob, SyncResult};
use exchange_sync_scheduler::infra::mailbox::memory::InMemoryMailbox;
use exchange_sync_scheduler::util::serde::SyncType;

fn make_report(connection_id: &str, user_id: &str, finished_at_ms: u128) -> JobReport {
    let job = SyncJob::new(
        JobSpec::full_sync(connection_id, user_id, "binance").with_sync_types([SyncType::Trades]),
    )
    .unwrap();
    let results = vec![SyncResult::succeeded(connection_id, SyncType::Trades, 3)];
    let mut report = JobReport::new(&job, results, JobOutcome::Succeeded, 0);
    report.finished_at_ms = finished_at_ms;
    report
}

#[test]
fn test_in_memory_mailbox_deliver_and_fetch() {
    let mut mailbox = InMemoryMailbox::new();

    mailbox.deliver(make_report("conn-1", "user-1", 100)).unwrap();
    mailbox.deliver(make_report("conn-2", "user-2", 100)).unwrap();

    let reports = mailbox.fetch("user-1", None, 10);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].connection_id, "conn-1");
    assert_eq!(reports[0].items_processed(), 3);
    assert_eq!(mailbox.len(), 2);
}

#[test]
fn test_fetch_since_and_limit() {
    let mut mailbox = InMemoryMailbox::new();
    for ts in [100, 200, 300] {
        mailbox.deliver(make_report("conn-1", "user-1", ts)).unwrap();
    }

    let since: Vec<u128> = mailbox
        .fetch("user-1", Some(200), 10)
        .iter()
        .map(|r| r.finished_at_ms)
        .collect();
    assert_eq!(since, vec![200, 300]);
    assert_eq!(mailbox.fetch("user-1", None, 1).len(), 1);
    assert!(mailbox.fetch("nobody", None, 10).is_empty());
}

#[test]
fn test_per_user_capacity_drops_oldest() {
    let mut mailbox = InMemoryMailbox::with_capacity_per_user(2);
    for ts in [1, 2, 3] {
        mailbox.deliver(make_report("conn-1", "user-1", ts)).unwrap();
    }

    let kept: Vec<u128> = mailbox
        .fetch("user-1", None, 10)
        .iter()
        .map(|r| r.finished_at_ms)
        .collect();
    assert_eq!(kept, vec![2, 3]);
}

#[test]
fn test_latest_for_connection_and_take() {
    let mut mailbox = InMemoryMailbox::default();
    mailbox.deliver(make_report("conn-1", "user-1", 10)).unwrap();
    mailbox.deliver(make_report("conn-1", "user-1", 30)).unwrap();
    mailbox.deliver(make_report("conn-2", "user-1", 20)).unwrap();

    let latest = mailbox.latest_for_connection("conn-1").unwrap();
    assert_eq!(latest.finished_at_ms, 30);
    assert!(mailbox.latest_for_connection("conn-9").is_none());

    assert_eq!(mailbox.take("user-1").len(), 3);
    assert!(mailbox.is_empty());
}
