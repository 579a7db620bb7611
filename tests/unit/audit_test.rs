//! Tests for audit sink

use exchange_sync_scheduler::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink, TracingAuditSink};
use exchange_sync_scheduler::util::serde::JobId;

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let job_id = JobId::new_v4();

    let event = build_audit_event(
        job_id,
        "conn-1",
        "user-1",
        AuditAction::Enqueue,
        Some("high".to_string()),
    );

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].job_id, job_id);
    assert_eq!(events[0].connection_id, "conn-1");
    assert_eq!(events[0].action, AuditAction::Enqueue);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let ids: Vec<JobId> = (0..3).map(|_| JobId::new_v4()).collect();

    for id in &ids {
        sink.record(build_audit_event(*id, "conn", "user", AuditAction::Enqueue, None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].job_id, ids[1]); // First one popped
    assert_eq!(events[1].job_id, ids[2]);
}

#[test]
fn test_events_for_job() {
    let mut sink = InMemoryAuditSink::new(10);
    let (a, b) = (JobId::new_v4(), JobId::new_v4());

    sink.record(build_audit_event(a, "c1", "u", AuditAction::Enqueue, None));
    sink.record(build_audit_event(b, "c2", "u", AuditAction::Enqueue, None));
    sink.record(build_audit_event(a, "c1", "u", AuditAction::Dispatch, None));

    let actions: Vec<_> = sink.events_for(a).into_iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::Enqueue, AuditAction::Dispatch]);
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(JobId::new_v4(), "c", "u", AuditAction::Drop, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let job_id = JobId::new_v4();
    let event = build_audit_event(
        job_id,
        "conn-1",
        "user-1",
        AuditAction::Complete,
        Some("succeeded".to_string()),
    );

    assert!(event.event_id.starts_with(&job_id.to_string()));
    assert!(event.event_id.contains("complete"));
    assert_eq!(event.user_id, "user-1");
    assert_eq!(event.detail, Some("succeeded".to_string()));
    assert!(event.created_at_ms > 0);

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "complete");
}

#[test]
fn test_tracing_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event(JobId::new_v4(), "c", "u", AuditAction::Cancel, None));
}
