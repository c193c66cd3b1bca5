use super::common::*;
use crate::clock::FixedClock;
use crate::store::InMemoryFleetStore;
use crate::workflows::booking::audit::AuditLogRepository;
use crate::workflows::booking::domain::{
    Actor, ActorRole, ApprovalScope, LifecycleAction, RequestId,
};
use crate::workflows::booking::registry::BookingStatus;
use crate::workflows::booking::repository::BookingRepository;
use crate::workflows::booking::{LifecycleError, RequestLifecycle, TransitionCommand};
use chrono::Duration;
use std::sync::{Arc, Barrier};
use std::thread;

fn command(id: &str, action: LifecycleAction, actor: Actor) -> TransitionCommand {
    TransitionCommand {
        request_id: RequestId(id.to_string()),
        action,
        actor,
        remark: None,
    }
}

#[test]
fn submit_records_intake_row_at_pending_level1() {
    let harness = harness();
    let stored = harness
        .lifecycle
        .submit(draft("REQ-001"), &requester())
        .expect("submit");

    assert_eq!(stored.status, BookingStatus::PendingLevel1Approval);
    assert_eq!(stored.creator_emp_id(), "E1000");

    let history = harness
        .lifecycle
        .history(&stored.request_id)
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, BookingStatus::PendingLevel1Approval);
    assert_eq!(history[0].remark.as_deref(), Some("site visit"));
}

#[test]
fn duplicate_submit_is_a_client_error() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-001"), &requester())
        .expect("first submit");

    match harness.lifecycle.submit(draft("REQ-001"), &requester()) {
        Err(err @ LifecycleError::AlreadyExists(_)) => {
            assert!(err.is_client_error());
            assert!(!err.is_retryable());
        }
        other => panic!("expected duplicate request error, got {other:?}"),
    }
    let history = harness
        .lifecycle
        .history(&RequestId("REQ-001".to_string()))
        .expect("history");
    assert_eq!(history.len(), 1);
}

#[test]
fn level1_approval_logs_and_fans_out_notifications() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-001"), &requester())
        .expect("submit");
    harness.clock.advance(Duration::minutes(30));

    let outcome = harness
        .lifecycle
        .transition(command("REQ-001", LifecycleAction::Approve, level1()))
        .expect("level-1 approve");

    assert_eq!(outcome.from, BookingStatus::PendingLevel1Approval);
    assert_eq!(outcome.to, BookingStatus::PendingAdminInspection);
    assert_eq!(outcome.log_entry.request_id, RequestId("REQ-001".to_string()));
    assert_eq!(outcome.log_entry.status, BookingStatus::PendingAdminInspection);
    assert_eq!(outcome.log_entry.actor_emp_id, "E1001");
    assert_eq!(outcome.log_entry.created_at, start() + Duration::minutes(30));

    let stored = harness
        .store
        .fetch(&RequestId("REQ-001".to_string()))
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, BookingStatus::PendingAdminInspection);
    let confirmed = stored.confirmed.expect("confirmer stamp");
    assert_eq!(confirmed.actor.emp_id, "E1001");
    assert_eq!(confirmed.actor.department, "Finance");

    // Three live templates for status 30 with a resolvable recipient; the retired one is ignored.
    let report = outcome.notifications.expect("dispatch report");
    assert_eq!(report.created.len(), 3);
    assert!(report.skipped.is_empty());
    assert!(report.is_clean());

    let notifications = harness.store.notifications();
    assert_eq!(notifications.len(), 3);
    let mut recipients: Vec<&str> = notifications
        .iter()
        .map(|notification| notification.recipient_emp_id.as_str())
        .collect();
    recipients.sort_unstable();
    assert_eq!(recipients, vec!["D7000", "E1000", "E1001"]);
    assert!(notifications.iter().all(|notification| {
        notification.message == "คำขอ REQ-001 เปลี่ยนสถานะ" && !notification.is_read
    }));
}

#[test]
fn empty_recipient_is_skipped_not_created() {
    let harness = harness();
    let mut draft = draft("REQ-002");
    draft.driver = None;
    harness
        .lifecycle
        .submit(draft, &requester())
        .expect("submit");

    let outcome = harness
        .lifecycle
        .transition(command("REQ-002", LifecycleAction::Approve, level1()))
        .expect("approve");

    let report = outcome.notifications.expect("report");
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "T30-D");
}

#[test]
fn wrong_source_status_is_rejected_without_side_effects() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-003"), &requester())
        .expect("submit");

    match harness
        .lifecycle
        .transition(command("REQ-003", LifecycleAction::Approve, final_approver()))
    {
        Err(LifecycleError::InvalidTransition { action, from }) => {
            assert_eq!(action, LifecycleAction::Approve);
            assert_eq!(from, BookingStatus::PendingLevel1Approval);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }

    let id = RequestId("REQ-003".to_string());
    let stored = harness.store.fetch(&id).expect("fetch").expect("present");
    assert_eq!(stored.status, BookingStatus::PendingLevel1Approval);
    assert!(stored.approved.is_none());
    assert_eq!(harness.lifecycle.history(&id).expect("history").len(), 1);
    assert!(harness.store.notifications().is_empty());
}

#[test]
fn roles_outside_the_action_are_unauthorized() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-004"), &requester())
        .expect("submit");

    match harness
        .lifecycle
        .transition(command("REQ-004", LifecycleAction::Approve, requester()))
    {
        Err(LifecycleError::Unauthorized { role, .. }) => {
            assert_eq!(role, ActorRole::VehicleUser)
        }
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[test]
fn admin_dept_cannot_inspect_fleet_scoped_requests() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-005"), &requester())
        .expect("submit");
    harness
        .lifecycle
        .transition(command("REQ-005", LifecycleAction::Approve, level1()))
        .expect("level-1 approve");

    let err = harness
        .lifecycle
        .transition(command("REQ-005", LifecycleAction::Approve, admin_dept()))
        .expect_err("department admin on fleet request");
    assert!(matches!(err, LifecycleError::Unauthorized { .. }));
    assert!(err.is_client_error());
}

#[test]
fn department_scoped_request_walks_to_completion() {
    let harness = harness();
    let mut draft = draft("REQ-006");
    draft.approval_scope = ApprovalScope::Department;
    harness
        .lifecycle
        .submit(draft, &requester())
        .expect("submit");

    let steps = [
        (LifecycleAction::Approve, level1(), BookingStatus::PendingAdminInspection),
        (LifecycleAction::SendBack, admin_dept(), BookingStatus::ReturnedByAdmin),
        (LifecycleAction::Resubmit, requester(), BookingStatus::PendingAdminInspection),
        (LifecycleAction::Approve, admin_dept(), BookingStatus::PendingFinalApproval),
        (LifecycleAction::Approve, final_approver(), BookingStatus::PendingKeyHandover),
        (LifecycleAction::HandOverKey, admin_dept(), BookingStatus::PendingVehiclePickup),
        (LifecycleAction::PickUpVehicle, requester(), BookingStatus::InTransit),
        (LifecycleAction::ReturnVehicle, requester(), BookingStatus::PendingReturnInspection),
        (LifecycleAction::RejectReturn, admin_dept(), BookingStatus::ReturnFailed),
        (LifecycleAction::ResubmitReturn, requester(), BookingStatus::PendingReturnInspection),
        (LifecycleAction::AcceptReturn, admin_dept(), BookingStatus::Completed),
    ];

    for (action, actor, expected) in steps {
        harness.clock.advance(Duration::hours(1));
        let outcome = harness
            .lifecycle
            .transition(command("REQ-006", action, actor))
            .unwrap_or_else(|err| panic!("{action} failed: {err}"));
        assert_eq!(outcome.to, expected, "after {action}");
    }

    let id = RequestId("REQ-006".to_string());
    let stored = harness.store.fetch(&id).expect("fetch").expect("present");
    assert!(stored.inspected.is_some());
    assert_eq!(
        stored.approver.as_ref().map(|actor| actor.emp_id.as_str()),
        Some("E3001")
    );
    assert!(stored.key_handover.is_some());
    assert!(stored.picked_up.is_some());
    assert!(stored.return_inspected.is_some());

    let history = harness.lifecycle.history(&id).expect("history");
    assert_eq!(history.len(), 12);
    assert!(history
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));

    let err = harness
        .lifecycle
        .transition(command("REQ-006", LifecycleAction::Cancel, admin_dept()))
        .expect_err("completed requests are terminal");
    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
}

#[test]
fn cancel_records_the_canceling_role() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-007"), &requester())
        .expect("submit");

    let outcome = harness
        .lifecycle
        .transition(TransitionCommand {
            request_id: RequestId("REQ-007".to_string()),
            action: LifecycleAction::Cancel,
            actor: admin(),
            remark: Some("vehicle unavailable".to_string()),
        })
        .expect("admin cancel");
    assert_eq!(outcome.to, BookingStatus::Canceled);

    let id = RequestId("REQ-007".to_string());
    let cancel_row = harness
        .store
        .latest_with_status(&id, BookingStatus::Canceled)
        .expect("query")
        .expect("cancel row");
    assert_eq!(cancel_row.actor_role, ActorRole::Admin);
    assert_eq!(cancel_row.remark.as_deref(), Some("vehicle unavailable"));

    match harness
        .lifecycle
        .transition(command("REQ-007", LifecycleAction::Cancel, admin()))
    {
        Err(LifecycleError::InvalidTransition { from, .. }) => {
            assert_eq!(from, BookingStatus::Canceled)
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn requester_cannot_cancel_once_in_transit() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-008"), &requester())
        .expect("submit");
    for (action, actor) in [
        (LifecycleAction::Approve, level1()),
        (LifecycleAction::Approve, admin()),
        (LifecycleAction::Approve, final_approver()),
        (LifecycleAction::HandOverKey, admin()),
        (LifecycleAction::PickUpVehicle, requester()),
    ] {
        harness
            .lifecycle
            .transition(command("REQ-008", action, actor))
            .expect("advance");
    }

    let err = harness
        .lifecycle
        .transition(command("REQ-008", LifecycleAction::Cancel, requester()))
        .expect_err("trip already started");
    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));

    harness
        .lifecycle
        .transition(command("REQ-008", LifecycleAction::Cancel, admin()))
        .expect("admin may still cancel");
}

#[test]
fn blank_and_missing_identifiers_are_client_errors() {
    let harness = harness();

    let err = harness
        .lifecycle
        .transition(command("  ", LifecycleAction::Approve, level1()))
        .expect_err("blank id");
    assert!(matches!(err, LifecycleError::InvalidIdentifier(_)));

    let err = harness
        .lifecycle
        .transition(command("REQ-404", LifecycleAction::Approve, level1()))
        .expect_err("missing request");
    assert!(matches!(err, LifecycleError::NotFound(_)));
    assert!(err.is_client_error());

    let mut blank_actor = level1();
    blank_actor.emp_id = String::new();
    let err = harness
        .lifecycle
        .submit(draft("REQ-009"), &blank_actor)
        .expect_err("blank creator");
    assert!(matches!(err, LifecycleError::InvalidIdentifier("actor id")));
}

#[test]
fn notifier_failure_does_not_fail_the_transition() {
    let (lifecycle, store) = harness_with_failing_notifier();
    lifecycle
        .submit(draft("REQ-010"), &requester())
        .expect("submit despite notifier failure");

    let outcome = lifecycle
        .transition(command("REQ-010", LifecycleAction::SendBack, level1()))
        .expect("send back despite notifier failure");
    assert_eq!(outcome.to, BookingStatus::ReturnedByLevel1);
    assert!(outcome.notifications.is_none());

    let stored = store
        .fetch(&RequestId("REQ-010".to_string()))
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, BookingStatus::ReturnedByLevel1);
}

#[test]
fn notifier_is_called_once_per_status_change() {
    let store = Arc::new(InMemoryFleetStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let lifecycle = RequestLifecycle::new(
        store.clone(),
        store.clone(),
        notifier.clone(),
        Arc::new(FixedClock::new(start())),
    );

    lifecycle
        .submit(draft("REQ-011"), &requester())
        .expect("submit");
    lifecycle
        .transition(command("REQ-011", LifecycleAction::Approve, level1()))
        .expect("approve");
    let _ = lifecycle.transition(command("REQ-011", LifecycleAction::Approve, level1()));

    assert_eq!(notifier.calls(), vec!["REQ-011", "REQ-011"]);
}

#[test]
fn audit_failure_after_persisting_is_surfaced() {
    let store = Arc::new(InMemoryFleetStore::default());
    let clock = Arc::new(FixedClock::new(start()));
    let healthy = RequestLifecycle::new(
        store.clone(),
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        clock.clone(),
    );
    healthy
        .submit(draft("REQ-012"), &requester())
        .expect("submit");

    let broken_log = RequestLifecycle::new(
        store.clone(),
        Arc::new(UnavailableAuditLog),
        Arc::new(RecordingNotifier::default()),
        clock,
    );
    let err = broken_log
        .transition(command("REQ-012", LifecycleAction::Approve, level1()))
        .expect_err("audit write fails");
    assert!(matches!(err, LifecycleError::Audit(_)));
    assert!(!err.is_client_error());
}

#[test]
fn stale_read_loses_the_compare_and_swap() {
    let store = InMemoryFleetStore::default();
    let clock = Arc::new(FixedClock::new(start()));
    let intake = RequestLifecycle::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(RecordingNotifier::default()),
        clock.clone(),
    );
    let snapshot = intake
        .submit(draft("REQ-013"), &requester())
        .expect("submit");
    intake
        .transition(command("REQ-013", LifecycleAction::Approve, level1()))
        .expect("first approval wins");

    let notifier = Arc::new(RecordingNotifier::default());
    let racing = RequestLifecycle::new(
        Arc::new(StaleSnapshotBookings {
            inner: store.clone(),
            snapshot,
        }),
        Arc::new(store.clone()),
        notifier.clone(),
        clock,
    );
    let err = racing
        .transition(command("REQ-013", LifecycleAction::SendBack, level1()))
        .expect_err("status moved underneath");
    assert!(matches!(err, LifecycleError::Conflict(_)));
    assert!(err.is_retryable());

    let id = RequestId("REQ-013".to_string());
    assert_eq!(
        store.fetch(&id).expect("fetch").expect("present").status,
        BookingStatus::PendingAdminInspection
    );
    assert_eq!(store.entries_for(&id).expect("history").len(), 2);
    assert!(notifier.calls().is_empty());
}

#[test]
fn concurrent_approvals_let_exactly_one_through() {
    let harness = harness();
    harness
        .lifecycle
        .submit(draft("REQ-014"), &requester())
        .expect("submit");

    let lifecycle = Arc::new(harness.lifecycle);
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let lifecycle = Arc::clone(&lifecycle);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                lifecycle.transition(command("REQ-014", LifecycleAction::Approve, level1()))
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread joins"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    let failure = results
        .into_iter()
        .find_map(Result::err)
        .expect("one approval fails");
    assert!(matches!(
        failure,
        LifecycleError::Conflict(_) | LifecycleError::InvalidTransition { .. }
    ));

    let id = RequestId("REQ-014".to_string());
    let history = harness.store.entries_for(&id).expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].status, BookingStatus::PendingAdminInspection);
}
