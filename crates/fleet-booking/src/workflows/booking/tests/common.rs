use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::clock::FixedClock;
use crate::store::{InMemoryFleetStore, RepositoryError};
use crate::workflows::booking::audit::{AuditLogRepository, LogEntry};
use crate::workflows::booking::domain::{
    Actor, ActorRole, ActorSnapshot, ApprovalScope, AssignedDriver, NewBookingRequest, RequestId,
};
use crate::workflows::booking::registry::BookingStatus;
use crate::workflows::booking::repository::BookingRepository;
use crate::workflows::booking::{BookingRequest, RequestLifecycle};
use crate::workflows::notifications::{
    DispatchReport, NotificationDispatcher, NotificationError, NotificationTemplate, NotifyRole,
    NotifyType, StatusChangeNotifier, TemplateId,
};

pub(super) type StoreDispatcher =
    NotificationDispatcher<InMemoryFleetStore, InMemoryFleetStore, InMemoryFleetStore>;
pub(super) type StoreLifecycle =
    RequestLifecycle<InMemoryFleetStore, InMemoryFleetStore, StoreDispatcher>;

pub(super) fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 2)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .expect("valid instant")
}

pub(super) fn requester() -> Actor {
    Actor::new("E1000", ActorRole::VehicleUser).with_profile("Anong", "Finance")
}

pub(super) fn level1() -> Actor {
    Actor::new("E1001", ActorRole::Level1Approver).with_profile("Boonmee", "Finance")
}

pub(super) fn admin() -> Actor {
    Actor::new("E2001", ActorRole::Admin).with_profile("Chalerm", "Fleet Office")
}

pub(super) fn admin_dept() -> Actor {
    Actor::new("E2002", ActorRole::AdminDept).with_profile("Darin", "Finance")
}

pub(super) fn final_approver() -> Actor {
    Actor::new("E3001", ActorRole::FinalApprover).with_profile("Ekachai", "Executive Office")
}

fn designated(actor: &Actor) -> ActorSnapshot {
    actor.snapshot()
}

pub(super) fn draft(id: &str) -> NewBookingRequest {
    NewBookingRequest {
        request_id: RequestId(id.to_string()),
        request_no: id.to_string(),
        approval_scope: ApprovalScope::Fleet,
        vehicle_id: Some("VH-0042".to_string()),
        driver: Some(AssignedDriver {
            driver_uid: "DRV-7".to_string(),
            emp_id: "D7000".to_string(),
            is_carpool: true,
        }),
        reserved_start: start() + Duration::days(1),
        reserved_end: start() + Duration::days(2),
        confirmer: Some(designated(&level1())),
        approver: Some(designated(&final_approver())),
        remark: Some("site visit".to_string()),
    }
}

pub(super) fn template(
    id: &str,
    status: BookingStatus,
    role: NotifyRole,
    is_deleted: bool,
) -> NotificationTemplate {
    NotificationTemplate {
        id: TemplateId(id.to_string()),
        status_code: status.code().to_string(),
        notify_type: NotifyType::RequestBooking,
        notify_role: role,
        title: format!("status {}", status.code()),
        message: "คำขอ **request_no** เปลี่ยนสถานะ".to_string(),
        is_deleted,
    }
}

/// Templates for status 30: three live (one per addressed party) and one retired.
pub(super) fn inspection_templates() -> Vec<NotificationTemplate> {
    vec![
        template("T30-U", BookingStatus::PendingAdminInspection, NotifyRole::VehicleUser, false),
        template("T30-D", BookingStatus::PendingAdminInspection, NotifyRole::Driver, false),
        template(
            "T30-L",
            BookingStatus::PendingAdminInspection,
            NotifyRole::Level1Approval,
            false,
        ),
        template(
            "T30-F",
            BookingStatus::PendingAdminInspection,
            NotifyRole::FinalApproval,
            true,
        ),
    ]
}

pub(super) struct Harness {
    pub(super) lifecycle: StoreLifecycle,
    pub(super) store: Arc<InMemoryFleetStore>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryFleetStore::default());
    store.seed_templates(inspection_templates());
    let clock = Arc::new(FixedClock::new(start()));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        store.clone(),
        store.clone(),
        clock.clone(),
    ));
    let lifecycle = RequestLifecycle::new(store.clone(), store.clone(), dispatcher, clock.clone());
    Harness {
        lifecycle,
        store,
        clock,
    }
}

/// Lifecycle whose notifier always fails.
pub(super) fn harness_with_failing_notifier() -> (
    RequestLifecycle<InMemoryFleetStore, InMemoryFleetStore, FailingNotifier>,
    Arc<InMemoryFleetStore>,
) {
    let store = Arc::new(InMemoryFleetStore::default());
    let clock = Arc::new(FixedClock::new(start()));
    let lifecycle = RequestLifecycle::new(
        store.clone(),
        store.clone(),
        Arc::new(FailingNotifier),
        clock,
    );
    (lifecycle, store)
}

pub(super) struct FailingNotifier;

impl StatusChangeNotifier for FailingNotifier {
    fn notify(
        &self,
        _source_id: &str,
        _notify_type: NotifyType,
    ) -> Result<DispatchReport, NotificationError> {
        Err(NotificationError::Templates(RepositoryError::Unavailable(
            "template table offline".to_string(),
        )))
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    calls: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("notifier mutex poisoned").clone()
    }
}

impl StatusChangeNotifier for RecordingNotifier {
    fn notify(
        &self,
        source_id: &str,
        _notify_type: NotifyType,
    ) -> Result<DispatchReport, NotificationError> {
        self.calls
            .lock()
            .expect("notifier mutex poisoned")
            .push(source_id.to_string());
        Ok(DispatchReport::default())
    }
}

pub(super) struct UnavailableAuditLog;

impl AuditLogRepository for UnavailableAuditLog {
    fn append(&self, _entry: LogEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("audit table offline".to_string()))
    }

    fn entries_for(&self, _request_id: &RequestId) -> Result<Vec<LogEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("audit table offline".to_string()))
    }

    fn latest_with_status(
        &self,
        _request_id: &RequestId,
        _status: BookingStatus,
    ) -> Result<Option<LogEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("audit table offline".to_string()))
    }
}

/// Serves a fixed snapshot on read while writes go to the real store, so the status check
/// runs against data another writer has already moved past.
pub(super) struct StaleSnapshotBookings {
    pub(super) inner: InMemoryFleetStore,
    pub(super) snapshot: BookingRequest,
}

impl BookingRepository for StaleSnapshotBookings {
    fn insert(&self, request: BookingRequest) -> Result<BookingRequest, RepositoryError> {
        self.inner.insert(request)
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<BookingRequest>, RepositoryError> {
        Ok(Some(self.snapshot.clone()))
    }

    fn update_if_status(
        &self,
        expected: BookingStatus,
        request: BookingRequest,
    ) -> Result<(), RepositoryError> {
        self.inner.update_if_status(expected, request)
    }
}
