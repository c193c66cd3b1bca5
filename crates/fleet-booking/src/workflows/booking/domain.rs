use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::registry::BookingStatus;
use crate::workflows::notifications::{NotificationSource, NotifyType};

/// Identifier wrapper for booking requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role an actor holds when acting on a booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorRole {
    VehicleUser,
    #[serde(rename = "level1-approver")]
    Level1Approver,
    Admin,
    AdminDept,
    FinalApprover,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::VehicleUser => "vehicle-user",
            ActorRole::Level1Approver => "level1-approver",
            ActorRole::Admin => "admin",
            ActorRole::AdminDept => "admin-dept",
            ActorRole::FinalApprover => "final-approver",
        }
    }

    /// Fleet admins handle fleet-scoped requests; department admins handle department-scoped ones.
    pub const fn acts_on(self, scope: ApprovalScope) -> bool {
        match self {
            ActorRole::Admin => matches!(scope, ApprovalScope::Fleet),
            ActorRole::AdminDept => matches!(scope, ApprovalScope::Department),
            ActorRole::VehicleUser | ActorRole::Level1Approver | ActorRole::FinalApprover => true,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which administrative desk inspects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalScope {
    #[default]
    Fleet,
    Department,
}

/// Lifecycle actions exposed to requesters, approvers, and admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Approve,
    SendBack,
    Resubmit,
    HandOverKey,
    PickUpVehicle,
    ReturnVehicle,
    AcceptReturn,
    RejectReturn,
    ResubmitReturn,
    Cancel,
}

impl LifecycleAction {
    pub const fn label(self) -> &'static str {
        match self {
            LifecycleAction::Approve => "approve",
            LifecycleAction::SendBack => "send_back",
            LifecycleAction::Resubmit => "resubmit",
            LifecycleAction::HandOverKey => "hand_over_key",
            LifecycleAction::PickUpVehicle => "pick_up_vehicle",
            LifecycleAction::ReturnVehicle => "return_vehicle",
            LifecycleAction::AcceptReturn => "accept_return",
            LifecycleAction::RejectReturn => "reject_return",
            LifecycleAction::ResubmitReturn => "resubmit_return",
            LifecycleAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The party performing a lifecycle action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub emp_id: String,
    pub role: ActorRole,
    pub name: String,
    pub department: String,
}

impl Actor {
    pub fn new(emp_id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            emp_id: emp_id.into(),
            role,
            name: String::new(),
            department: String::new(),
        }
    }

    pub fn with_profile(mut self, name: impl Into<String>, department: impl Into<String>) -> Self {
        self.name = name.into();
        self.department = department.into();
        self
    }

    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            emp_id: self.emp_id.clone(),
            name: self.name.clone(),
            department: self.department.clone(),
        }
    }
}

/// Name and department as they were when the actor acted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub emp_id: String,
    pub name: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStamp {
    pub actor: ActorSnapshot,
    pub at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// Driver assigned to the trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedDriver {
    pub driver_uid: String,
    pub emp_id: String,
    /// Pool driver rather than the requester driving themselves.
    pub is_carpool: bool,
}

/// Booking request as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub request_id: RequestId,
    pub request_no: String,
    pub status: BookingStatus,
    pub approval_scope: ApprovalScope,
    pub vehicle_id: Option<String>,
    pub driver: Option<AssignedDriver>,
    pub reserved_start: NaiveDateTime,
    pub reserved_end: NaiveDateTime,
    /// Level-1 approver: designated at intake, replaced by whoever acts at that stage.
    pub confirmer: Option<ActorSnapshot>,
    /// Final approver: designated at intake, replaced by whoever acts at that stage.
    pub approver: Option<ActorSnapshot>,
    pub created: ActionStamp,
    pub confirmed: Option<ActionStamp>,
    pub inspected: Option<ActionStamp>,
    pub approved: Option<ActionStamp>,
    pub resubmitted: Option<ActionStamp>,
    pub key_handover: Option<ActionStamp>,
    pub picked_up: Option<ActionStamp>,
    pub returned: Option<ActionStamp>,
    pub return_inspected: Option<ActionStamp>,
    pub canceled: Option<ActionStamp>,
    pub updated_at: NaiveDateTime,
}

impl BookingRequest {
    /// True iff a pool driver is assigned to the trip.
    pub fn is_use_driver(&self) -> bool {
        self.driver
            .as_ref()
            .map(|driver| driver.is_carpool)
            .unwrap_or(false)
    }

    /// Compares calendar days only.
    pub fn is_return_overdue(&self, today: NaiveDate) -> bool {
        today > self.reserved_end.date()
    }

    pub fn creator_emp_id(&self) -> &str {
        &self.created.actor.emp_id
    }

    /// Parties addressable by `request-booking` templates.
    pub fn notification_source(&self) -> NotificationSource {
        NotificationSource {
            source_id: self.request_id.0.clone(),
            request_no: self.request_no.clone(),
            status_code: self.status.code().to_string(),
            notify_type: NotifyType::RequestBooking,
            creator: Some(self.created.actor.emp_id.clone()),
            driver: self.driver.as_ref().map(|driver| driver.emp_id.clone()),
            confirmer: self.confirmer.as_ref().map(|actor| actor.emp_id.clone()),
            approver: self.approver.as_ref().map(|actor| actor.emp_id.clone()),
        }
    }

    /// Stores `stamp` in the slot owned by `action` when performed by `role`.
    pub(crate) fn record_action(
        &mut self,
        action: LifecycleAction,
        role: ActorRole,
        stamp: ActionStamp,
    ) {
        let slot = match (action, role) {
            (LifecycleAction::Cancel, _) => &mut self.canceled,
            (LifecycleAction::Approve | LifecycleAction::SendBack, ActorRole::Level1Approver) => {
                self.confirmer = Some(stamp.actor.clone());
                &mut self.confirmed
            }
            (LifecycleAction::Approve | LifecycleAction::SendBack, ActorRole::FinalApprover) => {
                self.approver = Some(stamp.actor.clone());
                &mut self.approved
            }
            (LifecycleAction::Approve | LifecycleAction::SendBack, _) => &mut self.inspected,
            (LifecycleAction::Resubmit, _) => &mut self.resubmitted,
            (LifecycleAction::HandOverKey, _) => &mut self.key_handover,
            (LifecycleAction::PickUpVehicle, _) => &mut self.picked_up,
            (LifecycleAction::ReturnVehicle | LifecycleAction::ResubmitReturn, _) => {
                &mut self.returned
            }
            (LifecycleAction::AcceptReturn | LifecycleAction::RejectReturn, _) => {
                &mut self.return_inspected
            }
        };
        *slot = Some(stamp);
    }
}

/// Intake payload for a new booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookingRequest {
    pub request_id: RequestId,
    pub request_no: String,
    pub approval_scope: ApprovalScope,
    pub vehicle_id: Option<String>,
    pub driver: Option<AssignedDriver>,
    pub reserved_start: NaiveDateTime,
    pub reserved_end: NaiveDateTime,
    pub confirmer: Option<ActorSnapshot>,
    pub approver: Option<ActorSnapshot>,
    pub remark: Option<String>,
}

/// Read projection with the derived display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingView {
    pub request_id: RequestId,
    pub request_no: String,
    pub status_code: BookingStatus,
    pub status_name: &'static str,
    pub can_cancel_request: bool,
    pub is_use_driver: bool,
    pub is_return_overdue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_by_role: Option<ActorRole>,
}
