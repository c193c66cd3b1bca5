use serde::{Deserialize, Serialize};
use std::fmt;

use super::domain::ActorRole::{Admin, AdminDept, FinalApprover, Level1Approver, VehicleUser};
use super::domain::LifecycleAction as A;
use super::domain::{ActorRole, ApprovalScope, LifecycleAction};
use BookingStatus as S;

/// Position of a booking request in its approval and fulfillment pipeline.
///
/// Serialized as the two-digit status code used by the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BookingStatus {
    PendingLevel1Approval,
    ReturnedByLevel1,
    PendingAdminInspection,
    ReturnedByAdmin,
    PendingFinalApproval,
    ReturnedByFinalApprover,
    PendingKeyHandover,
    PendingVehiclePickup,
    InTransit,
    PendingReturnInspection,
    ReturnFailed,
    Completed,
    Canceled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 13] = [
        BookingStatus::PendingLevel1Approval,
        BookingStatus::ReturnedByLevel1,
        BookingStatus::PendingAdminInspection,
        BookingStatus::ReturnedByAdmin,
        BookingStatus::PendingFinalApproval,
        BookingStatus::ReturnedByFinalApprover,
        BookingStatus::PendingKeyHandover,
        BookingStatus::PendingVehiclePickup,
        BookingStatus::InTransit,
        BookingStatus::PendingReturnInspection,
        BookingStatus::ReturnFailed,
        BookingStatus::Completed,
        BookingStatus::Canceled,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            BookingStatus::PendingLevel1Approval => "20",
            BookingStatus::ReturnedByLevel1 => "21",
            BookingStatus::PendingAdminInspection => "30",
            BookingStatus::ReturnedByAdmin => "31",
            BookingStatus::PendingFinalApproval => "40",
            BookingStatus::ReturnedByFinalApprover => "41",
            BookingStatus::PendingKeyHandover => "50",
            BookingStatus::PendingVehiclePickup => "51",
            BookingStatus::InTransit => "60",
            BookingStatus::PendingReturnInspection => "70",
            BookingStatus::ReturnFailed => "71",
            BookingStatus::Completed => "80",
            BookingStatus::Canceled => "90",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Display name shown to requesters and approvers.
    pub const fn display_name(self) -> &'static str {
        match self {
            BookingStatus::PendingLevel1Approval => "รออนุมัติ",
            BookingStatus::ReturnedByLevel1 => "ตีกลับ",
            BookingStatus::PendingAdminInspection => "รอตรวจสอบ",
            BookingStatus::ReturnedByAdmin => "ตีกลับ",
            BookingStatus::PendingFinalApproval => "รออนุมัติ",
            BookingStatus::ReturnedByFinalApprover => "ตีกลับ",
            BookingStatus::PendingKeyHandover => "รอรับกุญแจ",
            BookingStatus::PendingVehiclePickup => "รอรับยานพาหนะ",
            BookingStatus::InTransit => "เดินทาง",
            BookingStatus::PendingReturnInspection => "รอตรวจสอบ",
            BookingStatus::ReturnFailed => "คืนยานพาหนะไม่สำเร็จ",
            BookingStatus::Completed => "เสร็จสิ้น",
            BookingStatus::Canceled => "ยกเลิกคำขอ",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Canceled)
    }

    /// Statuses before the trip starts.
    pub const fn is_pre_trip(self) -> bool {
        matches!(
            self,
            BookingStatus::PendingLevel1Approval
                | BookingStatus::ReturnedByLevel1
                | BookingStatus::PendingAdminInspection
                | BookingStatus::ReturnedByAdmin
                | BookingStatus::PendingFinalApproval
                | BookingStatus::ReturnedByFinalApprover
                | BookingStatus::PendingKeyHandover
                | BookingStatus::PendingVehiclePickup
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<BookingStatus> for String {
    fn from(value: BookingStatus) -> Self {
        value.code().to_string()
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = UnknownStatusCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BookingStatus::from_code(&value).ok_or(UnknownStatusCode(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown booking status code '{0}'")]
pub struct UnknownStatusCode(pub String);

/// One permitted edge of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub action: LifecycleAction,
    pub role: ActorRole,
    pub from: BookingStatus,
    pub to: BookingStatus,
}

const fn rule(
    action: LifecycleAction,
    role: ActorRole,
    from: BookingStatus,
    to: BookingStatus,
) -> TransitionRule {
    TransitionRule {
        action,
        role,
        from,
        to,
    }
}

// Cancel is not listed here; see `StatusRegistry::can_cancel`.
const RULES: &[TransitionRule] = &[
    rule(A::Approve, Level1Approver, S::PendingLevel1Approval, S::PendingAdminInspection),
    rule(A::SendBack, Level1Approver, S::PendingLevel1Approval, S::ReturnedByLevel1),
    rule(A::Approve, Admin, S::PendingAdminInspection, S::PendingFinalApproval),
    rule(A::SendBack, Admin, S::PendingAdminInspection, S::ReturnedByAdmin),
    rule(A::Approve, AdminDept, S::PendingAdminInspection, S::PendingFinalApproval),
    rule(A::SendBack, AdminDept, S::PendingAdminInspection, S::ReturnedByAdmin),
    rule(A::Approve, FinalApprover, S::PendingFinalApproval, S::PendingKeyHandover),
    rule(A::SendBack, FinalApprover, S::PendingFinalApproval, S::ReturnedByFinalApprover),
    rule(A::Resubmit, VehicleUser, S::ReturnedByLevel1, S::PendingLevel1Approval),
    rule(A::Resubmit, VehicleUser, S::ReturnedByAdmin, S::PendingAdminInspection),
    rule(A::Resubmit, VehicleUser, S::ReturnedByFinalApprover, S::PendingFinalApproval),
    rule(A::HandOverKey, Admin, S::PendingKeyHandover, S::PendingVehiclePickup),
    rule(A::HandOverKey, AdminDept, S::PendingKeyHandover, S::PendingVehiclePickup),
    rule(A::PickUpVehicle, VehicleUser, S::PendingVehiclePickup, S::InTransit),
    rule(A::ReturnVehicle, VehicleUser, S::InTransit, S::PendingReturnInspection),
    rule(A::AcceptReturn, Admin, S::PendingReturnInspection, S::Completed),
    rule(A::AcceptReturn, AdminDept, S::PendingReturnInspection, S::Completed),
    rule(A::RejectReturn, Admin, S::PendingReturnInspection, S::ReturnFailed),
    rule(A::RejectReturn, AdminDept, S::PendingReturnInspection, S::ReturnFailed),
    rule(A::ResubmitReturn, VehicleUser, S::ReturnFailed, S::PendingReturnInspection),
];

/// Why the registry refused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The role never performs the action, or not for this request's approval scope.
    Unauthorized,
    /// The role performs the action, but not from the current status.
    InvalidSource,
}

/// Closed status vocabulary plus the permitted transition table.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusRegistry;

impl StatusRegistry {
    pub fn rules(&self) -> &'static [TransitionRule] {
        RULES
    }

    pub fn display_name(&self, code: &str) -> Option<&'static str> {
        BookingStatus::from_code(code).map(BookingStatus::display_name)
    }

    /// Resolves the target status for `action` performed by `role` on a request at `from`.
    pub fn resolve(
        &self,
        action: LifecycleAction,
        role: ActorRole,
        scope: ApprovalScope,
        from: BookingStatus,
    ) -> Result<BookingStatus, TransitionRejection> {
        if !role.acts_on(scope) {
            return Err(TransitionRejection::Unauthorized);
        }

        if action == LifecycleAction::Cancel {
            return if self.can_cancel(role, from) {
                Ok(BookingStatus::Canceled)
            } else {
                Err(TransitionRejection::InvalidSource)
            };
        }

        if from.is_terminal() {
            return Err(TransitionRejection::InvalidSource);
        }

        let mut performs_action = false;
        for rule in RULES {
            if rule.action != action || rule.role != role {
                continue;
            }
            performs_action = true;
            if rule.from == from {
                return Ok(rule.to);
            }
        }

        if performs_action {
            Err(TransitionRejection::InvalidSource)
        } else {
            Err(TransitionRejection::Unauthorized)
        }
    }

    /// Whether `role` may cancel a request currently at `status`.
    pub fn can_cancel(&self, role: ActorRole, status: BookingStatus) -> bool {
        if status.is_terminal() {
            return false;
        }

        match role {
            ActorRole::VehicleUser => status.is_pre_trip(),
            ActorRole::Level1Approver => matches!(
                status,
                BookingStatus::PendingLevel1Approval | BookingStatus::ReturnedByLevel1
            ),
            ActorRole::FinalApprover => matches!(
                status,
                BookingStatus::PendingFinalApproval | BookingStatus::ReturnedByFinalApprover
            ),
            ActorRole::Admin | ActorRole::AdminDept => true,
        }
    }
}
