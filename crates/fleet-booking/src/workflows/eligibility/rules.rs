use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{
    Driver, DriverEligibilityUpdate, DriverLeave, DriverLicense, DriverStatusCode, DriverUid,
    Eligibility,
};

/// Condition that forced a driver inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InactiveReason {
    StatusCodeNotEligible { status_code: DriverStatusCode },
    ContractNotStarted,
    LicenseExpired,
    OnLeave { leave_id: String },
}

/// Write the leave-holder's evaluation requires on the replacement driver's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementPromotion {
    pub driver_uid: DriverUid,
    pub covering_for: DriverUid,
    pub leave_id: String,
}

impl ReplacementPromotion {
    pub fn update(&self) -> DriverEligibilityUpdate {
        DriverEligibilityUpdate {
            is_active: true,
            status_code: DriverStatusCode::PROMOTED_REPLACEMENT,
            is_replacement: Some(false),
        }
    }
}

/// Outcome of evaluating one driver; applying it is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityResult {
    pub driver_uid: DriverUid,
    pub verdict: Eligibility,
    pub reasons: Vec<InactiveReason>,
    /// The contract end date has passed. Reported only; it does not change the verdict.
    pub contract_expired: bool,
    pub replacement_promotion: Option<ReplacementPromotion>,
}

impl EligibilityResult {
    pub fn self_update(&self) -> DriverEligibilityUpdate {
        DriverEligibilityUpdate {
            is_active: self.verdict.is_active,
            status_code: self.verdict.status_code,
            is_replacement: None,
        }
    }
}

/// Derives `(is_active, status_code)` for `driver` at `now`.
///
/// Every condition is evaluated even after one has already forced the driver inactive, so the
/// result lists all reasons that applied.
pub fn evaluate(
    driver: &Driver,
    license: &DriverLicense,
    leave: Option<&DriverLeave>,
    now: NaiveDateTime,
) -> EligibilityResult {
    let mut is_active = true;
    let mut status_code = DriverStatusCode::NORMAL;
    let mut reasons = Vec::new();
    let mut replacement_promotion = None;

    if driver.is_replacement {
        status_code = DriverStatusCode::REPLACEMENT;
    }

    if !driver.ref_driver_status_code.permits_activity() {
        is_active = false;
        reasons.push(InactiveReason::StatusCodeNotEligible {
            status_code: driver.ref_driver_status_code,
        });
    }

    if now < driver.approved_job_driver_start_date {
        is_active = false;
        reasons.push(InactiveReason::ContractNotStarted);
    }

    // Reported only. A passed end date never deactivates the driver.
    let contract_expired = driver.approved_job_driver_end_date < now;

    if license.end_date < now {
        is_active = false;
        reasons.push(InactiveReason::LicenseExpired);
    }

    let current_leave =
        leave.filter(|leave| leave.driver_uid == driver.driver_uid && leave.covers(now));
    if let Some(leave) = current_leave {
        if let Some(replacement) = leave.replacement() {
            is_active = false;
            status_code = DriverStatusCode::ON_LEAVE;
            reasons.push(InactiveReason::OnLeave {
                leave_id: leave.leave_id.clone(),
            });
            replacement_promotion = Some(ReplacementPromotion {
                driver_uid: replacement.clone(),
                covering_for: driver.driver_uid.clone(),
                leave_id: leave.leave_id.clone(),
            });
        }
    }

    EligibilityResult {
        driver_uid: driver.driver_uid.clone(),
        verdict: Eligibility {
            is_active,
            status_code,
        },
        reasons,
        contract_expired,
        replacement_promotion,
    }
}
