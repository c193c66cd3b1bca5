use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflows::notifications::{NotificationSource, NotifyType};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DriverUid(pub String);

impl DriverUid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Small-integer driver status stored as `ref_driver_status_code`.
///
/// Codes outside the named constants exist in stored data and are kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverStatusCode(pub u8);

impl DriverStatusCode {
    pub const NORMAL: DriverStatusCode = DriverStatusCode(1);
    pub const ON_LEAVE: DriverStatusCode = DriverStatusCode(2);
    pub const REPLACEMENT: DriverStatusCode = DriverStatusCode(6);
    pub const PROMOTED_REPLACEMENT: DriverStatusCode = DriverStatusCode(7);

    /// Codes under which a driver may still be active.
    pub const fn permits_activity(self) -> bool {
        matches!(self.0, 1 | 6 | 7)
    }

    pub const fn label(self) -> &'static str {
        match self.0 {
            1 => "normal",
            2 => "on-leave",
            6 => "replacement",
            7 => "promoted-replacement",
            _ => "other",
        }
    }
}

impl fmt::Display for DriverStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Driver master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_uid: DriverUid,
    pub emp_id: String,
    pub name: String,
    #[serde(with = "flag")]
    pub is_active: bool,
    pub ref_driver_status_code: DriverStatusCode,
    #[serde(with = "flag")]
    pub is_replacement: bool,
    pub approved_job_driver_start_date: NaiveDateTime,
    pub approved_job_driver_end_date: NaiveDateTime,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Driver {
    pub fn eligibility(&self) -> Eligibility {
        Eligibility {
            is_active: self.is_active,
            status_code: self.ref_driver_status_code,
        }
    }
}

/// One-to-one with [`Driver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverLicense {
    pub driver_uid: DriverUid,
    pub license_no: String,
    pub end_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverLeave {
    pub leave_id: String,
    pub driver_uid: DriverUid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub replacement_driver_uid: Option<DriverUid>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl DriverLeave {
    /// Inclusive on both ends.
    pub fn covers(&self, now: NaiveDateTime) -> bool {
        !self.is_deleted && self.start_date <= now && now <= self.end_date
    }

    pub fn replacement(&self) -> Option<&DriverUid> {
        self.replacement_driver_uid
            .as_ref()
            .filter(|uid| !uid.0.trim().is_empty())
    }
}

/// The persisted pair the engine derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    #[serde(with = "flag")]
    pub is_active: bool,
    pub status_code: DriverStatusCode,
}

/// Fields written back to a driver record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverEligibilityUpdate {
    pub is_active: bool,
    pub status_code: DriverStatusCode,
    /// `None` leaves the stored flag untouched.
    pub is_replacement: Option<bool>,
}

impl DriverEligibilityUpdate {
    /// Whether applying the update to `driver` would change anything.
    pub fn differs_from(&self, driver: &Driver) -> bool {
        driver.is_active != self.is_active
            || driver.ref_driver_status_code != self.status_code
            || self
                .is_replacement
                .map(|flag| flag != driver.is_replacement)
                .unwrap_or(false)
    }
}

/// Annual driving-permit request, the second notification source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualLicenseRequest {
    pub request_id: String,
    pub request_no: String,
    pub driver_uid: DriverUid,
    pub status_code: String,
    pub created_by: String,
    pub confirmer: Option<String>,
    pub approver: Option<String>,
}

impl AnnualLicenseRequest {
    pub fn notification_source(&self) -> NotificationSource {
        NotificationSource {
            source_id: self.request_id.clone(),
            request_no: self.request_no.clone(),
            status_code: self.status_code.clone(),
            notify_type: NotifyType::RequestAnnualDriver,
            creator: Some(self.created_by.clone()),
            driver: None,
            confirmer: self.confirmer.clone(),
            approver: self.approver.clone(),
        }
    }
}

/// Boolean flags stored as `"0"` / `"1"` strings.
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "1" } else { "0" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            "1" => Ok(true),
            "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected \"0\" or \"1\", got \"{other}\""
            ))),
        }
    }
}
