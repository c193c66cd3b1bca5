use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::clock::FixedClock;
use crate::store::{InMemoryFleetStore, RepositoryError};
use crate::workflows::eligibility::domain::{
    Driver, DriverEligibilityUpdate, DriverLeave, DriverLicense, DriverStatusCode, DriverUid,
};
use crate::workflows::eligibility::repository::DriverRepository;
use crate::workflows::eligibility::DriverEligibilityEngine;

pub(super) fn today() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 7, 15)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid instant")
}

pub(super) fn uid(raw: &str) -> DriverUid {
    DriverUid(raw.to_string())
}

/// Active driver in contract with a valid license and no leave.
pub(super) fn driver(raw: &str) -> Driver {
    Driver {
        driver_uid: uid(raw),
        emp_id: format!("E-{raw}"),
        name: format!("Driver {raw}"),
        is_active: true,
        ref_driver_status_code: DriverStatusCode::NORMAL,
        is_replacement: false,
        approved_job_driver_start_date: today() - Duration::days(1),
        approved_job_driver_end_date: today() + Duration::days(30),
        is_deleted: false,
    }
}

pub(super) fn license(raw: &str, end_offset_days: i64) -> DriverLicense {
    DriverLicense {
        driver_uid: uid(raw),
        license_no: format!("LIC-{raw}"),
        end_date: today() + Duration::days(end_offset_days),
    }
}

pub(super) fn leave(id: &str, holder: &str, replacement: Option<&str>) -> DriverLeave {
    DriverLeave {
        leave_id: id.to_string(),
        driver_uid: uid(holder),
        start_date: today() - Duration::days(1),
        end_date: today() + Duration::days(2),
        replacement_driver_uid: replacement.map(uid),
        is_deleted: false,
    }
}

/// Seeds `driver` together with a license valid for another 100 days.
pub(super) fn seed(store: &InMemoryFleetStore, driver: Driver) {
    store.seed_license(license(driver.driver_uid.as_str(), 100));
    store.seed_driver(driver);
}

pub(super) fn engine(
    store: &Arc<InMemoryFleetStore>,
) -> (DriverEligibilityEngine<InMemoryFleetStore>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(today() + Duration::hours(6)));
    (
        DriverEligibilityEngine::new(store.clone(), clock.clone()),
        clock,
    )
}

/// Delegates to the store but refuses writes for one driver.
pub(super) struct ReadOnlyDriver {
    pub(super) inner: InMemoryFleetStore,
    pub(super) locked: DriverUid,
}

impl DriverRepository for ReadOnlyDriver {
    fn fetch_driver(&self, uid: &DriverUid) -> Result<Option<Driver>, RepositoryError> {
        self.inner.fetch_driver(uid)
    }

    fn fetch_license(&self, uid: &DriverUid) -> Result<Option<DriverLicense>, RepositoryError> {
        self.inner.fetch_license(uid)
    }

    fn drivers(&self) -> Result<Vec<Driver>, RepositoryError> {
        self.inner.drivers()
    }

    fn licenses(&self) -> Result<Vec<DriverLicense>, RepositoryError> {
        self.inner.licenses()
    }

    fn current_leaves(&self, now: NaiveDateTime) -> Result<Vec<DriverLeave>, RepositoryError> {
        self.inner.current_leaves(now)
    }

    fn update_eligibility(
        &self,
        uid: &DriverUid,
        update: DriverEligibilityUpdate,
    ) -> Result<(), RepositoryError> {
        if *uid == self.locked {
            return Err(RepositoryError::Unavailable("row locked".to_string()));
        }
        self.inner.update_eligibility(uid, update)
    }
}

/// Every read fails.
pub(super) struct OfflineDrivers;

impl DriverRepository for OfflineDrivers {
    fn fetch_driver(&self, _uid: &DriverUid) -> Result<Option<Driver>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_license(&self, _uid: &DriverUid) -> Result<Option<DriverLicense>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn drivers(&self) -> Result<Vec<Driver>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn licenses(&self) -> Result<Vec<DriverLicense>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn current_leaves(&self, _now: NaiveDateTime) -> Result<Vec<DriverLeave>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_eligibility(
        &self,
        _uid: &DriverUid,
        _update: DriverEligibilityUpdate,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
