use chrono::NaiveDateTime;

use super::domain::{Driver, DriverEligibilityUpdate, DriverLeave, DriverLicense, DriverUid};
use crate::store::RepositoryError;

/// Driver master data, licenses, and leave records.
pub trait DriverRepository: Send + Sync {
    fn fetch_driver(&self, uid: &DriverUid) -> Result<Option<Driver>, RepositoryError>;
    fn fetch_license(&self, uid: &DriverUid) -> Result<Option<DriverLicense>, RepositoryError>;
    /// Every non-deleted driver, ordered by uid.
    fn drivers(&self) -> Result<Vec<Driver>, RepositoryError>;
    fn licenses(&self) -> Result<Vec<DriverLicense>, RepositoryError>;
    /// Non-deleted leaves whose window contains `now`, ordered by start date.
    fn current_leaves(&self, now: NaiveDateTime) -> Result<Vec<DriverLeave>, RepositoryError>;

    /// Returns [`RepositoryError::NotFound`] when the driver does not exist.
    fn update_eligibility(
        &self,
        uid: &DriverUid,
        update: DriverEligibilityUpdate,
    ) -> Result<(), RepositoryError>;
}
