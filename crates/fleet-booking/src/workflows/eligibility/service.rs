use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::domain::{Driver, DriverEligibilityUpdate, DriverLeave, DriverLicense, DriverUid};
use super::repository::DriverRepository;
use super::rules::{evaluate, EligibilityResult, ReplacementPromotion};
use crate::clock::Clock;
use crate::store::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum EligibilityError {
    #[error("malformed driver id: value is empty")]
    InvalidIdentifier,
    #[error("failed to load driver data: {0}")]
    Lookup(#[source] RepositoryError),
    #[error("failed to persist eligibility for driver {driver_uid}: {source}")]
    Write {
        driver_uid: DriverUid,
        #[source]
        source: RepositoryError,
    },
}

/// Why a recomputation stopped without writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    DriverNotFound,
    LicenseNotFound,
    LookupFailed { error: String },
}

/// Applied evaluation of one driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeReport {
    pub result: EligibilityResult,
    /// Set when this driver is the replacement on someone else's current leave.
    pub covering: Option<ReplacementPromotion>,
    /// Drivers whose record was actually written, this driver first.
    pub written: Vec<DriverUid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecomputeOutcome {
    Applied(RecomputeReport),
    Skipped {
        driver_uid: DriverUid,
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDriver {
    pub driver_uid: DriverUid,
    pub error: String,
}

/// Totals for one pass over every driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub evaluated: usize,
    pub updated: Vec<DriverUid>,
    pub skipped: Vec<DriverUid>,
    pub promotions: usize,
    pub failed: Vec<FailedDriver>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Loaded {
    Ready {
        driver: Driver,
        license: DriverLicense,
        leaves: Vec<DriverLeave>,
    },
    Missing(SkipReason),
}

/// Derives each driver's `(is_active, status_code)` from contract, license, and leave data.
pub struct DriverEligibilityEngine<D> {
    drivers: Arc<D>,
    clock: Arc<dyn Clock>,
}

impl<D> DriverEligibilityEngine<D>
where
    D: DriverRepository,
{
    pub fn new(drivers: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self { drivers, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Recomputes one driver and applies any replacement promotion its leave requires.
    ///
    /// Missing records and failed lookups end in [`RecomputeOutcome::Skipped`]; only a failed
    /// write is returned as an error. Nothing is written when the stored values already match.
    pub fn recompute(&self, uid: &DriverUid) -> Result<RecomputeOutcome, EligibilityError> {
        if uid.as_str().trim().is_empty() {
            return Err(EligibilityError::InvalidIdentifier);
        }
        let now = self.clock.now();

        let (driver, license, leaves) = match self.load_one(uid, now) {
            Ok(Loaded::Ready {
                driver,
                license,
                leaves,
            }) => (driver, license, leaves),
            Ok(Loaded::Missing(reason)) => {
                warn!(driver_uid = %uid, ?reason, "eligibility recompute skipped");
                return Ok(RecomputeOutcome::Skipped {
                    driver_uid: uid.clone(),
                    reason,
                });
            }
            Err(err) => {
                warn!(driver_uid = %uid, error = %err, "eligibility lookup failed");
                return Ok(RecomputeOutcome::Skipped {
                    driver_uid: uid.clone(),
                    reason: SkipReason::LookupFailed {
                        error: err.to_string(),
                    },
                });
            }
        };

        let own_leave = leaves.iter().find(|leave| leave.driver_uid == *uid);
        let result = evaluate(&driver, &license, own_leave, now);
        log_result(&result);

        let covering = self.covering_leave(&leaves, uid);
        let own_update = covering
            .as_ref()
            .map(ReplacementPromotion::update)
            .unwrap_or_else(|| result.self_update());

        let mut written = Vec::new();
        if self.apply(&driver, own_update)? {
            written.push(driver.driver_uid.clone());
        }

        if let Some(promotion) = &result.replacement_promotion {
            match self.drivers.fetch_driver(&promotion.driver_uid) {
                Ok(Some(replacement)) if !replacement.is_deleted => {
                    if self.apply(&replacement, promotion.update())? {
                        info!(
                            driver_uid = %promotion.driver_uid,
                            covering_for = %promotion.covering_for,
                            leave_id = %promotion.leave_id,
                            "replacement driver promoted"
                        );
                        written.push(promotion.driver_uid.clone());
                    }
                }
                Ok(_) => {
                    warn!(
                        driver_uid = %promotion.driver_uid,
                        leave_id = %promotion.leave_id,
                        "replacement driver not found; promotion skipped"
                    );
                }
                Err(err) => {
                    warn!(
                        driver_uid = %promotion.driver_uid,
                        error = %err,
                        "replacement driver lookup failed; promotion skipped"
                    );
                }
            }
        }

        Ok(RecomputeOutcome::Applied(RecomputeReport {
            result,
            covering,
            written,
        }))
    }

    /// Evaluates every non-deleted driver from bulk-loaded data and persists only the deltas.
    ///
    /// Replacement promotions are merged after the self-updates, so a replacement driver ends
    /// at the promoted values whatever order the drivers are visited in. A failed write is
    /// recorded and the batch moves on.
    pub fn recompute_all(&self) -> Result<BatchSummary, EligibilityError> {
        let now = self.clock.now();
        let drivers = self.drivers.drivers().map_err(EligibilityError::Lookup)?;
        let licenses: HashMap<DriverUid, _> = self
            .drivers
            .licenses()
            .map_err(EligibilityError::Lookup)?
            .into_iter()
            .map(|license| (license.driver_uid.clone(), license))
            .collect();
        let leaves = self
            .drivers
            .current_leaves(now)
            .map_err(EligibilityError::Lookup)?;

        let by_uid: BTreeMap<&DriverUid, &Driver> = drivers
            .iter()
            .map(|driver| (&driver.driver_uid, driver))
            .collect();

        let mut summary = BatchSummary::default();
        let mut planned: BTreeMap<DriverUid, DriverEligibilityUpdate> = BTreeMap::new();
        let mut promotions = Vec::new();

        for driver in &drivers {
            let Some(license) = licenses.get(&driver.driver_uid) else {
                warn!(driver_uid = %driver.driver_uid, "driver has no license record; skipped");
                summary.skipped.push(driver.driver_uid.clone());
                continue;
            };
            let own_leave = leaves
                .iter()
                .find(|leave| leave.driver_uid == driver.driver_uid);
            let result = evaluate(driver, license, own_leave, now);
            log_result(&result);
            summary.evaluated += 1;

            planned.insert(driver.driver_uid.clone(), result.self_update());
            if let Some(promotion) = result.replacement_promotion {
                promotions.push(promotion);
            }
        }

        for promotion in promotions {
            if !by_uid.contains_key(&promotion.driver_uid) {
                warn!(
                    driver_uid = %promotion.driver_uid,
                    leave_id = %promotion.leave_id,
                    "replacement driver not found; promotion skipped"
                );
                continue;
            }
            summary.promotions += 1;
            planned.insert(promotion.driver_uid.clone(), promotion.update());
        }

        for (uid, update) in planned {
            let Some(driver) = by_uid.get(&uid) else {
                continue;
            };
            match self.apply(driver, update) {
                Ok(true) => summary.updated.push(uid),
                Ok(false) => {}
                Err(err) => {
                    error!(driver_uid = %uid, error = %err, "eligibility write failed");
                    summary.failed.push(FailedDriver {
                        driver_uid: uid,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            evaluated = summary.evaluated,
            updated = summary.updated.len(),
            skipped = summary.skipped.len(),
            promotions = summary.promotions,
            failed = summary.failed.len(),
            "driver eligibility batch finished"
        );

        Ok(summary)
    }

    fn load_one(&self, uid: &DriverUid, now: NaiveDateTime) -> Result<Loaded, RepositoryError> {
        let driver = match self.drivers.fetch_driver(uid)? {
            Some(driver) if !driver.is_deleted => driver,
            _ => return Ok(Loaded::Missing(SkipReason::DriverNotFound)),
        };
        let Some(license) = self.drivers.fetch_license(uid)? else {
            return Ok(Loaded::Missing(SkipReason::LicenseNotFound));
        };
        let leaves = self.drivers.current_leaves(now)?;
        Ok(Loaded::Ready {
            driver,
            license,
            leaves,
        })
    }

    /// Leave on which `uid` is the designated replacement, as a promotion of `uid`.
    ///
    /// Only a leave that [`recompute_all`](Self::recompute_all) would also act on counts: the
    /// holder must be a live, licensed driver and the leave must be the holder's first current
    /// one.
    fn covering_leave(
        &self,
        leaves: &[DriverLeave],
        uid: &DriverUid,
    ) -> Option<ReplacementPromotion> {
        leaves
            .iter()
            .filter(|leave| leave.replacement() == Some(uid))
            .filter(|leave| {
                leaves.iter().find(|held| held.driver_uid == leave.driver_uid) == Some(*leave)
            })
            .find(|leave| self.is_evaluated(&leave.driver_uid))
            .map(|leave| ReplacementPromotion {
                driver_uid: uid.clone(),
                covering_for: leave.driver_uid.clone(),
                leave_id: leave.leave_id.clone(),
            })
    }

    /// Whether the batch would evaluate `uid`: present, not deleted, and licensed.
    fn is_evaluated(&self, uid: &DriverUid) -> bool {
        let lookup = self.drivers.fetch_driver(uid).and_then(|driver| match driver {
            Some(driver) if !driver.is_deleted => {
                Ok(self.drivers.fetch_license(uid)?.is_some())
            }
            _ => Ok(false),
        });
        lookup.unwrap_or_else(|err| {
            warn!(driver_uid = %uid, error = %err, "leave holder lookup failed");
            false
        })
    }

    /// Writes `update` when it changes the stored record. Returns whether a write happened.
    fn apply(
        &self,
        driver: &Driver,
        update: DriverEligibilityUpdate,
    ) -> Result<bool, EligibilityError> {
        if !update.differs_from(driver) {
            return Ok(false);
        }
        self.drivers
            .update_eligibility(&driver.driver_uid, update)
            .map_err(|source| EligibilityError::Write {
                driver_uid: driver.driver_uid.clone(),
                source,
            })?;
        debug!(
            driver_uid = %driver.driver_uid,
            is_active = update.is_active,
            status_code = %update.status_code,
            "driver eligibility updated"
        );
        Ok(true)
    }
}


fn log_result(result: &EligibilityResult) {
    if result.contract_expired {
        warn!(
            driver_uid = %result.driver_uid,
            "contract end date has passed; driver left active"
        );
    }
    debug!(
        driver_uid = %result.driver_uid,
        is_active = result.verdict.is_active,
        status_code = %result.verdict.status_code,
        reasons = ?result.reasons,
        "driver evaluated"
    );
}
