use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;

use super::RepositoryError;
use crate::workflows::booking::{
    AuditLogRepository, BookingRepository, BookingRequest, BookingStatus, LogEntry, RequestId,
};
use crate::workflows::eligibility::{
    AnnualLicenseRequest, Driver, DriverEligibilityUpdate, DriverLeave, DriverLicense,
    DriverRepository, DriverUid,
};
use crate::workflows::notifications::{
    NewNotification, Notification, NotificationId, NotificationRepository, NotificationSource,
    NotificationSourceRepository, NotificationTemplate, NotificationTemplateRepository,
    NotifyType,
};

#[derive(Default)]
struct Tables {
    bookings: HashMap<RequestId, BookingRequest>,
    log: Vec<LogEntry>,
    drivers: BTreeMap<DriverUid, Driver>,
    licenses: HashMap<DriverUid, DriverLicense>,
    leaves: Vec<DriverLeave>,
    annual_requests: HashMap<String, AnnualLicenseRequest>,
    templates: Vec<NotificationTemplate>,
    notifications: Vec<Notification>,
    notification_seq: u64,
    driver_writes: usize,
}

impl Tables {
    /// Next `ntf-NNNNNN` id not already held by a stored row.
    fn next_notification_id(&mut self) -> NotificationId {
        loop {
            self.notification_seq += 1;
            let id = NotificationId(format!("ntf-{:06}", self.notification_seq));
            if !self.notifications.iter().any(|existing| existing.id == id) {
                return id;
            }
        }
    }
}

/// Process-local implementation of every repository trait, sharing one lock.
///
/// Clones share the same tables.
#[derive(Default, Clone)]
pub struct InMemoryFleetStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryFleetStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("fleet store mutex poisoned")
    }

    pub fn seed_driver(&self, driver: Driver) {
        self.lock()
            .drivers
            .insert(driver.driver_uid.clone(), driver);
    }

    pub fn seed_license(&self, license: DriverLicense) {
        self.lock()
            .licenses
            .insert(license.driver_uid.clone(), license);
    }

    pub fn seed_leave(&self, leave: DriverLeave) {
        self.lock().leaves.push(leave);
    }

    pub fn seed_annual_request(&self, request: AnnualLicenseRequest) {
        self.lock()
            .annual_requests
            .insert(request.request_id.clone(), request);
    }

    pub fn seed_templates(&self, templates: impl IntoIterator<Item = NotificationTemplate>) {
        self.lock().templates.extend(templates);
    }

    /// Loads rows persisted by an earlier run.
    pub fn seed_notifications(&self, notifications: impl IntoIterator<Item = Notification>) {
        self.lock().notifications.extend(notifications);
    }

    pub fn driver(&self, uid: &DriverUid) -> Option<Driver> {
        self.lock().drivers.get(uid).cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Number of eligibility writes applied since the store was created.
    pub fn driver_writes(&self) -> usize {
        self.lock().driver_writes
    }
}

impl BookingRepository for InMemoryFleetStore {
    fn insert(&self, request: BookingRequest) -> Result<BookingRequest, RepositoryError> {
        let mut tables = self.lock();
        if tables.bookings.contains_key(&request.request_id) {
            return Err(RepositoryError::Conflict);
        }
        tables
            .bookings
            .insert(request.request_id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<BookingRequest>, RepositoryError> {
        Ok(self.lock().bookings.get(id).cloned())
    }

    fn update_if_status(
        &self,
        expected: BookingStatus,
        request: BookingRequest,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let stored = tables
            .bookings
            .get_mut(&request.request_id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::StaleWrite);
        }
        *stored = request;
        Ok(())
    }
}

impl AuditLogRepository for InMemoryFleetStore {
    fn append(&self, entry: LogEntry) -> Result<(), RepositoryError> {
        self.lock().log.push(entry);
        Ok(())
    }

    fn entries_for(&self, request_id: &RequestId) -> Result<Vec<LogEntry>, RepositoryError> {
        Ok(self
            .lock()
            .log
            .iter()
            .filter(|entry| entry.request_id == *request_id)
            .cloned()
            .collect())
    }

    fn latest_with_status(
        &self,
        request_id: &RequestId,
        status: BookingStatus,
    ) -> Result<Option<LogEntry>, RepositoryError> {
        Ok(self
            .lock()
            .log
            .iter()
            .rev()
            .find(|entry| entry.request_id == *request_id && entry.status == status)
            .cloned())
    }
}

impl DriverRepository for InMemoryFleetStore {
    fn fetch_driver(&self, uid: &DriverUid) -> Result<Option<Driver>, RepositoryError> {
        Ok(self.lock().drivers.get(uid).cloned())
    }

    fn fetch_license(&self, uid: &DriverUid) -> Result<Option<DriverLicense>, RepositoryError> {
        Ok(self.lock().licenses.get(uid).cloned())
    }

    fn drivers(&self) -> Result<Vec<Driver>, RepositoryError> {
        Ok(self
            .lock()
            .drivers
            .values()
            .filter(|driver| !driver.is_deleted)
            .cloned()
            .collect())
    }

    fn licenses(&self) -> Result<Vec<DriverLicense>, RepositoryError> {
        Ok(self.lock().licenses.values().cloned().collect())
    }

    fn current_leaves(&self, now: NaiveDateTime) -> Result<Vec<DriverLeave>, RepositoryError> {
        let mut leaves: Vec<DriverLeave> = self
            .lock()
            .leaves
            .iter()
            .filter(|leave| leave.covers(now))
            .cloned()
            .collect();
        leaves.sort_by_key(|leave| leave.start_date);
        Ok(leaves)
    }

    fn update_eligibility(
        &self,
        uid: &DriverUid,
        update: DriverEligibilityUpdate,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let driver = tables
            .drivers
            .get_mut(uid)
            .ok_or(RepositoryError::NotFound)?;
        driver.is_active = update.is_active;
        driver.ref_driver_status_code = update.status_code;
        if let Some(flag) = update.is_replacement {
            driver.is_replacement = flag;
        }
        tables.driver_writes += 1;
        Ok(())
    }
}

impl NotificationTemplateRepository for InMemoryFleetStore {
    fn templates_for(
        &self,
        status_code: &str,
        notify_type: NotifyType,
    ) -> Result<Vec<NotificationTemplate>, RepositoryError> {
        Ok(self
            .lock()
            .templates
            .iter()
            .filter(|template| {
                !template.is_deleted
                    && template.status_code == status_code
                    && template.notify_type == notify_type
            })
            .cloned()
            .collect())
    }
}

impl NotificationRepository for InMemoryFleetStore {
    fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError> {
        let mut tables = self.lock();
        let id = tables.next_notification_id();
        let stored = notification.into_notification(id);
        tables.notifications.push(stored.clone());
        Ok(stored)
    }

    fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let notification = tables
            .notifications
            .iter_mut()
            .find(|notification| notification.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        if notification.is_read {
            return Ok(false);
        }
        notification.is_read = true;
        Ok(true)
    }

    fn unread_for(&self, emp_id: &str) -> Result<Vec<Notification>, RepositoryError> {
        Ok(self
            .lock()
            .notifications
            .iter()
            .filter(|notification| !notification.is_read && notification.recipient_emp_id == emp_id)
            .cloned()
            .collect())
    }
}

impl NotificationSourceRepository for InMemoryFleetStore {
    fn fetch_source(
        &self,
        source_id: &str,
        notify_type: NotifyType,
    ) -> Result<Option<NotificationSource>, RepositoryError> {
        let tables = self.lock();
        let source = match notify_type {
            NotifyType::RequestBooking => tables
                .bookings
                .get(&RequestId(source_id.to_string()))
                .map(BookingRequest::notification_source),
            NotifyType::RequestAnnualDriver => tables
                .annual_requests
                .get(source_id)
                .map(AnnualLicenseRequest::notification_source),
        };
        Ok(source)
    }
}
