use chrono::{Duration, NaiveDate, NaiveDateTime};
use fleet_booking::error::AppError;
use fleet_booking::store::InMemoryFleetStore;
use fleet_booking::workflows::booking::RequestLifecycle;
use fleet_booking::workflows::eligibility::{
    Driver, DriverEligibilityEngine, DriverLeave, DriverLicense, DriverStatusCode, DriverUid,
};
use fleet_booking::workflows::notifications::{
    NotificationDispatcher, NotificationTemplate, NotifyRole, NotifyType, TemplateId,
    TemplateImporter,
};
use fleet_booking::Clock;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type StoreDispatcher =
    NotificationDispatcher<InMemoryFleetStore, InMemoryFleetStore, InMemoryFleetStore>;
pub(crate) type StoreLifecycle =
    RequestLifecycle<InMemoryFleetStore, InMemoryFleetStore, StoreDispatcher>;
pub(crate) type StoreEngine = DriverEligibilityEngine<InMemoryFleetStore>;

/// Every workflow wired to one shared in-memory store.
pub(crate) struct FleetServices {
    pub(crate) store: Arc<InMemoryFleetStore>,
    pub(crate) dispatcher: Arc<StoreDispatcher>,
    pub(crate) lifecycle: StoreLifecycle,
    pub(crate) engine: Arc<StoreEngine>,
}

impl FleetServices {
    /// Seeds notification templates from `templates_csv`, or the built-in set when absent.
    pub(crate) fn build(
        clock: Arc<dyn Clock>,
        templates_csv: Option<&Path>,
    ) -> Result<Self, AppError> {
        let store = Arc::new(InMemoryFleetStore::default());
        let templates = match templates_csv {
            Some(path) => {
                let templates = TemplateImporter::from_path(path)?;
                info!(
                    path = %path.display(),
                    count = templates.len(),
                    "notification templates imported"
                );
                templates
            }
            None => default_templates(),
        };
        store.seed_templates(templates);

        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            store.clone(),
            store.clone(),
            clock.clone(),
        ));
        let lifecycle = RequestLifecycle::new(
            store.clone(),
            store.clone(),
            dispatcher.clone(),
            clock.clone(),
        );
        let engine = Arc::new(DriverEligibilityEngine::new(store.clone(), clock));

        Ok(Self {
            store,
            dispatcher,
            lifecycle,
            engine,
        })
    }

    /// Seeds the driver export at `path` into the shared store. Returns the driver count.
    pub(crate) fn load_drivers(&self, path: &Path) -> Result<usize, AppError> {
        let fixtures = DriverFixtures::from_path(path)?;
        let count = fixtures.drivers.len();
        fixtures.seed(&self.store);
        info!(path = %path.display(), count, "driver export loaded");
        Ok(count)
    }
}

fn template(
    id: &str,
    status_code: &str,
    notify_type: NotifyType,
    notify_role: NotifyRole,
    title: &str,
    message: &str,
) -> NotificationTemplate {
    NotificationTemplate {
        id: TemplateId(id.to_string()),
        status_code: status_code.to_string(),
        notify_type,
        notify_role,
        title: title.to_string(),
        message: message.to_string(),
        is_deleted: false,
    }
}

/// Reference templates used when no export is configured.
pub(crate) fn default_templates() -> Vec<NotificationTemplate> {
    use NotifyRole::{Driver, FinalApproval, Level1Approval, VehicleUser};
    use NotifyType::{RequestAnnualDriver, RequestBooking};

    vec![
        template(
            "BK-20-L1",
            "20",
            RequestBooking,
            Level1Approval,
            "คำขอใช้ยานพาหนะรออนุมัติ",
            "คำขอ **request_no** รอการอนุมัติจากท่าน",
        ),
        template(
            "BK-21-VU",
            "21",
            RequestBooking,
            VehicleUser,
            "คำขอถูกตีกลับ",
            "คำขอ **request_no** ถูกตีกลับโดยผู้อนุมัติต้นสังกัด",
        ),
        template(
            "BK-30-VU",
            "30",
            RequestBooking,
            VehicleUser,
            "ผ่านการอนุมัติต้นสังกัด",
            "คำขอ **request_no** รอผู้ดูแลยานพาหนะตรวจสอบ",
        ),
        template(
            "BK-40-FA",
            "40",
            RequestBooking,
            FinalApproval,
            "คำขอรออนุมัติ",
            "คำขอ **request_no** รอการอนุมัติขั้นสุดท้ายจากท่าน",
        ),
        template(
            "BK-50-VU",
            "50",
            RequestBooking,
            VehicleUser,
            "คำขอได้รับการอนุมัติ",
            "คำขอ **request_no** อนุมัติแล้ว กรุณารับกุญแจ",
        ),
        template(
            "BK-50-DR",
            "50",
            RequestBooking,
            Driver,
            "มีงานขับรถใหม่",
            "ท่านได้รับมอบหมายงานตามคำขอ **request_no**",
        ),
        template(
            "BK-71-VU",
            "71",
            RequestBooking,
            VehicleUser,
            "คืนยานพาหนะไม่สำเร็จ",
            "การคืนยานพาหนะตามคำขอ **request_no** ไม่ผ่านการตรวจสอบ",
        ),
        template(
            "BK-80-VU",
            "80",
            RequestBooking,
            VehicleUser,
            "เสร็จสิ้น",
            "คำขอ **request_no** เสร็จสิ้นแล้ว",
        ),
        template(
            "BK-90-VU",
            "90",
            RequestBooking,
            VehicleUser,
            "ยกเลิกคำขอ",
            "คำขอ **request_no** ถูกยกเลิก",
        ),
        template(
            "BK-90-DR",
            "90",
            RequestBooking,
            Driver,
            "ยกเลิกงานขับรถ",
            "งานตามคำขอ **request_no** ถูกยกเลิก",
        ),
        template(
            "AD-20-L1",
            "20",
            RequestAnnualDriver,
            Level1Approval,
            "คำขออนุญาตขับขี่รออนุมัติ",
            "คำขอ **request_no** รอการอนุมัติจากท่าน",
        ),
        template(
            "AD-40-VU",
            "40",
            RequestAnnualDriver,
            VehicleUser,
            "คำขออนุญาตขับขี่",
            "คำขอ **request_no** รอการอนุมัติขั้นสุดท้าย",
        ),
    ]
}

/// Driver, license, and leave rows loaded into the store before a batch.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DriverFixtures {
    pub(crate) drivers: Vec<Driver>,
    pub(crate) licenses: Vec<DriverLicense>,
    #[serde(default)]
    pub(crate) leaves: Vec<DriverLeave>,
}

impl DriverFixtures {
    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| {
            AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
        })
    }

    pub(crate) fn seed(self, store: &InMemoryFleetStore) {
        for license in self.licenses {
            store.seed_license(license);
        }
        for leave in self.leaves {
            store.seed_leave(leave);
        }
        for driver in self.drivers {
            store.seed_driver(driver);
        }
    }

    /// Four drivers around `now`: one on leave with a replacement waiting, one whose license
    /// lapsed yesterday, and one whose contract has not started.
    pub(crate) fn sample(now: NaiveDateTime) -> Self {
        let driver = |uid: &str, name: &str, code: DriverStatusCode, is_replacement: bool| Driver {
            driver_uid: DriverUid(uid.to_string()),
            emp_id: format!("D{}", &uid[4..]),
            name: name.to_string(),
            is_active: !is_replacement,
            ref_driver_status_code: code,
            is_replacement,
            approved_job_driver_start_date: now - Duration::days(200),
            approved_job_driver_end_date: now + Duration::days(165),
            is_deleted: false,
        };
        let license = |uid: &str, end_offset_days: i64| DriverLicense {
            driver_uid: DriverUid(uid.to_string()),
            license_no: format!("LIC-{uid}"),
            end_date: now + Duration::days(end_offset_days),
        };

        let mut not_started = driver("DRV-7004", "Kittipong", DriverStatusCode::NORMAL, false);
        not_started.approved_job_driver_start_date = now + Duration::days(7);

        Self {
            drivers: vec![
                driver("DRV-7001", "Somchai", DriverStatusCode::NORMAL, false),
                driver("DRV-7002", "Preecha", DriverStatusCode::REPLACEMENT, true),
                driver("DRV-7003", "Wichai", DriverStatusCode::NORMAL, false),
                not_started,
            ],
            licenses: vec![
                license("DRV-7001", 400),
                license("DRV-7002", 400),
                license("DRV-7003", -1),
                license("DRV-7004", 400),
            ],
            leaves: vec![DriverLeave {
                leave_id: "LV-0001".to_string(),
                driver_uid: DriverUid("DRV-7001".to_string()),
                start_date: now - Duration::days(1),
                end_date: now + Duration::days(2),
                replacement_driver_uid: Some(DriverUid("DRV-7002".to_string())),
                is_deleted: false,
            }],
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
