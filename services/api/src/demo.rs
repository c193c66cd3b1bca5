use crate::infra::{DriverFixtures, FleetServices};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::Args;
use fleet_booking::error::AppError;
use fleet_booking::store::InMemoryFleetStore;
use fleet_booking::workflows::booking::{
    Actor, ActorRole, ApprovalScope, AssignedDriver, LifecycleAction, NewBookingRequest,
    RequestId, TransitionCommand,
};
use fleet_booking::workflows::eligibility::{AnnualLicenseRequest, DriverUid};
use fleet_booking::workflows::notifications::NotifyType;
use fleet_booking::{Clock, FixedClock};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Demo date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Notification template export to load instead of the built-in set.
    #[arg(long)]
    pub(crate) templates_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct EligibilityRunArgs {
    /// Evaluate as of midnight on this date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// JSON file with `drivers`, `licenses`, and optional `leaves`. Defaults to sample data.
    #[arg(long)]
    pub(crate) fixtures: Option<PathBuf>,
}

fn instant(today: Option<NaiveDate>, at: NaiveTime) -> NaiveDateTime {
    match today {
        Some(date) => date.and_time(at),
        None => Local::now().naive_local(),
    }
}

pub(crate) fn run_eligibility(args: EligibilityRunArgs) -> Result<(), AppError> {
    let EligibilityRunArgs { today, fixtures } = args;

    let now = instant(today, NaiveTime::MIN);
    let services = FleetServices::build(Arc::new(FixedClock::new(now)), None)?;
    let fixtures = match fixtures {
        Some(path) => DriverFixtures::from_path(&path)?,
        None => DriverFixtures::sample(now),
    };
    let uids: Vec<DriverUid> = fixtures
        .drivers
        .iter()
        .map(|driver| driver.driver_uid.clone())
        .collect();
    fixtures.seed(&services.store);

    let summary = services.engine.recompute_all()?;
    println!("Driver eligibility as of {now}");
    render_drivers(&services.store, &uids);
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("Batch summary:\n{json}"),
        Err(err) => println!("Batch summary unavailable: {err}"),
    }

    Ok(())
}

fn render_drivers(store: &InMemoryFleetStore, uids: &[DriverUid]) {
    for uid in uids {
        match store.driver(uid) {
            Some(driver) => println!(
                "- {} {:<10} active={:<5} status={} ({}) replacement={}",
                driver.driver_uid,
                driver.name,
                driver.is_active,
                driver.ref_driver_status_code,
                driver.ref_driver_status_code.label(),
                driver.is_replacement
            ),
            None => println!("- {uid}: no record"),
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        templates_csv,
    } = args;

    let now = instant(today, NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN));
    let clock = Arc::new(FixedClock::new(now));
    let services = FleetServices::build(clock.clone(), templates_csv.as_deref())?;

    println!("Fleet booking demo ({now})");

    let requester = Actor::new("E1000", ActorRole::VehicleUser).with_profile("Anan", "Finance");
    let level1 = Actor::new("E1001", ActorRole::Level1Approver).with_profile("Busaba", "Finance");
    let admin = Actor::new("E2001", ActorRole::Admin).with_profile("Chai", "Fleet Office");
    let final_approver =
        Actor::new("E3001", ActorRole::FinalApprover).with_profile("Duangjai", "Operations");

    let draft = |id: &str, no: &str| NewBookingRequest {
        request_id: RequestId(id.to_string()),
        request_no: no.to_string(),
        approval_scope: ApprovalScope::Fleet,
        vehicle_id: Some("VH-0042".to_string()),
        driver: Some(AssignedDriver {
            driver_uid: "DRV-7001".to_string(),
            emp_id: "D7001".to_string(),
            is_carpool: true,
        }),
        reserved_start: now + Duration::days(1),
        reserved_end: now + Duration::days(2),
        confirmer: Some(level1.snapshot()),
        approver: Some(final_approver.snapshot()),
        remark: Some("site visit".to_string()),
    };

    println!("\nBooking lifecycle");
    let request = services.lifecycle.submit(draft("REQ-DEMO-1", "BK-2025-0001"), &requester)?;
    println!(
        "- submitted {} -> {} ({})",
        request.request_no,
        request.status,
        request.status.display_name()
    );

    let steps = [
        (LifecycleAction::Approve, &level1),
        (LifecycleAction::Approve, &admin),
        (LifecycleAction::SendBack, &final_approver),
        (LifecycleAction::Resubmit, &requester),
        (LifecycleAction::Approve, &final_approver),
        (LifecycleAction::HandOverKey, &admin),
        (LifecycleAction::PickUpVehicle, &requester),
        (LifecycleAction::ReturnVehicle, &requester),
        (LifecycleAction::RejectReturn, &admin),
        (LifecycleAction::ResubmitReturn, &requester),
        (LifecycleAction::AcceptReturn, &admin),
    ];
    for (action, actor) in steps {
        clock.advance(Duration::hours(2));
        let outcome = services.lifecycle.transition(TransitionCommand {
            request_id: request.request_id.clone(),
            action,
            actor: actor.clone(),
            remark: None,
        })?;
        let notified = outcome
            .notifications
            .map(|report| report.created.len())
            .unwrap_or(0);
        println!(
            "- {:<16} by {:<15} {} -> {} ({}) | {} notification(s)",
            action.label(),
            actor.role.label(),
            outcome.from,
            outcome.to,
            outcome.to.display_name(),
            notified
        );
    }

    let history = services.lifecycle.history(&request.request_id)?;
    println!("  Audit trail: {} rows", history.len());

    let second = services.lifecycle.submit(draft("REQ-DEMO-2", "BK-2025-0002"), &requester)?;
    services.lifecycle.transition(TransitionCommand {
        request_id: second.request_id.clone(),
        action: LifecycleAction::Cancel,
        actor: level1.clone(),
        remark: Some("duplicate booking".to_string()),
    })?;
    let view = services.lifecycle.view(&second.request_id, ActorRole::VehicleUser)?;
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("  Canceled request view:\n{json}"),
        Err(err) => println!("  Canceled request view unavailable: {err}"),
    }

    println!("\nAnnual driving permit notifications");
    services.store.seed_annual_request(AnnualLicenseRequest {
        request_id: "ANL-DEMO-1".to_string(),
        request_no: "AD-2025-0001".to_string(),
        driver_uid: DriverUid("DRV-7002".to_string()),
        status_code: "20".to_string(),
        created_by: requester.emp_id.clone(),
        confirmer: Some(level1.emp_id.clone()),
        approver: None,
    });
    let report = services
        .dispatcher
        .dispatch("ANL-DEMO-1", NotifyType::RequestAnnualDriver)?;
    println!(
        "- {} created | {} skipped | {} failed",
        report.created.len(),
        report.skipped.len(),
        report.failed.len()
    );

    println!("\nDriver eligibility");
    let fixtures = DriverFixtures::sample(clock.now());
    let uids: Vec<DriverUid> = fixtures
        .drivers
        .iter()
        .map(|driver| driver.driver_uid.clone())
        .collect();
    fixtures.seed(&services.store);
    let summary = services.engine.recompute_all()?;
    render_drivers(&services.store, &uids);
    println!(
        "  {} evaluated | {} updated | {} promotion(s) | {} skipped",
        summary.evaluated,
        summary.updated.len(),
        summary.promotions,
        summary.skipped.len()
    );

    println!("\nUnread inbox for {}", level1.emp_id);
    let inbox = services.dispatcher.unread_for(&level1.emp_id)?;
    for notification in &inbox {
        println!("- [{}] {}", notification.title, notification.message);
    }
    if inbox.is_empty() {
        println!("- nothing unread");
    }

    Ok(())
}
