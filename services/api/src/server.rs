use crate::cli::ServeArgs;
use crate::infra::{AppState, FleetServices};
use crate::routes::ops_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fleet_booking::config::AppConfig;
use fleet_booking::error::AppError;
use fleet_booking::telemetry;
use fleet_booking::workflows::eligibility::EligibilityScheduler;
use fleet_booking::SystemClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    args.apply(&mut config);

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = FleetServices::build(
        Arc::new(SystemClock),
        config.notifications.templates_csv.as_deref(),
    )?;
    match config.scheduler.drivers_json.as_deref() {
        Some(path) => {
            services.load_drivers(path)?;
        }
        None if config.scheduler.enabled => {
            warn!("ELIGIBILITY_DRIVERS_JSON not set; the daily batch starts with no drivers");
        }
        None => {}
    }

    let scheduler_task = if config.scheduler.enabled {
        let scheduler = Arc::new(EligibilityScheduler::new(
            services.engine.clone(),
            config.scheduler.run_at,
        ));
        Some(tokio::spawn(scheduler.run_daily()))
    } else {
        warn!("daily eligibility scheduler disabled");
        None
    };

    let app = ops_router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        run_at = %config.scheduler.run_at,
        "fleet booking service ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    if let Some(task) = scheduler_task {
        task.abort();
    }
    info!("fleet booking service stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
