use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::{error, info};

use super::repository::DriverRepository;
use super::service::{BatchSummary, DriverEligibilityEngine, EligibilityError};

/// Runs the eligibility batch once a day at a fixed local wall-clock time.
pub struct EligibilityScheduler<D> {
    engine: Arc<DriverEligibilityEngine<D>>,
    run_at: NaiveTime,
}

impl<D> EligibilityScheduler<D>
where
    D: DriverRepository + 'static,
{
    pub fn new(engine: Arc<DriverEligibilityEngine<D>>, run_at: NaiveTime) -> Self {
        Self { engine, run_at }
    }

    pub fn run_at(&self) -> NaiveTime {
        self.run_at
    }

    /// First scheduled instant strictly after `now`.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.run_at);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    pub fn run_once(&self) -> Result<BatchSummary, EligibilityError> {
        self.engine.recompute_all()
    }

    /// Sleeps until each scheduled instant and runs the batch on a blocking thread.
    ///
    /// Never returns; abort the task to stop it.
    pub async fn run_daily(self: Arc<Self>) {
        loop {
            let now = self.engine.clock().now();
            let next = self.next_run_after(now);
            info!(next_run = %next, "eligibility batch scheduled");

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let scheduler = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || scheduler.run_once()).await {
                Ok(Ok(summary)) if summary.is_clean() => {}
                Ok(Ok(summary)) => {
                    error!(
                        failed = summary.failed.len(),
                        "eligibility batch finished with failures"
                    );
                }
                Ok(Err(err)) => error!(error = %err, "eligibility batch aborted"),
                Err(err) => error!(error = %err, "eligibility batch task panicked"),
            }
        }
    }
}
