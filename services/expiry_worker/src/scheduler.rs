//! services/expiry_worker/src/scheduler.rs
//!
//! Triggers the expiry sweep once a day and serializes manual runs with the
//! scheduled ones.

use chrono::{Days, NaiveDateTime, NaiveTime};
use freshness_core::{Clock, ExpirySweepJob, SweepError, SweepReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Owns the sweep job and guarantees at most one run at a time in this process.
pub struct SweepRunner {
    job: Mutex<ExpirySweepJob>,
    push_online: bool,
}

impl SweepRunner {
    pub fn new(job: ExpirySweepJob) -> Self {
        let push_online = job.push_online();
        Self {
            job: Mutex::new(job),
            push_online,
        }
    }

    pub fn push_online(&self) -> bool {
        self.push_online
    }

    /// Runs one sweep, waiting for any run already in progress to finish first.
    pub async fn run(&self) -> Result<SweepReport, SweepError> {
        let job = self.job.lock().await;
        job.run().await
    }
}

/// Time from `now` until the next occurrence of `at`; a run exactly at `now`
/// counts as already done.
pub fn delay_until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let today_run = now.date().and_time(at);
    let next = if today_run > now {
        today_run
    } else {
        now.date()
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(at))
            .unwrap_or(today_run)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Sleeps until the next `at`, runs a sweep, and repeats until `shutdown`
/// is cancelled. A failed run is logged and the loop carries on.
pub async fn run_daily(
    runner: Arc<SweepRunner>,
    at: NaiveTime,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) {
    loop {
        let delay = delay_until_next(clock.now(), at);
        info!(next_run_in_secs = delay.as_secs(), "Next expiry sweep scheduled");

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Expiry scheduler stopping.");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        if let Err(e) = runner.run().await {
            error!(error = %e, "Scheduled expiry sweep failed");
        }
    }
}
