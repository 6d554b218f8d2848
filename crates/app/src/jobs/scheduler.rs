use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, warn};

use crate::jobs::JobError;

const FAILURE_BACKOFF: Duration = Duration::from_secs(30);

/// Runs `job` on a fixed cadence until the task is dropped. The first run
/// happens immediately; a failed run is followed by a short backoff.
pub async fn run_interval<F, Fut>(
    name: &'static str,
    interval_duration: Duration,
    mut job: F,
) -> Result<(), JobError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), JobError>>,
{
    let mut ticker = interval(interval_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        debug!(job = name, "job tick");
        if let Err(err) = job().await {
            warn!(error = %err, job = name, "job execution failed");
            sleep(FAILURE_BACKOFF).await;
        }
    }
}
