/// Fixed-cadence driver for the broadcast hub.
///
/// A tick that overruns the period pushes the next one back instead of
/// firing a burst to catch up. Runs until the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::BroadcastHub;

pub async fn run(hub: Arc<BroadcastHub>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(period_ms = period.as_millis() as u64, "Broadcast ticker started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        // Source reads are synchronous; keep them off the async workers
        let hub = hub.clone();
        match tokio::task::spawn_blocking(move || hub.tick()).await {
            Ok(outcome) if !outcome.is_idle() => {
                debug!(delivered = outcome.delivered, dropped = outcome.dropped, "tick");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Tick task failed"),
        }
    }

    info!("Broadcast ticker stopped");
}
