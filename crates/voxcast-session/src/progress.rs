//! Passive progress reporting.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use voxcast_core::types::ProgressSnapshot;

/// Spawn a best-effort reporter that logs the latest snapshot on an
/// interval. A slow or missing reporter never blocks the pipeline: it
/// only reads the most recent value from the watch channel.
pub fn spawn_reporter(
    rx: watch::Receiver<ProgressSnapshot>,
    cancel: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_units = 0u64;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            let snapshot = *rx.borrow();
            if snapshot.units_completed != last_units {
                last_units = snapshot.units_completed;
                report(&snapshot);
            }
        }
    })
}

fn report(snapshot: &ProgressSnapshot) {
    if snapshot.target_seconds > 0.0 {
        info!(
            elapsed = format_args!("{:.1}s", snapshot.elapsed_output_seconds),
            target = format_args!("{:.1}s", snapshot.target_seconds),
            units = snapshot.units_completed,
            "Progress"
        );
    } else if snapshot.target_units > 0 {
        info!(
            units = snapshot.units_completed,
            target = snapshot.target_units,
            elapsed = format_args!("{:.1}s", snapshot.elapsed_output_seconds),
            "Progress"
        );
    } else {
        info!(
            units = snapshot.units_completed,
            elapsed = format_args!("{:.1}s", snapshot.elapsed_output_seconds),
            "Progress"
        );
    }
}
