//! Advisory CPU throttle for the generation stage.

use std::time::Duration;

use sysinfo::System;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Samples recent CPU utilization and delays the next generation cycle
/// until utilization is at or below the configured ceiling.
///
/// This is pacing, not isolation: it only postpones starting a cycle and
/// never interrupts one in progress.
pub struct CpuThrottle {
    sys: System,
}

impl CpuThrottle {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    /// Global CPU utilization as a fraction in [0, 1].
    ///
    /// Two refreshes bracket a short sleep; sysinfo derives usage from the
    /// delta between them.
    async fn sample(&mut self) -> f64 {
        self.sys.refresh_cpu_usage();
        let interval = sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_millis(100));
        tokio::time::sleep(interval).await;
        self.sys.refresh_cpu_usage();
        f64::from(self.sys.global_cpu_usage()) / 100.0
    }

    /// Sleep in small increments until utilization is at or below
    /// `max_fraction`, or until the session is stopped.
    pub async fn wait_for_headroom(&mut self, max_fraction: f64, cancel: &CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let usage = self.sample().await;
            if usage <= max_fraction {
                return;
            }
            debug!(usage, max_fraction, "CPU above ceiling, delaying generation");
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
        }
    }
}

impl Default for CpuThrottle {
    fn default() -> Self {
        Self::new()
    }
}
