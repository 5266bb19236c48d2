//! Session-wide control state: stop/pause signals and termination policy.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::types::ProgressSnapshot;

/// What ends the session.
///
/// Exactly one target governs termination per run; [`Target::Unbounded`]
/// means the session runs until an explicit stop command or OS signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Seconds(f64),
    Units(u64),
    Unbounded,
}

/// Shared control state for one session.
///
/// This and the bounded queue are the only mutable state crossing the
/// generation/playback boundary. Counters are atomics; the stop and pause
/// signals are a cancellation token and a watch channel.
#[derive(Debug)]
pub struct SessionState {
    cancel: CancellationToken,
    paused: watch::Sender<bool>,
    elapsed_ms: AtomicU64,
    units_completed: AtomicU64,
    target: Target,
    max_cpu_fraction: f64,
}

impl SessionState {
    pub fn new(target: Target, max_cpu_fraction: f64) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            cancel: CancellationToken::new(),
            paused,
            elapsed_ms: AtomicU64::new(0),
            units_completed: AtomicU64::new(0),
            target,
            max_cpu_fraction: max_cpu_fraction.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }

    // --- Stop signal ---

    /// Request cooperative shutdown. Idempotent.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token for `select!`-style waits and queue operations.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    // --- Pause signal ---

    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Wait until the session is unpaused (or stopped). Returns immediately
    /// when not paused.
    pub async fn pause_gate(&self) {
        let mut rx = self.paused.subscribe();
        while *rx.borrow_and_update() {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                res = rx.changed() => {
                    if res.is_err() {
                        return;
                    }
                }
            }
        }
    }

    // --- Termination accounting ---

    /// Record a completed unit and report whether the configured target has
    /// been reached. Called on the generation side after each unit.
    pub fn record_unit(&self, duration_seconds: f64) -> bool {
        let ms = (duration_seconds * 1000.0).round() as u64;
        let elapsed = self.elapsed_ms.fetch_add(ms, Ordering::Relaxed) + ms;
        let units = self.units_completed.fetch_add(1, Ordering::Relaxed) + 1;
        match self.target {
            Target::Seconds(t) => elapsed as f64 / 1000.0 >= t,
            Target::Units(k) => units >= k,
            Target::Unbounded => false,
        }
    }

    /// True once 90% of a seconds target has elapsed; always false for
    /// count-bounded and unbounded sessions.
    pub fn nearing_end(&self) -> bool {
        match self.target {
            Target::Seconds(t) if t > 0.0 => self.elapsed_output_seconds() >= 0.9 * t,
            _ => false,
        }
    }

    pub fn elapsed_output_seconds(&self) -> f64 {
        self.elapsed_ms.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn units_completed(&self) -> u64 {
        self.units_completed.load(Ordering::Relaxed)
    }

    pub fn max_cpu_fraction(&self) -> f64 {
        self.max_cpu_fraction
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let (target_seconds, target_units) = match self.target {
            Target::Seconds(t) => (t, 0),
            Target::Units(k) => (0.0, k),
            Target::Unbounded => (0.0, 0),
        };
        ProgressSnapshot {
            elapsed_output_seconds: self.elapsed_output_seconds(),
            target_seconds,
            units_completed: self.units_completed(),
            target_units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_seconds_target_reached() {
        let state = SessionState::new(Target::Seconds(60.0), 1.0);
        for _ in 0..5 {
            assert!(!state.record_unit(10.0));
        }
        assert!(state.record_unit(10.0));
        assert!((state.elapsed_output_seconds() - 60.0).abs() < 1e-9);
        assert_eq!(state.units_completed(), 6);
    }

    #[test]
    fn test_units_target_reached() {
        let state = SessionState::new(Target::Units(3), 1.0);
        assert!(!state.record_unit(5.0));
        assert!(!state.record_unit(5.0));
        assert!(state.record_unit(5.0));
    }

    #[test]
    fn test_unbounded_never_terminates() {
        let state = SessionState::new(Target::Unbounded, 1.0);
        for _ in 0..100 {
            assert!(!state.record_unit(60.0));
        }
        assert!(!state.nearing_end());
    }

    #[test]
    fn test_nearing_end_at_ninety_percent() {
        let state = SessionState::new(Target::Seconds(100.0), 1.0);
        state.record_unit(89.0);
        assert!(!state.nearing_end());
        state.record_unit(1.0);
        assert!(state.nearing_end());
    }

    #[tokio::test]
    async fn test_pause_gate_blocks_until_resume() {
        let state = std::sync::Arc::new(SessionState::new(Target::Unbounded, 1.0));
        state.pause();

        let gate = {
            let state = state.clone();
            tokio::spawn(async move { state.pause_gate().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!gate.is_finished());

        state.resume();
        tokio::time::timeout(Duration::from_millis(100), gate)
            .await
            .expect("gate should release on resume")
            .unwrap();
    }

    #[tokio::test]
    async fn test_pause_gate_releases_on_stop() {
        let state = std::sync::Arc::new(SessionState::new(Target::Unbounded, 1.0));
        state.pause();

        let gate = {
            let state = state.clone();
            tokio::spawn(async move { state.pause_gate().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        state.request_stop();
        tokio::time::timeout(Duration::from_millis(100), gate)
            .await
            .expect("gate should release on stop")
            .unwrap();
    }
}
