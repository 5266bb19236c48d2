//! The playback worker — real-time rendering of queued units.
//!
//! cpal streams are not `Send`, so the worker runs on a blocking thread
//! that builds the output inside itself; queue and signal waits go through
//! a runtime handle.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use voxcast_core::queue::{ContentReceiver, Popped};
use voxcast_core::state::SessionState;
use voxcast_core::types::ContentUnit;

use crate::sink::AudioOutput;

/// Settings for the playback worker.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// (min, max) jittered silence between units, milliseconds.
    pub gap_ms: (u64, u64),
    /// How long one queue poll waits before re-checking the stop signal.
    pub pop_timeout: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            gap_ms: (100, 300),
            pop_timeout: Duration::from_millis(250),
        }
    }
}

/// What the worker hands back when joined.
#[derive(Debug)]
pub struct PlayerSummary {
    /// Units rendered to completion (aborted units are not counted).
    pub units_played: u64,
    /// Units discarded from the queue at shutdown.
    pub discarded: usize,
}

/// Builds the output on the playback thread itself, keeping the non-`Send`
/// device stream off every other thread.
pub type OutputFactory = Box<dyn FnOnce() -> anyhow::Result<Box<dyn AudioOutput>> + Send>;

/// Spawn the playback worker on a blocking thread.
pub fn spawn_player(
    state: Arc<SessionState>,
    receiver: ContentReceiver<ContentUnit>,
    make_output: OutputFactory,
    config: PlayerConfig,
) -> JoinHandle<PlayerSummary> {
    let handle = Handle::current();
    tokio::task::spawn_blocking(move || {
        run_player(handle, state, receiver, make_output, config)
    })
}

fn run_player(
    handle: Handle,
    state: Arc<SessionState>,
    mut receiver: ContentReceiver<ContentUnit>,
    make_output: OutputFactory,
    config: PlayerConfig,
) -> PlayerSummary {
    let mut output = match make_output() {
        Ok(output) => output,
        Err(e) => {
            // Setup failure is fatal: without a device the session cannot run.
            error!(%e, "Failed to open audio output");
            state.request_stop();
            let discarded = receiver.drain();
            return PlayerSummary {
                units_played: 0,
                discarded,
            };
        }
    };

    info!("Player started");
    let mut units_played = 0u64;
    let mut rng = rand::rng();

    while !state.is_stopped() {
        if state.is_paused() {
            output.pause();
            handle.block_on(state.pause_gate());
            output.resume();
            continue;
        }

        match handle.block_on(receiver.pop(config.pop_timeout)) {
            Popped::Unit(unit) => {
                if play_unit(&handle, &state, output.as_mut(), &unit) {
                    units_played += 1;
                } else {
                    break;
                }
                sleep_gap(&state, &mut rng, config.gap_ms);
            }
            Popped::TimedOut => {}
            Popped::Closed => {
                // Producer is gone; nothing more will arrive. Idle until
                // the stop signal lands.
                std::thread::sleep(config.pop_timeout);
            }
        }
    }

    // Shutdown: abandon anything still queued and release the device.
    let discarded = receiver.drain();
    output.clear();
    info!(units_played, discarded, "Player stopped");
    PlayerSummary {
        units_played,
        discarded,
    }
}

/// Render one unit to completion. Returns `false` when playback was
/// aborted by the stop signal.
fn play_unit(
    handle: &Handle,
    state: &SessionState,
    output: &mut dyn AudioOutput,
    unit: &ContentUnit,
) -> bool {
    debug!(
        sequence = unit.sequence,
        duration = unit.duration_seconds,
        "Playing unit"
    );
    output.write(&unit.samples);

    while output.pending() > 0 {
        if state.is_stopped() {
            output.clear();
            return false;
        }
        if state.is_paused() {
            output.pause();
            handle.block_on(state.pause_gate());
            if state.is_stopped() {
                output.clear();
                return false;
            }
            output.resume();
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    true
}

fn sleep_gap(state: &SessionState, rng: &mut impl Rng, (min, max): (u64, u64)) {
    if state.is_stopped() {
        return;
    }
    let gap = if max > min {
        rng.random_range(min..=max)
    } else {
        min
    };
    std::thread::sleep(Duration::from_millis(gap));
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Instant;

    use tokio_util::sync::CancellationToken;
    use voxcast_core::queue;
    use voxcast_core::state::Target;

    /// Mock output that "renders" in scaled real time.
    struct SimulatedOutput {
        sample_rate: u32,
        time_scale: f64,
        play_until: Instant,
        played: Arc<Mutex<Vec<usize>>>,
    }

    impl SimulatedOutput {
        fn new(sample_rate: u32, time_scale: f64, played: Arc<Mutex<Vec<usize>>>) -> Self {
            Self {
                sample_rate,
                time_scale,
                play_until: Instant::now(),
                played,
            }
        }
    }

    impl AudioOutput for SimulatedOutput {
        fn write(&mut self, samples: &[f32]) {
            let seconds = samples.len() as f64 / self.sample_rate as f64;
            self.play_until = Instant::now()
                + Duration::from_secs_f64(seconds * self.time_scale);
            self.played.lock().unwrap().push(samples.len());
        }

        fn pending(&self) -> usize {
            let now = Instant::now();
            if now >= self.play_until {
                0
            } else {
                (self.play_until - now).as_millis() as usize + 1
            }
        }

        fn clear(&mut self) {
            self.play_until = Instant::now();
        }

        fn pause(&mut self) {}

        fn resume(&mut self) {}
    }

    fn unit(sequence: u64, seconds: f64) -> ContentUnit {
        let samples = vec![0.5; (22_050.0 * seconds) as usize];
        ContentUnit::new(sequence, "Emily", format!("unit {sequence}"), samples, 22_050, 1)
            .unwrap()
    }

    fn test_config() -> PlayerConfig {
        PlayerConfig {
            gap_ms: (0, 0),
            pop_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_plays_units_in_order() {
        let state = Arc::new(SessionState::new(Target::Unbounded, 1.0));
        let (tx, rx) = queue::bounded(5);
        let cancel = CancellationToken::new();
        let played = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            tx.push(unit(i, 0.5), &cancel).await;
        }

        let factory: OutputFactory = {
            let played = played.clone();
            // 0.5s units at 2% scale: ~10ms each.
            Box::new(move || {
                Ok(Box::new(SimulatedOutput::new(22_050, 0.02, played))
                    as Box<dyn AudioOutput>)
            })
        };
        let handle = spawn_player(state.clone(), rx, factory, test_config());

        tokio::time::sleep(Duration::from_millis(400)).await;
        state.request_stop();
        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("player must stop promptly")
            .unwrap();

        assert_eq!(summary.units_played, 3);
        assert_eq!(played.lock().unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_aborts_in_flight_unit_and_drains() {
        let state = Arc::new(SessionState::new(Target::Unbounded, 1.0));
        let (tx, rx) = queue::bounded(5);
        let cancel = CancellationToken::new();
        let played = Arc::new(Mutex::new(Vec::new()));

        // A long unit plus two more waiting behind it.
        tx.push(unit(0, 30.0), &cancel).await;
        tx.push(unit(1, 1.0), &cancel).await;
        tx.push(unit(2, 1.0), &cancel).await;

        let factory: OutputFactory = {
            let played = played.clone();
            Box::new(move || {
                Ok(Box::new(SimulatedOutput::new(22_050, 1.0, played))
                    as Box<dyn AudioOutput>)
            })
        };
        let handle = spawn_player(state.clone(), rx, factory, test_config());

        // Let playback of the long unit begin, then stop.
        tokio::time::sleep(Duration::from_millis(200)).await;
        state.request_stop();

        let start = Instant::now();
        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("player must stop promptly mid-unit")
            .unwrap();

        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(summary.units_played, 0);
        assert_eq!(summary.discarded, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_output_setup_failure_stops_session() {
        let state = Arc::new(SessionState::new(Target::Unbounded, 1.0));
        let (_tx, rx) = queue::bounded::<ContentUnit>(5);

        let factory: OutputFactory =
            Box::new(|| anyhow::bail!("no such device"));
        let handle = spawn_player(state.clone(), rx, factory, test_config());

        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("player must exit on setup failure")
            .unwrap();

        assert!(state.is_stopped());
        assert_eq!(summary.units_played, 0);
    }
}
