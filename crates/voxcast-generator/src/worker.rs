//! The generation worker — prompt, model call, clean, synthesize, enqueue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use voxcast_core::history::ConversationHistory;
use voxcast_core::queue::{ContentSender, PushOutcome};
use voxcast_core::state::SessionState;
use voxcast_core::types::{ContentUnit, ProgressSnapshot, VoiceStyle};
use voxcast_model::ContentModel;
use voxcast_synth::{wave, SpeechEngine};

use crate::clean::{clean_text, detect_emotion};
use crate::persona::Character;
use crate::prompt::build_prompt;
use crate::throttle::CpuThrottle;

/// Settings for one generation worker.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub character: Character,
    /// Free-form operator instructions merged into every prompt.
    pub modifications: String,
    pub style: VoiceStyle,
    /// Output channel count units are reshaped to.
    pub channels: u16,
    pub history_max_chars: usize,
    pub history_recent: usize,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    /// Words-per-minute used for the pre-flight duration estimate.
    pub words_per_minute: u32,
}

/// What the worker hands back when joined.
#[derive(Debug)]
pub struct GeneratorSummary {
    /// Transcript lines in generation order (== playback order).
    pub transcript_lines: Vec<String>,
    pub units_produced: u64,
}

/// Capped exponential backoff for transient generation failures.
struct Backoff {
    current: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial,
            initial,
            max,
        }
    }

    /// Sleep for the current delay and double it. Returns `true` when the
    /// sleep was cut short by cancellation.
    async fn sleep(&mut self, cancel: &CancellationToken) -> bool {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Spawn the generation worker as a tokio task.
pub fn spawn_generator(
    state: Arc<SessionState>,
    queue: ContentSender<ContentUnit>,
    progress: watch::Sender<ProgressSnapshot>,
    model: Arc<dyn ContentModel>,
    engine: Arc<dyn SpeechEngine>,
    config: GeneratorConfig,
) -> JoinHandle<GeneratorSummary> {
    tokio::spawn(run_generator(state, queue, progress, model, engine, config))
}

/// The generation loop. Exits only on the shared stop signal; every
/// model/synthesis failure is logged and retried or skipped.
pub async fn run_generator(
    state: Arc<SessionState>,
    queue: ContentSender<ContentUnit>,
    progress: watch::Sender<ProgressSnapshot>,
    model: Arc<dyn ContentModel>,
    engine: Arc<dyn SpeechEngine>,
    config: GeneratorConfig,
) -> GeneratorSummary {
    let speaker = config.character.label();
    let mut history = ConversationHistory::new(config.history_max_chars);
    let mut transcript_lines = Vec::new();
    let mut throttle = CpuThrottle::new();
    let mut backoff = Backoff::new(config.backoff_initial, config.backoff_max);
    let mut sequence: u64 = 0;

    info!(character = %config.character, model = model.id(), "Generator started");

    while !state.is_stopped() {
        state.pause_gate().await;
        throttle
            .wait_for_headroom(state.max_cpu_fraction(), state.cancel_token())
            .await;
        if state.is_stopped() {
            break;
        }

        let prompt = build_prompt(
            config.character,
            &config.modifications,
            &history,
            config.history_recent,
            state.nearing_end(),
        );

        let raw = match model.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Content model returned empty response, retrying");
                if backoff.sleep(state.cancel_token()).await {
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(%e, "Content model call failed, retrying");
                if backoff.sleep(state.cancel_token()).await {
                    break;
                }
                continue;
            }
        };

        let Some(cleaned) = clean_text(&raw) else {
            warn!("Nothing speakable left after cleaning, retrying");
            if backoff.sleep(state.cancel_token()).await {
                break;
            }
            continue;
        };
        backoff.reset();

        let emotion = detect_emotion(&cleaned);
        let style = config.style.with_emotion(emotion);
        debug!(
            ?emotion,
            estimated_seconds = wave::estimate_duration(&cleaned, config.words_per_minute),
            "Segment cleaned"
        );

        let mut samples = match engine.synthesize(&cleaned, &style).await {
            Ok(samples) => samples,
            Err(e) => {
                warn!(%e, sequence, "Synthesis failed, dropping unit");
                continue;
            }
        };
        if !wave::normalize(&mut samples) {
            warn!(sequence, "Synthesis produced only silence, dropping unit");
            continue;
        }
        let samples = wave::reshape_mono(samples, config.channels);

        let unit = match ContentUnit::new(
            sequence,
            speaker,
            cleaned.clone(),
            samples,
            engine.sample_rate(),
            config.channels,
        ) {
            Ok(unit) => unit,
            Err(e) => {
                warn!(%e, sequence, "Degenerate unit, dropping");
                continue;
            }
        };
        let duration = unit.duration_seconds;
        let line = unit.transcript_line();

        if queue.push(unit, state.cancel_token()).await == PushOutcome::Shutdown {
            break;
        }

        sequence += 1;
        history.push(speaker, cleaned);
        transcript_lines.push(line);

        let target_reached = state.record_unit(duration);
        progress.send_replace(state.snapshot());
        debug!(sequence, duration, "Unit queued");

        if target_reached {
            info!(
                elapsed = state.elapsed_output_seconds(),
                units = state.units_completed(),
                "Session target reached, stopping"
            );
            state.request_stop();
            break;
        }
    }

    info!(units = sequence, "Generator stopped");
    GeneratorSummary {
        transcript_lines,
        units_produced: sequence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use voxcast_core::queue;
    use voxcast_core::state::Target;

    struct ScriptedModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentModel for ScriptedModel {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("segment number {n}"))
        }

        async fn probe(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// One second of audio per unit; optionally fails on a chosen call.
    struct FixedEngine {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl SpeechEngine for FixedEngine {
        fn id(&self) -> &str {
            "fixed"
        }

        fn sample_rate(&self) -> u32 {
            22_050
        }

        async fn synthesize(
            &self,
            _text: &str,
            _style: &VoiceStyle,
        ) -> anyhow::Result<Vec<f32>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(n) {
                anyhow::bail!("engine exploded on call {n}");
            }
            Ok(vec![0.5; 22_050])
        }

        async fn probe(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn test_config() -> GeneratorConfig {
        GeneratorConfig {
            character: Character::Emily,
            modifications: String::new(),
            style: VoiceStyle::default(),
            channels: 1,
            history_max_chars: 10_000,
            history_recent: 5,
            backoff_initial: Duration::from_millis(1),
            backoff_max: Duration::from_millis(4),
            words_per_minute: 150,
        }
    }

    #[tokio::test]
    async fn test_count_target_produces_exactly_k_units() {
        let state = Arc::new(SessionState::new(Target::Units(3), 1.0));
        let (tx, mut rx) = queue::bounded(10);
        let (progress, _) = watch::channel(ProgressSnapshot::default());

        let summary = run_generator(
            state.clone(),
            tx,
            progress,
            Arc::new(ScriptedModel { calls: AtomicUsize::new(0) }),
            Arc::new(FixedEngine { calls: AtomicUsize::new(0), fail_on: None }),
            test_config(),
        )
        .await;

        assert_eq!(summary.units_produced, 3);
        assert_eq!(summary.transcript_lines.len(), 3);
        assert!(state.is_stopped());

        // Queue holds the three units in generation order.
        for expected in 0..3u64 {
            match rx.pop(Duration::from_millis(50)).await {
                queue::Popped::Unit(unit) => assert_eq!(unit.sequence, expected),
                other => panic!("expected unit, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_skipped_and_retried() {
        let state = Arc::new(SessionState::new(Target::Units(4), 1.0));
        let (tx, mut rx) = queue::bounded(10);
        let (progress, _) = watch::channel(ProgressSnapshot::default());

        let summary = run_generator(
            state.clone(),
            tx,
            progress,
            Arc::new(ScriptedModel { calls: AtomicUsize::new(0) }),
            Arc::new(FixedEngine { calls: AtomicUsize::new(0), fail_on: Some(3) }),
            test_config(),
        )
        .await;

        // The failed cycle is dropped, not counted; four successes arrive.
        assert_eq!(summary.units_produced, 4);
        assert_eq!(summary.transcript_lines.len(), 4);

        // The text of the failed model call (call index 2) never appears.
        assert!(summary
            .transcript_lines
            .iter()
            .all(|line| !line.contains("segment number 2")));

        let mut count = 0;
        while let queue::Popped::Unit(_) = rx.pop(Duration::from_millis(20)).await {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_seconds_target_counts_synthesized_duration() {
        // 1-second units against a 3-second target.
        let state = Arc::new(SessionState::new(Target::Seconds(3.0), 1.0));
        let (tx, _rx) = queue::bounded(10);
        let (progress, progress_rx) = watch::channel(ProgressSnapshot::default());

        let summary = run_generator(
            state.clone(),
            tx,
            progress,
            Arc::new(ScriptedModel { calls: AtomicUsize::new(0) }),
            Arc::new(FixedEngine { calls: AtomicUsize::new(0), fail_on: None }),
            test_config(),
        )
        .await;

        assert_eq!(summary.units_produced, 3);
        assert!((state.elapsed_output_seconds() - 3.0).abs() < 1e-6);

        let snapshot = *progress_rx.borrow();
        assert_eq!(snapshot.units_completed, 3);
        assert!((snapshot.elapsed_output_seconds - 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_stop_signal_ends_generation() {
        let state = Arc::new(SessionState::new(Target::Unbounded, 1.0));
        // Capacity 1 and no consumer: the worker ends up blocked in push.
        let (tx, _rx) = queue::bounded(1);
        let (progress, _) = watch::channel(ProgressSnapshot::default());

        let handle = spawn_generator(
            state.clone(),
            tx,
            progress,
            Arc::new(ScriptedModel { calls: AtomicUsize::new(0) }),
            Arc::new(FixedEngine { calls: AtomicUsize::new(0), fail_on: None }),
            test_config(),
        );

        tokio::time::sleep(Duration::from_millis(600)).await;
        state.request_stop();

        let summary = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("generator must stop promptly after the signal")
            .unwrap();
        assert!(summary.units_produced >= 1);
    }
}
