//! Session controller — owns worker lifecycles and the shutdown protocol.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use voxcast_audio::worker::{spawn_player, OutputFactory, PlayerConfig, PlayerSummary};
use voxcast_core::queue;
use voxcast_core::state::{SessionState, Target};
use voxcast_core::types::ProgressSnapshot;
use voxcast_generator::worker::{spawn_generator, GeneratorConfig, GeneratorSummary};
use voxcast_model::ContentModel;
use voxcast_synth::SpeechEngine;

use crate::transcript::Transcript;

/// Session-level settings not owned by an individual worker.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub target: Target,
    pub queue_capacity: usize,
    pub max_cpu_fraction: f64,
    pub transcript_dir: PathBuf,
    pub player: PlayerConfig,
}

/// Final accounting returned once the session has fully shut down.
#[derive(Debug)]
pub struct SessionReport {
    pub units_produced: u64,
    pub units_played: u64,
    pub elapsed_output_seconds: f64,
    pub transcript_path: PathBuf,
}

/// A running session: both workers live, stop signal not yet fired.
pub struct Controller {
    state: Arc<SessionState>,
    generator: JoinHandle<GeneratorSummary>,
    player: JoinHandle<PlayerSummary>,
    character: String,
    transcript_dir: PathBuf,
    progress_rx: watch::Receiver<ProgressSnapshot>,
}

impl Controller {
    /// Wire up state, queue, and both workers, and start them.
    ///
    /// The model and engine must already be probed; worker startup itself
    /// cannot fail (an output-device failure surfaces as an immediate
    /// stop).
    pub fn start(
        options: SessionOptions,
        generator_config: GeneratorConfig,
        model: Arc<dyn ContentModel>,
        engine: Arc<dyn SpeechEngine>,
        make_output: OutputFactory,
    ) -> Self {
        let state = Arc::new(SessionState::new(options.target, options.max_cpu_fraction));
        let (queue_tx, queue_rx) = queue::bounded(options.queue_capacity);
        let (progress_tx, progress_rx) = watch::channel(ProgressSnapshot::default());

        let character = generator_config.character.label().to_string();
        info!(
            %character,
            target = ?options.target,
            queue_capacity = options.queue_capacity,
            "Session starting"
        );

        let generator = spawn_generator(
            state.clone(),
            queue_tx,
            progress_tx,
            model,
            engine,
            generator_config,
        );
        let player = spawn_player(state.clone(), queue_rx, make_output, options.player);

        Self {
            state,
            generator,
            player,
            character,
            transcript_dir: options.transcript_dir,
            progress_rx,
        }
    }

    /// Shared control state, for external stop/pause triggers.
    pub fn state(&self) -> Arc<SessionState> {
        self.state.clone()
    }

    /// Subscribe to progress snapshots.
    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_rx.clone()
    }

    /// Wait for the stop signal, then run the shutdown protocol: join the
    /// generator, join the player, flush the transcript.
    pub async fn wait(self) -> anyhow::Result<SessionReport> {
        self.state.cancel_token().cancelled().await;
        info!("Stop signal received, shutting down workers");

        let generator = match self.generator.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(%e, "Generator task panicked");
                GeneratorSummary {
                    transcript_lines: Vec::new(),
                    units_produced: 0,
                }
            }
        };
        let player = match self.player.await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(%e, "Player task panicked");
                PlayerSummary {
                    units_played: 0,
                    discarded: 0,
                }
            }
        };

        let mut transcript = Transcript::new(&self.character);
        transcript.extend(generator.transcript_lines);
        let transcript_path = transcript.write_to(&self.transcript_dir)?;

        let report = SessionReport {
            units_produced: generator.units_produced,
            units_played: player.units_played,
            elapsed_output_seconds: self.state.elapsed_output_seconds(),
            transcript_path,
        };
        info!(
            units_produced = report.units_produced,
            units_played = report.units_played,
            elapsed = report.elapsed_output_seconds,
            "Session ended"
        );
        Ok(report)
    }
}
