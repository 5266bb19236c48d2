use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};

use voxcast_audio::worker::PlayerConfig;
use voxcast_audio::{AudioOutput, CpalOutput};
use voxcast_core::config::Config;
use voxcast_core::state::Target;
use voxcast_core::types::VoiceStyle;
use voxcast_generator::worker::GeneratorConfig;
use voxcast_generator::Character;
use voxcast_model::{ContentModel, OllamaModel};
use voxcast_session::{spawn_reporter, Controller, SessionOptions};
use voxcast_synth::{CoquiHttpEngine, SpeechEngine};

#[derive(Parser)]
#[command(
    name = "voxcast",
    about = "AI streamer — generates spoken monologues from a local model and plays them live",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a streaming session
    Run {
        /// Character to stream as (emily, nova); prompted when omitted
        #[arg(long)]
        character: Option<String>,

        /// TTS speaker id override
        #[arg(long)]
        speaker: Option<String>,

        /// Stop after this many minutes of generated speech
        #[arg(long)]
        minutes: Option<f64>,

        /// Stop after this many units
        #[arg(long)]
        units: Option<u64>,

        /// Output device name substring; prompted when omitted
        #[arg(long)]
        device: Option<String>,

        /// Free-form topic or instructions merged into every prompt
        #[arg(long, default_value = "")]
        modifications: String,

        /// Transcript output directory override
        #[arg(long)]
        output: Option<String>,
    },

    /// List audio output devices
    Devices,

    /// Check that the content model, TTS server, and audio device are usable
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("voxcast.json"));
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Run {
            character,
            speaker,
            minutes,
            units,
            device,
            modifications,
            output,
        } => {
            run(
                config,
                character,
                speaker,
                minutes,
                units,
                device,
                modifications,
                output,
            )
            .await
        }
        Commands::Devices => devices(),
        Commands::Doctor => doctor(config).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    config: Config,
    character: Option<String>,
    speaker: Option<String>,
    minutes: Option<f64>,
    units: Option<u64>,
    device: Option<String>,
    modifications: String,
    output: Option<String>,
) -> anyhow::Result<()> {
    let target = match (minutes, units) {
        (Some(_), Some(_)) => anyhow::bail!("--minutes and --units are mutually exclusive"),
        (Some(m), None) if m > 0.0 => Target::Seconds(m * 60.0),
        (None, Some(k)) if k > 0 => Target::Units(k),
        _ => Target::Unbounded,
    };

    let character = match character {
        Some(name) => name.parse::<Character>()?,
        None => select_character()?,
    };

    let device_name = device.or_else(|| config.audio_device());
    let (device_name, channels) = select_device(device_name)?;

    // Setup failures are fatal before any worker starts.
    let model: Arc<dyn ContentModel> =
        Arc::new(OllamaModel::new(config.model_binary(), config.model_name()));
    model
        .probe()
        .await
        .map_err(|e| anyhow::anyhow!("content model is not usable: {e}"))?;

    let engine: Arc<dyn SpeechEngine> = Arc::new(CoquiHttpEngine::new(
        config.tts_server_url(),
        config.sample_rate(),
    ));
    engine
        .probe()
        .await
        .map_err(|e| anyhow::anyhow!("TTS engine is not usable: {e}"))?;

    let style = VoiceStyle {
        speaker_id: speaker.or_else(|| config.tts_speaker_id()),
        speed: config.voice_speed(),
        pitch: config.voice_pitch(),
        volume: config.voice_volume(),
    };

    let generator_config = GeneratorConfig {
        character,
        modifications,
        style,
        channels,
        history_max_chars: config.history_max_chars(),
        history_recent: config.history_recent(),
        backoff_initial: Duration::from_millis(config.backoff_initial_ms()),
        backoff_max: Duration::from_millis(config.backoff_max_ms()),
        words_per_minute: config.words_per_minute(),
    };

    let options = SessionOptions {
        target,
        queue_capacity: config.queue_capacity(),
        max_cpu_fraction: config.max_cpu_fraction(),
        transcript_dir: output.map(PathBuf::from).unwrap_or_else(|| config.transcript_dir()),
        player: PlayerConfig {
            gap_ms: config.unit_gap_ms(),
            pop_timeout: Duration::from_millis(250),
        },
    };

    let sample_rate = config.sample_rate();
    let volume = config.voice_volume();
    let make_output: voxcast_audio::OutputFactory = {
        let device_name = device_name.clone();
        Box::new(move || {
            let device = voxcast_audio::find_output_device(device_name.as_deref())?;
            let output = CpalOutput::open(&device, sample_rate, channels, volume)?;
            Ok(Box::new(output) as Box<dyn AudioOutput>)
        })
    };

    let controller = Controller::start(options, generator_config, model, engine, make_output);
    let state = controller.state();

    spawn_reporter(
        controller.progress(),
        state.cancel_token().clone(),
        Duration::from_secs(2),
    );

    // ctrl-c is an orderly stop, not an abort.
    tokio::spawn({
        let state = state.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping session");
                state.request_stop();
            }
        }
    });

    // Interactive control: p pause, r resume, s stop.
    tokio::spawn({
        let state = state.clone();
        async move {
            println!("Commands: 'p' pause, 'r' resume, 's' stop");
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match line.trim() {
                    "p" => {
                        println!("Pausing...");
                        state.pause();
                    }
                    "r" => {
                        println!("Resuming...");
                        state.resume();
                    }
                    "s" => {
                        println!("Stopping...");
                        state.request_stop();
                        break;
                    }
                    "" => {}
                    other => println!("Unknown command: {other}"),
                }
            }
        }
    });

    let report = controller.wait().await?;

    println!(
        "\nSession complete: {} units, {:.1}s of speech",
        report.units_produced, report.elapsed_output_seconds
    );
    println!("Transcript: {}", report.transcript_path.display());
    Ok(())
}

fn select_character() -> anyhow::Result<Character> {
    let labels: Vec<&str> = Character::ALL.iter().map(|c| c.label()).collect();
    let choice = dialoguer::Select::new()
        .with_prompt("Select a character")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Character::ALL[choice])
}

/// Resolve the output device and its playback channel count.
///
/// A name (from flag or config) is matched against the device list;
/// otherwise the user picks interactively.
fn select_device(name: Option<String>) -> anyhow::Result<(Option<String>, u16)> {
    let devices = voxcast_audio::list_output_devices()?;
    if devices.is_empty() {
        anyhow::bail!("no audio output devices available");
    }

    if let Some(name) = name {
        let lowered = name.to_lowercase();
        let matched = devices
            .iter()
            .find(|d| d.name.to_lowercase().contains(&lowered))
            .ok_or_else(|| anyhow::anyhow!("no output device matching '{name}'"))?;
        let channels = voxcast_audio::playback_channels(matched.max_channels);
        info!(device = %matched.name, channels, "Using output device");
        return Ok((Some(matched.name.clone()), channels));
    }

    let labels: Vec<String> = devices
        .iter()
        .map(|d| format!("{} ({} ch)", d.name, d.max_channels))
        .collect();
    let choice = dialoguer::Select::new()
        .with_prompt("Select the audio output device")
        .items(&labels)
        .default(0)
        .interact()?;
    let selected = &devices[choice];
    let channels = voxcast_audio::playback_channels(selected.max_channels);
    Ok((Some(selected.name.clone()), channels))
}

fn devices() -> anyhow::Result<()> {
    let devices = voxcast_audio::list_output_devices()?;
    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }
    println!("Available audio output devices:");
    for (i, d) in devices.iter().enumerate() {
        println!(
            "{i}: {} ({} ch, {} Hz default)",
            d.name, d.max_channels, d.default_sample_rate
        );
    }
    Ok(())
}

async fn doctor(config: Config) -> anyhow::Result<()> {
    let mut healthy = true;

    let model = OllamaModel::new(config.model_binary(), config.model_name());
    match model.probe().await {
        Ok(()) => println!("content model: ok ({})", config.model_binary()),
        Err(e) => {
            healthy = false;
            println!("content model: FAILED — {e}");
        }
    }

    let engine = CoquiHttpEngine::new(config.tts_server_url(), config.sample_rate());
    match engine.probe().await {
        Ok(()) => println!("tts server:    ok ({})", config.tts_server_url()),
        Err(e) => {
            healthy = false;
            println!("tts server:    FAILED — {e}");
        }
    }

    match voxcast_audio::list_output_devices() {
        Ok(devices) if !devices.is_empty() => {
            println!("audio output:  ok ({} devices)", devices.len());
        }
        Ok(_) => {
            healthy = false;
            println!("audio output:  FAILED — no output devices");
        }
        Err(e) => {
            healthy = false;
            println!("audio output:  FAILED — {e}");
        }
    }

    if !healthy {
        warn!("One or more checks failed");
        std::process::exit(1);
    }
    Ok(())
}
