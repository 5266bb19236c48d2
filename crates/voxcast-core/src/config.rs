//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level Voxcast configuration, loaded from `voxcast.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<TtsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationConfig>,
}

/// Session-level settings: queue bound, throttle, transcript output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Capacity of the content queue between generation and playback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,

    /// Advisory CPU ceiling for the generation stage, in (0, 1].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cpu_fraction: Option<f64>,

    /// Directory transcripts are written into at shutdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_dir: Option<String>,
}

/// Content-model backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Runner binary (default: "ollama").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Model name passed to the runner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// TTS engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of the local TTS server (default: http://localhost:5002).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Default speaker id for multi-speaker models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    /// Words-per-minute used for pre-flight duration estimates only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words_per_minute: Option<u32>,
}

/// Playback settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output device name substring; unset means interactive selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Fixed output sample rate (default: 22050).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    /// Minimum gap between units, milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_min_ms: Option<u64>,

    /// Maximum gap between units, milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_max_ms: Option<u64>,
}

/// Generation-loop settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Character budget for the conversation history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_max_chars: Option<usize>,

    /// How many recent own segments are embedded in each prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_recent: Option<usize>,

    /// Initial retry backoff, milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_initial_ms: Option<u64>,

    /// Backoff ceiling, milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_max_ms: Option<u64>,
}

impl Config {
    /// Load config from a JSON5 file. A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::VoxcastError::Io)?;
        let config: Config = json5::from_str(&raw)
            .map_err(|e| crate::error::VoxcastError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Write config as pretty JSON.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn queue_capacity(&self) -> usize {
        self.session
            .as_ref()
            .and_then(|s| s.queue_capacity)
            .unwrap_or(3)
    }

    pub fn max_cpu_fraction(&self) -> f64 {
        self.session
            .as_ref()
            .and_then(|s| s.max_cpu_fraction)
            .unwrap_or(0.8)
    }

    pub fn transcript_dir(&self) -> PathBuf {
        self.session
            .as_ref()
            .and_then(|s| s.transcript_dir.as_ref())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("transcripts"))
    }

    pub fn model_binary(&self) -> String {
        self.model
            .as_ref()
            .and_then(|m| m.binary.clone())
            .unwrap_or_else(|| "ollama".into())
    }

    pub fn model_name(&self) -> String {
        self.model
            .as_ref()
            .and_then(|m| m.name.clone())
            .unwrap_or_else(|| "mistral-small".into())
    }

    pub fn tts_server_url(&self) -> String {
        self.tts
            .as_ref()
            .and_then(|t| t.server_url.clone())
            .unwrap_or_else(|| "http://localhost:5002".into())
    }

    pub fn tts_speaker_id(&self) -> Option<String> {
        self.tts.as_ref().and_then(|t| t.speaker_id.clone())
    }

    pub fn voice_speed(&self) -> f64 {
        self.tts.as_ref().and_then(|t| t.speed).unwrap_or(1.0)
    }

    pub fn voice_pitch(&self) -> f64 {
        self.tts.as_ref().and_then(|t| t.pitch).unwrap_or(1.0)
    }

    pub fn voice_volume(&self) -> f64 {
        self.tts.as_ref().and_then(|t| t.volume).unwrap_or(1.0)
    }

    pub fn words_per_minute(&self) -> u32 {
        self.tts
            .as_ref()
            .and_then(|t| t.words_per_minute)
            .unwrap_or(150)
    }

    pub fn audio_device(&self) -> Option<String> {
        self.audio.as_ref().and_then(|a| a.device.clone())
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio
            .as_ref()
            .and_then(|a| a.sample_rate)
            .unwrap_or(22_050)
    }

    /// (min, max) inter-unit gap in milliseconds; min never exceeds max.
    pub fn unit_gap_ms(&self) -> (u64, u64) {
        let min = self.audio.as_ref().and_then(|a| a.gap_min_ms).unwrap_or(100);
        let max = self.audio.as_ref().and_then(|a| a.gap_max_ms).unwrap_or(300);
        (min.min(max), max.max(min))
    }

    pub fn history_max_chars(&self) -> usize {
        self.generation
            .as_ref()
            .and_then(|g| g.history_max_chars)
            .unwrap_or(12_000)
    }

    pub fn history_recent(&self) -> usize {
        self.generation
            .as_ref()
            .and_then(|g| g.history_recent)
            .unwrap_or(5)
    }

    pub fn backoff_initial_ms(&self) -> u64 {
        self.generation
            .as_ref()
            .and_then(|g| g.backoff_initial_ms)
            .unwrap_or(250)
    }

    pub fn backoff_max_ms(&self) -> u64 {
        self.generation
            .as_ref()
            .and_then(|g| g.backoff_max_ms)
            .unwrap_or(5_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queue_capacity(), 3);
        assert_eq!(config.sample_rate(), 22_050);
        assert_eq!(config.max_cpu_fraction(), 0.8);
        assert_eq!(config.model_binary(), "ollama");
        assert_eq!(config.unit_gap_ms(), (100, 300));
        assert_eq!(config.history_max_chars(), 12_000);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/voxcast.json")).unwrap();
        assert_eq!(config.queue_capacity(), 3);
    }

    #[test]
    fn test_parse_overrides() {
        let raw = r#"{
            session: { queue_capacity: 5, max_cpu_fraction: 0.5 },
            tts: { speaker_id: "p225", speed: 0.85 },
            audio: { gap_min_ms: 50, gap_max_ms: 150 },
        }"#;
        let config: Config = json5::from_str(raw).unwrap();
        assert_eq!(config.queue_capacity(), 5);
        assert_eq!(config.max_cpu_fraction(), 0.5);
        assert_eq!(config.tts_speaker_id().as_deref(), Some("p225"));
        assert_eq!(config.voice_speed(), 0.85);
        assert_eq!(config.unit_gap_ms(), (50, 150));
    }

    #[test]
    fn test_gap_range_is_ordered() {
        let raw = r#"{ audio: { gap_min_ms: 400, gap_max_ms: 100 } }"#;
        let config: Config = json5::from_str(raw).unwrap();
        let (min, max) = config.unit_gap_ms();
        assert!(min <= max);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxcast.json");
        let mut config = Config::default();
        config.session = Some(SessionConfig {
            queue_capacity: Some(7),
            ..Default::default()
        });
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.queue_capacity(), 7);
    }
}
