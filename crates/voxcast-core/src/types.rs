//! Core value types shared across the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxcastError};

/// One generated-and-synthesized segment, handed from the generation stage
/// to the playback stage through the bounded queue.
#[derive(Debug, Clone)]
pub struct ContentUnit {
    /// Cleaned spoken text. Never empty for an enqueued unit.
    pub text: String,
    /// Interleaved float samples, normalized to peak amplitude 1.0.
    pub samples: Vec<f32>,
    /// Playback duration derived from the sample count, always > 0.
    pub duration_seconds: f64,
    /// Monotonic index assigned at creation, used for transcript ordering.
    pub sequence: u64,
    /// Character label the unit was generated for.
    pub speaker: String,
}

impl ContentUnit {
    /// Build a unit, rejecting empty text and zero-length audio so that
    /// degenerate units can never reach the queue.
    pub fn new(
        sequence: u64,
        speaker: impl Into<String>,
        text: impl Into<String>,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(VoxcastError::Synthesis("unit has empty text".into()));
        }
        if sample_rate == 0 || channels == 0 {
            return Err(VoxcastError::Synthesis(format!(
                "invalid audio format: {sample_rate} Hz, {channels} channels"
            )));
        }
        let frames = samples.len() / channels as usize;
        let duration_seconds = frames as f64 / sample_rate as f64;
        if duration_seconds <= 0.0 {
            return Err(VoxcastError::Synthesis("unit has no audio".into()));
        }
        Ok(Self {
            text,
            samples,
            duration_seconds,
            sequence,
            speaker: speaker.into(),
        })
    }

    /// Transcript line for this unit.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }
}

/// Synthesis parameters applied to one unit.
///
/// Selected once per session and adjusted per unit by the detected
/// [`Emotion`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    pub speed: f64,
    pub pitch: f64,
    pub volume: f64,
}

impl Default for VoiceStyle {
    fn default() -> Self {
        Self {
            speaker_id: None,
            speed: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl VoiceStyle {
    /// Derive the per-unit style for a detected emotion.
    pub fn with_emotion(&self, emotion: Emotion) -> Self {
        let (speed_factor, pitch_factor) = emotion.style_factors();
        Self {
            speaker_id: self.speaker_id.clone(),
            speed: self.speed * speed_factor,
            pitch: self.pitch * pitch_factor,
            volume: self.volume,
        }
    }
}

/// Finite emotion vocabulary for voice-style adjustment.
///
/// A closed enum rather than a free-form tag map: unknown names fail at
/// parse time instead of silently defaulting deep in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
}

impl Emotion {
    /// (speed, pitch) multipliers applied on top of the session style.
    pub fn style_factors(self) -> (f64, f64) {
        match self {
            Emotion::Neutral => (1.0, 1.0),
            Emotion::Happy => (1.05, 1.1),
            Emotion::Sad => (0.9, 0.95),
            Emotion::Angry => (1.1, 1.05),
        }
    }
}

impl std::str::FromStr for Emotion {
    type Err = VoxcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "neutral" => Ok(Emotion::Neutral),
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "angry" => Ok(Emotion::Angry),
            other => Err(VoxcastError::Config(format!("unknown emotion: {other}"))),
        }
    }
}

/// Best-effort progress record pushed after every completed unit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub elapsed_output_seconds: f64,
    /// 0 when the session is not duration-bounded.
    pub target_seconds: f64,
    pub units_completed: u64,
    /// 0 when the session is not count-bounded.
    pub target_units: u64,
}
