//! Speech synthesis — engine abstraction and waveform post-processing.

use async_trait::async_trait;

use voxcast_core::types::VoiceStyle;

pub mod coqui;
pub mod wave;

pub use coqui::CoquiHttpEngine;

/// A text-to-speech backend producing mono float samples.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Engine identifier (e.g., "coqui").
    fn id(&self) -> &str;

    /// Sample rate of the produced audio.
    fn sample_rate(&self) -> u32;

    /// Synthesize one segment. Errors are transient: the caller logs,
    /// drops the unit, and moves on to the next cycle.
    async fn synthesize(&self, text: &str, style: &VoiceStyle) -> anyhow::Result<Vec<f32>>;

    /// Verify the engine is reachable before any worker starts.
    async fn probe(&self) -> anyhow::Result<()>;
}
