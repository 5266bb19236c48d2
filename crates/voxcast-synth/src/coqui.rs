//! Coqui TTS server adapter — fetches WAV audio over HTTP.

use std::io::Cursor;

use async_trait::async_trait;
use tracing::debug;

use voxcast_core::types::VoiceStyle;

use crate::SpeechEngine;

/// Speech engine backed by a local Coqui-style TTS server.
pub struct CoquiHttpEngine {
    client: reqwest::Client,
    base_url: String,
    sample_rate: u32,
}

impl CoquiHttpEngine {
    pub fn new(base_url: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            sample_rate,
        }
    }

    fn tts_url(&self) -> String {
        format!("{}/api/tts", self.base_url.trim_end_matches('/'))
    }

    /// Decode a WAV payload into mono f32 samples.
    fn decode_wav(bytes: &[u8]) -> anyhow::Result<(Vec<f32>, u32)> {
        let reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => {
                reader.into_samples::<f32>().collect::<Result<_, _>>()?
            }
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let mono = if spec.channels == 2 {
            crate::wave::stereo_to_mono(&samples)
        } else {
            samples
        };

        Ok((mono, spec.sample_rate))
    }
}

#[async_trait]
impl SpeechEngine for CoquiHttpEngine {
    fn id(&self) -> &str {
        "coqui"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn synthesize(&self, text: &str, style: &VoiceStyle) -> anyhow::Result<Vec<f32>> {
        let mut query: Vec<(&str, String)> = vec![
            ("text", text.to_string()),
            ("speed", format!("{:.2}", style.speed)),
        ];
        if let Some(ref speaker) = style.speaker_id {
            query.push(("speaker_id", speaker.clone()));
        }

        debug!(text_len = text.len(), speaker = ?style.speaker_id, "Requesting synthesis");

        let resp = self
            .client
            .get(self.tts_url())
            .query(&query)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("TTS server error {status}: {body}");
        }

        let bytes = resp.bytes().await?;
        let (samples, wav_rate) = Self::decode_wav(&bytes)?;
        if wav_rate != self.sample_rate {
            anyhow::bail!(
                "TTS server produced {wav_rate} Hz audio, expected {}",
                self.sample_rate
            );
        }

        Ok(samples)
    }

    async fn probe(&self) -> anyhow::Result<()> {
        let resp = self
            .client
            .get(self.base_url.trim_end_matches('/'))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("TTS server unreachable at {}: {e}", self.base_url))?;

        if resp.status().is_server_error() {
            anyhow::bail!("TTS server unhealthy: {}", resp.status());
        }
        Ok(())
    }
}
