//! Audio output sink — a cpal stream fed from a shared sample buffer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, StreamTrait};
use tracing::{debug, warn};

/// Abstraction over the real-time output so the playback worker can be
/// driven by a mock in tests.
pub trait AudioOutput {
    /// Queue interleaved samples for rendering.
    fn write(&mut self, samples: &[f32]);

    /// Samples queued but not yet rendered. 0 means the current unit has
    /// finished playing.
    fn pending(&self) -> usize;

    /// Drop everything queued, silencing the device immediately.
    fn clear(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);
}

/// Real output device backed by a cpal stream.
///
/// The stream callback drains the shared buffer at the device's real-time
/// rate and zero-fills when the buffer runs dry, so an underrun produces
/// silence rather than an error.
pub struct CpalOutput {
    stream: cpal::Stream,
    buffer: Arc<Mutex<VecDeque<f32>>>,
    paused: bool,
}

impl CpalOutput {
    /// Open an output stream on `device` with a fixed format.
    ///
    /// Fails when the device rejects the stream configuration; such setup
    /// failures are fatal to session startup.
    pub fn open(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
        volume: f64,
    ) -> anyhow::Result<Self> {
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let buffer: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let cb_buffer = buffer.clone();
        let gain = volume.clamp(0.0, 1.0) as f32;

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut buf = match cb_buffer.lock() {
                    Ok(buf) => buf,
                    Err(poisoned) => poisoned.into_inner(),
                };
                for sample in data.iter_mut() {
                    *sample = buf.pop_front().unwrap_or(0.0) * gain;
                }
            },
            |e| warn!(%e, "Audio stream error"),
            None,
        )?;
        stream.play()?;

        debug!(sample_rate, channels, "Output stream opened");
        Ok(Self {
            stream,
            buffer,
            paused: false,
        })
    }

    fn lock_buffer(&self) -> std::sync::MutexGuard<'_, VecDeque<f32>> {
        match self.buffer.lock() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl AudioOutput for CpalOutput {
    fn write(&mut self, samples: &[f32]) {
        self.lock_buffer().extend(samples.iter().copied());
    }

    fn pending(&self) -> usize {
        self.lock_buffer().len()
    }

    fn clear(&mut self) {
        self.lock_buffer().clear();
    }

    fn pause(&mut self) {
        if !self.paused {
            if let Err(e) = self.stream.pause() {
                warn!(%e, "Failed to pause output stream");
            }
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        if self.paused {
            if let Err(e) = self.stream.play() {
                warn!(%e, "Failed to resume output stream");
            }
            self.paused = false;
        }
    }
}
