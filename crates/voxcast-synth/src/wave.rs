//! Waveform post-processing: normalization, channel reshaping, duration.

/// Normalize samples to peak amplitude 1.0, in place.
///
/// Returns `false` for an all-zero waveform, which has no defined peak to
/// divide by; such units are degenerate and get dropped by the caller.
pub fn normalize(samples: &mut [f32]) -> bool {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak == 0.0 {
        return false;
    }
    if peak != 1.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
    true
}

/// Reshape mono samples to the output channel count.
///
/// Mono stays as-is for a 1-channel device and is duplicated into an
/// interleaved stereo frame for a 2-channel device.
pub fn reshape_mono(samples: Vec<f32>, channels: u16) -> Vec<f32> {
    match channels {
        2 => {
            let mut out = Vec::with_capacity(samples.len() * 2);
            for s in samples {
                out.push(s);
                out.push(s);
            }
            out
        }
        _ => samples,
    }
}

/// Average an interleaved stereo waveform down to mono.
pub fn stereo_to_mono(samples: &[f32]) -> Vec<f32> {
    samples
        .chunks_exact(2)
        .map(|frame| (frame[0] + frame[1]) / 2.0)
        .collect()
}

/// Words-per-minute duration estimate, for pre-flight pacing only.
///
/// The post-synthesis duration derived from the sample count always
/// supersedes this for termination accounting.
pub fn estimate_duration(text: &str, words_per_minute: u32) -> f64 {
    let words = text.split_whitespace().count();
    words as f64 * 60.0 / words_per_minute.max(1) as f64
}
