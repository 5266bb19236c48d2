//! Output-device enumeration and selection.

use cpal::traits::{DeviceTrait, HostTrait};

/// A selectable output device.
#[derive(Debug, Clone)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub max_channels: u16,
    pub default_sample_rate: u32,
}

/// Enumerate output devices on the default host.
pub fn list_output_devices() -> anyhow::Result<Vec<OutputDeviceInfo>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    for device in host.output_devices()? {
        let name = device.name().unwrap_or_else(|_| "<unknown>".into());
        match device.default_output_config() {
            Ok(config) => devices.push(OutputDeviceInfo {
                name,
                max_channels: config.channels(),
                default_sample_rate: config.sample_rate().0,
            }),
            Err(e) => {
                tracing::debug!(%name, %e, "Skipping device without output config");
            }
        }
    }

    Ok(devices)
}

/// Find a device whose name contains `needle` (case-insensitive), or the
/// host default when `needle` is `None`.
pub fn find_output_device(needle: Option<&str>) -> anyhow::Result<cpal::Device> {
    let host = cpal::default_host();

    match needle {
        Some(needle) => {
            let lowered = needle.to_lowercase();
            for device in host.output_devices()? {
                if let Ok(name) = device.name() {
                    if name.to_lowercase().contains(&lowered) {
                        return Ok(device);
                    }
                }
            }
            anyhow::bail!("no output device matching '{needle}'")
        }
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no default output device available")),
    }
}

/// Channel count used for playback on a device: stereo when the device
/// supports it, mono otherwise.
pub fn playback_channels(max_channels: u16) -> u16 {
    if max_channels >= 2 { 2 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_channels_caps_at_stereo() {
        assert_eq!(playback_channels(1), 1);
        assert_eq!(playback_channels(2), 2);
        assert_eq!(playback_channels(8), 2);
    }
}
