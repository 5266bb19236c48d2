//! Real-time audio playback — device selection, output sink, and the
//! playback worker.

pub mod device;
pub mod sink;
pub mod worker;

pub use device::{find_output_device, list_output_devices, playback_channels, OutputDeviceInfo};
pub use sink::{AudioOutput, CpalOutput};
pub use worker::{spawn_player, OutputFactory, PlayerConfig, PlayerSummary};
