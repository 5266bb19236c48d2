//! Session orchestration — controller, transcript, and progress reporting.

pub mod controller;
pub mod progress;
pub mod transcript;

pub use controller::{Controller, SessionOptions, SessionReport};
pub use progress::spawn_reporter;
pub use transcript::Transcript;
