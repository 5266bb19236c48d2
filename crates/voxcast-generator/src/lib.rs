//! Text generation — personas, prompts, cleaning, throttling, and the
//! generation worker loop.

pub mod clean;
pub mod persona;
pub mod prompt;
pub mod throttle;
pub mod worker;

pub use persona::Character;
pub use worker::{spawn_generator, GeneratorConfig, GeneratorSummary};
