//! Core engine module
//!
//! The engine loop, configuration files, frame statistics and the events
//! flowing between the application and its worlds.

pub mod config;
mod debug;
mod engine;
pub mod events;

pub use config::{ConfigFile, EngineConfig, WorldConfig};
pub use debug::FrameStats;
pub use engine::{Engine, EngineContext, Game};
pub use events::{EventQueue, InputEvent, Key, Modifiers, WorldEvent};
