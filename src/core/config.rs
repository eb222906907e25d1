//! Configuration
//!
//! World and engine settings are plain serde structs with builder methods.
//! Both can be saved to and loaded from RON or JSON files through the
//! [`ConfigFile`] trait.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GreaseError, Result};

/// Load and save a serde type as RON or JSON.
pub trait ConfigFile: Serialize + DeserializeOwned {
    /// Save to a RON file
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::Config`] if the file cannot be written or
    /// serialization fails
    fn save_ron(&self, path: impl AsRef<Path>) -> Result<()> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GreaseError::Config(format!("serialization error: {e}")))?;
        fs::write(path, ron_string).map_err(|e| GreaseError::Config(format!("IO error: {e}")))
    }

    /// Load from a RON file
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::Config`] if the file cannot be read or
    /// deserialization fails
    fn load_ron(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GreaseError::Config(format!("IO error: {e}")))?;
        ron::from_str(&content)
            .map_err(|e| GreaseError::Config(format!("deserialization error: {e}")))
    }

    /// Save to a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::Config`] if the file cannot be written or
    /// serialization fails
    fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| GreaseError::Config(format!("serialization error: {e}")))?;
        fs::write(path, json_string).map_err(|e| GreaseError::Config(format!("IO error: {e}")))
    }

    /// Load from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::Config`] if the file cannot be read or
    /// deserialization fails
    fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GreaseError::Config(format!("IO error: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| GreaseError::Config(format!("deserialization error: {e}")))
    }
}

// ============================================================================
// World Configuration
// ============================================================================

/// Settings of a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Time steps per second
    pub step_rate: f64,
    /// Longest step, in multiples of the step interval, before `dt` is clamped
    pub max_dt_steps: f64,
    /// Whether the world clock starts running
    pub running: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            step_rate: 60.0,
            max_dt_steps: 10.0,
            running: true,
        }
    }
}

impl WorldConfig {
    /// Set the step rate
    #[must_use]
    pub fn with_step_rate(mut self, step_rate: f64) -> Self {
        self.step_rate = step_rate;
        self
    }

    /// Set the step clamp factor
    #[must_use]
    pub fn with_max_dt_steps(mut self, factor: f64) -> Self {
        self.max_dt_steps = factor;
        self
    }

    /// Start paused or running
    #[must_use]
    pub fn with_running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    /// Longest time step a world with this config will execute
    #[must_use]
    pub fn max_dt(&self) -> f64 {
        self.max_dt_steps / self.step_rate
    }
}

impl ConfigFile for WorldConfig {}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Settings of the engine loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Application title, used in logs
    pub title: String,
    /// Target frames per second (0 for unlimited)
    pub target_fps: u32,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Use a fixed frame time instead of measuring wall time
    pub fixed_dt: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("bGrease"),
            target_fps: 60,
            max_frames: None,
            fixed_dt: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with a title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set target FPS
    #[must_use]
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    /// Stop after a number of frames
    #[must_use]
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Advance time by a constant amount per frame
    #[must_use]
    pub fn with_fixed_dt(mut self, dt: f64) -> Self {
        self.fixed_dt = Some(dt);
        self
    }
}

impl ConfigFile for EngineConfig {}
