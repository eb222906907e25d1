//! A component-based 2D game engine
//!
//! This engine provides:
//! - Worlds of entities whose data lives in typed component fields
//! - Entity sets with set algebra and batch field access
//! - Systems and renderers run in order every world step
//! - Modes: a stack of worlds, menus or anything else with a clock
//! - Sweep and prune collision detection with a circle narrow phase
//! - Key bindings and a headless engine loop

pub mod collision;
pub mod core;
pub mod ecs;
pub mod error;
pub mod geometry;
pub mod input;
pub mod mode;
pub mod render;
pub mod systems;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::collision::{Circular, Pair, SapCollision, dispatch_events};
    pub use crate::core::{
        ConfigFile, Engine, EngineConfig, EngineContext, FrameStats, Game, InputEvent, Key,
        Modifiers, WorldConfig, WorldEvent,
    };
    pub use crate::ecs::{
        Component, Entity, EntitySet, FieldType, FieldValue, KindId, World, components,
    };
    pub use crate::error::{GreaseError, Result};
    pub use crate::geometry::{Rect, Rgba, Vec2d};
    pub use crate::input::KeyControls;
    pub use crate::mode::{Manager, Mode, ModeId, Multi};
    pub use crate::render::{DrawContext, RecordingContext, Renderer, VectorRenderer};
    pub use crate::systems::{EulerMovement, FnSystem, System};
}
