//! Euler integration of movement

use std::any::Any;

use super::System;
use crate::ecs::World;
use crate::error::Result;
use crate::geometry::Vec2d;

/// Applies movement to position using Euler's method.
///
/// For every entity in both the position and movement components:
///
/// ```text
/// velocity += accel * dt
/// xy       += velocity * dt
/// angle    += rotation * dt
/// ```
///
/// The previous values are kept in `last_velocity`, `last_xy` and
/// `last_angle`.
#[derive(Debug, Clone)]
pub struct EulerMovement {
    pub position_component: String,
    pub movement_component: String,
}

impl Default for EulerMovement {
    fn default() -> Self {
        Self::new("position", "movement")
    }
}

impl EulerMovement {
    #[must_use]
    pub fn new(position_component: &str, movement_component: &str) -> Self {
        Self {
            position_component: position_component.to_string(),
            movement_component: movement_component.to_string(),
        }
    }
}

impl System for EulerMovement {
    fn step(&mut self, world: &mut World, dt: f64) -> Result<()> {
        let entities = world.entities_in(&[
            self.position_component.as_str(),
            self.movement_component.as_str(),
        ])?;

        let movement = world.component_mut(&self.movement_component)?;
        let mut moves = Vec::with_capacity(entities.len());
        for entity in entities.iter() {
            let velocity = movement.get_field(entity, "velocity")?.as_vec2().unwrap_or_default();
            let accel = movement.get_field(entity, "accel")?.as_vec2().unwrap_or_default();
            let rotation = movement.get_field(entity, "rotation")?.as_f64().unwrap_or_default();
            let new_velocity = velocity + accel * dt;
            movement.set(
                entity,
                [
                    ("last_velocity", velocity.into()),
                    ("velocity", new_velocity.into()),
                ],
            )?;
            moves.push((entity, new_velocity, rotation));
        }

        let position = world.component_mut(&self.position_component)?;
        for (entity, velocity, rotation) in moves {
            let xy: Vec2d = position.get_field(entity, "xy")?.as_vec2().unwrap_or_default();
            let angle = position.get_field(entity, "angle")?.as_f64().unwrap_or_default();
            position.set(
                entity,
                [
                    ("last_xy", xy.into()),
                    ("xy", (xy + velocity * dt).into()),
                    ("last_angle", angle.into()),
                    ("angle", (angle + rotation * dt).into()),
                ],
            )?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
