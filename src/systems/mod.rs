//! Systems
//!
//! Systems hold the behaviour of a world. Every world step runs each system in
//! order after the components have stepped. A system is lent the world
//! mutably while it runs, so it can create and delete entities, change
//! component data, or add and remove other systems.

mod integrator;

pub use integrator::EulerMovement;

use std::any::Any;

use crate::core::events::InputEvent;
use crate::ecs::{Part, World, WorldId};
use crate::error::Result;

/// Behaviour run every world step
pub trait System: Any {
    /// Called when the system is set on a world
    fn attach(&mut self, _world: WorldId) {}

    /// Execute one time step
    ///
    /// # Errors
    ///
    /// Errors abort the world step and propagate to the caller.
    fn step(&mut self, world: &mut World, dt: f64) -> Result<()>;

    /// Handle an input event while the world is active. Return `true` to stop
    /// the event from reaching later systems.
    ///
    /// # Errors
    ///
    /// Errors stop event propagation and are returned to the caller.
    fn on_event(&mut self, _world: &mut World, _event: &InputEvent) -> Result<bool> {
        Ok(false)
    }

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Part for dyn System {
    fn attach(&mut self, world: WorldId) {
        System::attach(self, world);
    }
}

/// A system running a closure every step
pub struct FnSystem<F>(pub F);

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World, f64) -> Result<()> + 'static,
{
    fn step(&mut self, world: &mut World, dt: f64) -> Result<()> {
        (self.0)(world, dt)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
