//! Circle narrow phase

use std::any::Any;
use std::fmt;

use super::{Contact, Pair, SapCollision};
use crate::ecs::{Entity, World};
use crate::error::Result;
use crate::geometry::{Rect, Vec2d};
use crate::systems::System;

/// Called with the colliding pairs after each step
pub type CollisionHandler = Box<dyn FnMut(&mut World, &[Pair]) -> Result<()>>;

/// Circle collision detection with a sweep and prune broad phase.
///
/// Each member's bounding box is fitted around its position and `radius`
/// before the broad phase runs. Broad phase pairs are kept if their circles
/// overlap, and the handlers are then called in order with the result.
pub struct Circular {
    pub collision_component: String,
    pub position_component: String,
    /// Fit member bounding boxes to their circles before the broad phase
    pub update_aabbs: bool,
    broad_phase: SapCollision,
    handlers: Vec<CollisionHandler>,
    pairs: Vec<Pair>,
}

impl fmt::Debug for Circular {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circular")
            .field("collision_component", &self.collision_component)
            .field("position_component", &self.position_component)
            .field("update_aabbs", &self.update_aabbs)
            .field("handlers", &self.handlers.len())
            .field("pairs", &self.pairs.len())
            .finish_non_exhaustive()
    }
}

impl Default for Circular {
    fn default() -> Self {
        Self::new("collision", "position")
    }
}

impl Circular {
    #[must_use]
    pub fn new(collision_component: &str, position_component: &str) -> Self {
        Self {
            collision_component: collision_component.to_string(),
            position_component: position_component.to_string(),
            update_aabbs: true,
            broad_phase: SapCollision::new(collision_component),
            handlers: Vec::new(),
            pairs: Vec::new(),
        }
    }

    /// Add a handler, builder style
    #[must_use]
    pub fn with_handler(
        mut self,
        handler: impl FnMut(&mut World, &[Pair]) -> Result<()> + 'static,
    ) -> Self {
        self.add_handler(handler);
        self
    }

    pub fn add_handler(
        &mut self,
        handler: impl FnMut(&mut World, &[Pair]) -> Result<()> + 'static,
    ) {
        self.handlers.push(Box::new(handler));
    }

    /// Colliding pairs found by the last step, with contact info
    #[must_use]
    pub fn collision_pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// The broad phase
    #[must_use]
    pub const fn broad_phase(&self) -> &SapCollision {
        &self.broad_phase
    }

    /// Entities whose circle contains `point`, as of the last step
    ///
    /// # Errors
    ///
    /// Returns an error if the position component is missing.
    pub fn query_point(&self, world: &World, point: Vec2d) -> Result<Vec<Entity>> {
        let mut hits = Vec::new();
        for entity in self.broad_phase.query_point(point) {
            if let Some((center, radius)) = self.circle(world, entity)?
                && center.distance(point) <= radius
            {
                hits.push(entity);
            }
        }
        Ok(hits)
    }

    fn circle(&self, world: &World, entity: Entity) -> Result<Option<(Vec2d, f64)>> {
        let position = world.component(&self.position_component)?;
        let collision = world.component(&self.collision_component)?;
        let center = position.get_field(entity, "xy").ok().and_then(|v| v.as_vec2());
        let radius = collision.get_field(entity, "radius").ok().and_then(|v| v.as_f64());
        Ok(center.zip(radius))
    }

    fn fit_aabbs(&self, world: &mut World) -> Result<()> {
        let members = world.entities_in(&[
            self.collision_component.as_str(),
            self.position_component.as_str(),
        ])?;
        let mut boxes = Vec::with_capacity(members.len());
        {
            let position = world.component(&self.position_component)?;
            let collision = world.component(&self.collision_component)?;
            for entity in members.iter() {
                let center = position.get_field(entity, "xy")?.as_vec2().unwrap_or_default();
                let radius = collision.get_field(entity, "radius")?.as_f64().unwrap_or_default();
                boxes.push((entity, Rect::from_center(center, Vec2d::splat(radius))));
            }
        }
        let collision = world.component_mut(&self.collision_component)?;
        for (entity, aabb) in boxes {
            collision.set_field(entity, "aabb", aabb)?;
        }
        Ok(())
    }
}

impl System for Circular {
    fn step(&mut self, world: &mut World, _dt: f64) -> Result<()> {
        if self.update_aabbs {
            self.fit_aabbs(world)?;
        }
        self.broad_phase.update(world)?;

        let candidates = self.broad_phase.collision_pairs().to_vec();
        self.pairs.clear();
        for pair in candidates {
            let (Some((a, ra)), Some((b, rb))) =
                (self.circle(world, pair.a)?, self.circle(world, pair.b)?)
            else {
                continue;
            };
            let offset = b - a;
            let reach = ra + rb;
            if offset.length() < reach {
                let point = if reach > 0.0 { a + offset * (ra / reach) } else { a };
                self.pairs.push(pair.with_info(Contact {
                    point,
                    normal: offset.normalize_or_zero(),
                }));
            }
        }
        if !self.pairs.is_empty() {
            log::trace!("{} circle collisions", self.pairs.len());
        }

        for handler in &mut self.handlers {
            handler(world, &self.pairs)?;
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
