//! Collision detection
//!
//! [`SapCollision`] finds overlapping bounding boxes using sweep and prune.
//! [`Circular`] refines its pairs to overlapping circles and hands them to
//! collision handlers such as [`dispatch_events`].

mod circular;
mod pair;
mod sap;

pub use circular::{Circular, CollisionHandler};
pub use pair::{Contact, Pair};
pub use sap::{CollisionBox, SapCollision};

use crate::core::events::WorldEvent;
use crate::ecs::World;
use crate::error::Result;

/// Collision handler pushing a [`WorldEvent::Collision`] for each pair.
///
/// Pairs without contact info report the origin as the point and a zero
/// normal.
///
/// # Errors
///
/// Never fails; the signature matches [`CollisionHandler`].
pub fn dispatch_events(world: &mut World, pairs: &[Pair]) -> Result<()> {
    let events = world.events_mut();
    for pair in pairs {
        let contact = pair.info.unwrap_or(Contact {
            point: Default::default(),
            normal: Default::default(),
        });
        events.push(WorldEvent::Collision {
            entity_a: pair.a,
            entity_b: pair.b,
            point: contact.point,
            normal: contact.normal,
        });
    }
    Ok(())
}
