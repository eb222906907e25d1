//! Collision pairs

use std::hash::{Hash, Hasher};

use crate::ecs::Entity;
use crate::geometry::Vec2d;

/// Contact details filled in by a narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Point of contact
    pub point: Vec2d,
    /// Unit normal pointing from the first entity to the second
    pub normal: Vec2d,
}

/// Two colliding entities.
///
/// Pairs are unordered: `Pair::new(a, b) == Pair::new(b, a)` and both hash
/// the same. Contact info is ignored by comparison.
#[derive(Debug, Clone, Copy)]
pub struct Pair {
    pub a: Entity,
    pub b: Entity,
    pub info: Option<Contact>,
}

impl Pair {
    #[must_use]
    pub const fn new(a: Entity, b: Entity) -> Self {
        Self { a, b, info: None }
    }

    /// The pair with contact info attached
    #[must_use]
    pub fn with_info(mut self, info: Contact) -> Self {
        self.info = Some(info);
        self
    }

    /// Both entities in order
    #[must_use]
    pub const fn entities(&self) -> (Entity, Entity) {
        (self.a, self.b)
    }

    /// Check if `entity` is part of the pair
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.a == entity || self.b == entity
    }

    /// The entity colliding with `entity`
    #[must_use]
    pub fn other(&self, entity: Entity) -> Option<Entity> {
        if self.a == entity {
            Some(self.b)
        } else if self.b == entity {
            Some(self.a)
        } else {
            None
        }
    }

    fn ordered(&self) -> (Entity, Entity) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for Pair {}

impl Hash for Pair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}
