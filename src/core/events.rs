//! Event queues and input events
//!
//! Worlds carry a double-buffered [`EventQueue`] of [`WorldEvent`]s so that
//! systems can report things that happened (collisions, deletions) without
//! knowing who consumes them. Events pushed during one world step become
//! readable during the next.
//!
//! [`InputEvent`]s flow the other way: the application feeds them to the
//! mode manager, which forwards them to the current mode and, for worlds,
//! to the world's systems.
//!
//! # Example
//!
//! ```ignore
//! // In a collision handler
//! world.events_mut().push(WorldEvent::Collision { entity_a, entity_b, point, normal });
//!
//! // In a system, one step later
//! for event in world.events().iter() {
//!     if let WorldEvent::Collision { entity_a, .. } = event {
//!         explode(*entity_a);
//!     }
//! }
//! ```

use std::ops::BitOr;

use crate::ecs::Entity;
use crate::geometry::Vec2d;

// ============================================================================
// World Events
// ============================================================================

/// Things that happened in a world.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum WorldEvent {
    /// Two entities collided.
    Collision {
        /// First entity in collision
        entity_a: Entity,
        /// Second entity in collision
        entity_b: Entity,
        /// Contact point
        point: Vec2d,
        /// Contact normal pointing from `entity_a` to `entity_b`
        normal: Vec2d,
    },

    /// An entity was removed from the world.
    EntityDeleted {
        /// The deleted entity
        entity: Entity,
    },

    /// Application-defined event.
    Custom {
        /// Event name
        name: String,
        /// Entity involved, if any
        entity: Option<Entity>,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// World event queue with a write side and a read side.
///
/// [`EventQueue::swap`] publishes what was pushed since the last swap and
/// discards what was read.
#[derive(Debug, Default)]
pub struct EventQueue {
    incoming: Vec<WorldEvent>,
    published: Vec<WorldEvent>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event; it becomes readable after the next swap
    pub fn push(&mut self, event: WorldEvent) {
        self.incoming.push(event);
    }

    /// Publish the queued events, dropping the previously published ones
    pub fn swap(&mut self) {
        self.published = std::mem::take(&mut self.incoming);
    }

    /// Published events in push order
    pub fn iter(&self) -> std::slice::Iter<'_, WorldEvent> {
        self.published.iter()
    }

    /// Published collisions as `(entity_a, entity_b)` pairs
    pub fn collisions(&self) -> impl Iterator<Item = (Entity, Entity)> + '_ {
        self.published.iter().filter_map(|event| match event {
            WorldEvent::Collision { entity_a, entity_b, .. } => Some((*entity_a, *entity_b)),
            _ => None,
        })
    }

    /// Take the published events, leaving nothing to read
    pub fn take(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.published)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }

    /// Number of published events
    #[must_use]
    pub fn len(&self) -> usize {
        self.published.len()
    }

    /// Number of events waiting for the next swap
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.incoming.len()
    }

    /// Drop published and waiting events
    pub fn clear(&mut self) {
        self.incoming.clear();
        self.published.clear();
    }
}

// ============================================================================
// Input Events
// ============================================================================

/// Keyboard key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Space bar
    Space,
    /// Return
    Enter,
    /// Escape
    Escape,
    /// Tab
    Tab,
    /// Printable character key
    Char(char),
    /// Function key F1..F24
    F(u8),
    /// Platform key code without a named variant
    Code(u32),
}

/// Modifier key state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    /// No modifiers held
    pub const NONE: Self = Self(0);
    /// Shift
    pub const SHIFT: Self = Self(1);
    /// Control
    pub const CTRL: Self = Self(1 << 1);
    /// Alt / Option
    pub const ALT: Self = Self(1 << 2);
    /// Super / Command
    pub const SUPER: Self = Self(1 << 3);

    /// Check if all modifiers of `other` are held
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Input delivered to the current mode
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum InputEvent {
    /// A key went down
    KeyPress {
        /// Key pressed
        key: Key,
        /// Modifiers held
        modifiers: Modifiers,
    },
    /// A key went up
    KeyRelease {
        /// Key released
        key: Key,
        /// Modifiers held
        modifiers: Modifiers,
    },
    /// The pointer moved
    MouseMotion {
        /// Pointer position in world units
        position: Vec2d,
    },
    /// Application-defined input
    Custom(String),
}

// ============================================================================
// Tests
// ============================================================================
