//! Entity identity
//!
//! Entities are plain values: a world id plus a generational entity id. The
//! entity id is a `(generation, block, index)` triple where the block is the
//! entity's kind, so entities of one kind are stored contiguously.
//!
//! # Example
//!
//! ```ignore
//! let ship = world.create_entity(ship_kind)?;
//! assert_eq!(ship.kind(), ship_kind);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Global counter for generating unique world ids
static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a world. Entities and sets remember the world they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(u64);

impl WorldId {
    /// Owner of components that have not been added to a world yet.
    pub const DETACHED: Self = Self(0);

    /// Allocate a new unique world id
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::DETACHED
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "World {}", self.0)
    }
}

/// Entity kind. The kind id doubles as the storage block of its entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KindId(pub u32);

impl KindId {
    /// The root kind every other kind descends from.
    pub const ROOT: Self = Self(0);
}

/// Generational entity id, unique among the live entities of a world.
///
/// Generation `0` is never issued; storage uses it to mark empty slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    /// Incremented every time the slot is reused
    pub generation: u32,
    /// Storage block, equal to the entity kind
    pub block: u32,
    /// Slot within the block
    pub index: u32,
}

impl EntityId {
    /// Create an id from its parts
    #[must_use]
    pub const fn new(generation: u32, block: u32, index: u32) -> Self {
        Self {
            generation,
            block,
            index,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.generation, self.block, self.index)
    }
}

/// An entity: an id scoped to a world.
///
/// Entities hold no data themselves. Their data lives in the components of
/// their world, keyed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    /// World the entity belongs to
    pub world: WorldId,
    /// Id within the world
    pub id: EntityId,
}

impl Entity {
    /// Create an entity handle
    #[must_use]
    pub const fn new(world: WorldId, id: EntityId) -> Self {
        Self { world, id }
    }

    /// Kind of the entity
    #[must_use]
    pub const fn kind(&self) -> KindId {
        KindId(self.id.block)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Entity id: {} of {}>", self.id, self.world)
    }
}

/// Per-kind id bookkeeping
#[derive(Debug, Default)]
struct KindIds {
    next_index: u32,
    recycled: Vec<EntityId>,
}

/// Allocates entity ids per kind, reusing recycled slots with a bumped
/// generation.
#[derive(Debug, Default)]
pub struct EntityIdGenerator {
    kinds: FxHashMap<u32, KindIds>,
}

impl EntityIdGenerator {
    /// Create a generator with no ids issued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue an id for a new entity of `kind`.
    ///
    /// A recycled slot whose generation cannot be bumped any further is
    /// retired and never handed out again.
    pub fn new_entity_id(&mut self, kind: KindId) -> EntityId {
        let ids = self.kinds.entry(kind.0).or_default();
        while let Some(old) = ids.recycled.pop() {
            match old.generation.checked_add(1) {
                Some(generation) => return EntityId::new(generation, old.block, old.index),
                None => log::debug!("Retiring exhausted entity slot {old}"),
            }
        }
        let index = ids.next_index;
        ids.next_index += 1;
        EntityId::new(1, kind.0, index)
    }

    /// Make an id available for reuse in a later generation.
    pub fn recycle(&mut self, id: EntityId) {
        self.kinds.entry(id.block).or_default().recycled.push(id);
    }

    /// Recycle several ids at once; they may be of different kinds.
    pub fn recycle_many(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        for id in ids {
            self.recycle(id);
        }
    }

    /// Number of ids waiting for reuse for `kind`
    #[must_use]
    pub fn recycled_count(&self, kind: KindId) -> usize {
        self.kinds.get(&kind.0).map_or(0, |ids| ids.recycled.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_share_block_per_kind() {
        let mut id_gen = EntityIdGenerator::new();
        let a = id_gen.new_entity_id(KindId(1));
        let b = id_gen.new_entity_id(KindId(1));
        let c = id_gen.new_entity_id(KindId(2));

        assert_eq!(a, EntityId::new(1, 1, 0));
        assert_eq!(b, EntityId::new(1, 1, 1));
        assert_eq!(c, EntityId::new(1, 2, 0));
    }

    #[test]
    fn test_recycled_ids_bump_generation() {
        let mut id_gen = EntityIdGenerator::new();
        let a = id_gen.new_entity_id(KindId(3));
        id_gen.recycle(a);
        assert_eq!(id_gen.recycled_count(KindId(3)), 1);

        let reused = id_gen.new_entity_id(KindId(3));
        assert_eq!(reused, EntityId::new(2, 3, 0));
        assert_eq!(id_gen.new_entity_id(KindId(3)), EntityId::new(1, 3, 1));
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let mut id_gen = EntityIdGenerator::new();
        let first = id_gen.new_entity_id(KindId(5));
        id_gen.recycle(EntityId::new(u32::MAX, first.block, first.index));

        let next = id_gen.new_entity_id(KindId(5));
        assert_eq!(next, EntityId::new(1, 5, 1));
        assert_eq!(id_gen.recycled_count(KindId(5)), 0);
    }

    #[test]
    fn test_recycle_many_mixed_kinds() {
        let mut id_gen = EntityIdGenerator::new();
        let a = id_gen.new_entity_id(KindId(1));
        let b = id_gen.new_entity_id(KindId(2));
        id_gen.recycle_many([a, b]);

        assert_eq!(id_gen.new_entity_id(KindId(2)).generation, 2);
        assert_eq!(id_gen.new_entity_id(KindId(1)).generation, 2);
    }

    #[test]
    fn test_entity_display_and_kind() {
        let world = WorldId::next();
        let entity = Entity::new(world, EntityId::new(1, 4, 7));

        assert_eq!(entity.kind(), KindId(4));
        assert_eq!(
            entity.to_string(),
            format!("<Entity id: (1, 4, 7) of World {}>", world.raw())
        );
    }

    #[test]
    fn test_world_ids_unique() {
        assert_ne!(WorldId::next(), WorldId::next());
        assert_ne!(WorldId::next(), WorldId::DETACHED);
    }
}
