//! The world's own entity set
//!
//! [`WorldEntities`] tracks every live entity of a world and can resolve an
//! [`EntityId`] back to its [`Entity`]. It derefs to [`EntitySet`] for
//! queries and non-mutating set algebra. In-place set algebra is not
//! offered: entities leave the world through [`crate::ecs::World`] so that
//! components and kind sets stay consistent.

use std::collections::BTreeMap;
use std::ops::Deref;

use super::block::grow;
use super::{Entity, EntityId, EntitySet, WorldId};
use crate::error::{GreaseError, Result};

/// Set of all live entities in a world, with lookup by id.
#[derive(Debug, Clone, Default)]
pub struct WorldEntities {
    set: EntitySet,
    store: BTreeMap<u32, Vec<Option<Entity>>>,
}

impl WorldEntities {
    /// Create an empty store for `world`
    #[must_use]
    pub fn new(world: WorldId) -> Self {
        Self {
            set: EntitySet::new(world),
            store: BTreeMap::new(),
        }
    }

    /// Look up a live entity by id.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchEntity`] if no live entity has this id.
    pub fn get(&self, id: EntityId) -> Result<Entity> {
        self.store
            .get(&id.block)
            .and_then(|block| block.get(id.index as usize))
            .copied()
            .flatten()
            .filter(|entity| entity.id.generation == id.generation)
            .ok_or(GreaseError::NoSuchEntity(id))
    }

    /// Register a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the entity is from another world.
    pub fn add(&mut self, entity: Entity) -> Result<()> {
        self.set.add(entity)?;
        let index = entity.id.index as usize;
        let block = self.store.entry(entity.id.block).or_default();
        grow(block, index + 1, None);
        block[index] = Some(entity);
        Ok(())
    }

    /// Forget a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchEntity`] if the entity is not live.
    pub(crate) fn remove(&mut self, entity: Entity) -> Result<()> {
        self.set.remove(entity)?;
        if let Some(slot) = self
            .store
            .get_mut(&entity.id.block)
            .and_then(|block| block.get_mut(entity.id.index as usize))
        {
            *slot = None;
        }
        Ok(())
    }

    /// Forget every live member of `entities` in one pass and return them.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the set is from another world.
    pub(crate) fn discard_set(&mut self, entities: &EntitySet) -> Result<Vec<Entity>> {
        if entities.world() != self.set.world() {
            return Err(GreaseError::DifferentWorld);
        }
        let doomed: Vec<Entity> = entities.iter().filter(|e| self.set.contains(*e)).collect();
        for &entity in &doomed {
            self.remove(entity)?;
        }
        Ok(doomed)
    }

    /// Iterate over live entities
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.store.values().flatten().filter_map(|slot| *slot)
    }

    /// Iterate over live entities that are also in `entities`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the set is from another world.
    pub fn iter_intersection<'a>(
        &'a self,
        entities: &'a EntitySet,
    ) -> Result<impl Iterator<Item = Entity> + 'a> {
        if entities.world() != self.set.world() {
            return Err(GreaseError::DifferentWorld);
        }
        Ok(entities.iter().filter(move |e| self.set.contains(*e)))
    }

    /// The live entities as a plain set
    #[must_use]
    pub fn as_set(&self) -> &EntitySet {
        &self.set
    }
}

impl Deref for WorldEntities {
    type Target = EntitySet;

    fn deref(&self) -> &EntitySet {
        &self.set
    }
}
