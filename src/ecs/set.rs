//! Entity sets
//!
//! An [`EntitySet`] stores one generation number per slot, organised in
//! per-kind blocks indexed like entity ids. A slot holding `0` is empty. An
//! entity is a member when its world matches and its slot holds exactly its
//! generation, so a stale handle to a recycled slot is never a member.
//!
//! Set algebra works block by block on the generation numbers:
//!
//! - intersection keeps slots whose generations are equal
//! - union keeps the newer generation of each slot
//! - difference keeps a slot only if it is newer than the other set's slot

use std::collections::BTreeMap;
use std::ops::{BitAnd, BitOr, Sub};

use super::block::grow;
use super::{Entity, EntityId, WorldId};
use crate::error::{GreaseError, Result};

/// Generation stored in `block` at `index`, `0` when out of range.
#[inline]
fn slot(block: &[u32], index: usize) -> u32 {
    block.get(index).copied().unwrap_or(0)
}

/// A set of entities belonging to one world.
#[derive(Debug, Clone, Default)]
pub struct EntitySet {
    world: WorldId,
    blocks: BTreeMap<u32, Vec<u32>>,
}

impl EntitySet {
    /// Create an empty set for `world`
    #[must_use]
    pub fn new(world: WorldId) -> Self {
        Self {
            world,
            blocks: BTreeMap::new(),
        }
    }

    /// Build a set from entities, which must all belong to `world`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if an entity is from another world.
    pub fn from_entities(
        world: WorldId,
        entities: impl IntoIterator<Item = Entity>,
    ) -> Result<Self> {
        let mut set = Self::new(world);
        for entity in entities {
            set.add(entity)?;
        }
        Ok(set)
    }

    /// World the set belongs to
    #[must_use]
    pub const fn world(&self) -> WorldId {
        self.world
    }

    /// Create a new empty set of the same world
    #[must_use]
    pub fn new_empty(&self) -> Self {
        Self::new(self.world)
    }

    /// Move the set to another world, dropping its members.
    pub(crate) fn reset_world(&mut self, world: WorldId) {
        self.world = world;
        self.blocks.clear();
    }

    fn check_world(&self, other: &EntitySet) -> Result<()> {
        if self.world == other.world {
            Ok(())
        } else {
            Err(GreaseError::DifferentWorld)
        }
    }

    /// Add an entity to the set.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the entity is from another world.
    pub fn add(&mut self, entity: Entity) -> Result<()> {
        if entity.world != self.world {
            return Err(GreaseError::DifferentWorld);
        }
        let EntityId {
            generation,
            block: block_id,
            index,
        } = entity.id;
        let index = index as usize;
        let block = self.blocks.entry(block_id).or_default();
        grow(block, index + 1, 0);
        block[index] = generation;
        Ok(())
    }

    /// Remove an entity from the set.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchEntity`] if the entity is not a member.
    pub fn remove(&mut self, entity: Entity) -> Result<()> {
        if self.discard(entity) {
            Ok(())
        } else {
            Err(GreaseError::NoSuchEntity(entity.id))
        }
    }

    /// Remove an entity if it is a member. Returns whether it was.
    pub fn discard(&mut self, entity: Entity) -> bool {
        if entity.world != self.world {
            return false;
        }
        let index = entity.id.index as usize;
        match self.blocks.get_mut(&entity.id.block) {
            Some(block) if slot(block, index) == entity.id.generation => {
                block[index] = 0;
                true
            }
            _ => false,
        }
    }

    /// Check membership
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        entity.world == self.world
            && self
                .blocks
                .get(&entity.id.block)
                .is_some_and(|block| slot(block, entity.id.index as usize) == entity.id.generation)
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks
            .values()
            .map(|block| block.iter().filter(|&&g| g != 0).count())
            .sum()
    }

    /// Check if the set has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.values().all(|block| block.iter().all(|&g| g == 0))
    }

    /// Remove every member
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Iterate over the ids of the members in block and index order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.blocks.iter().flat_map(|(&block_id, block)| {
            block
                .iter()
                .enumerate()
                .filter(|&(_, &g)| g != 0)
                .map(move |(index, &g)| EntityId::new(g, block_id, index as u32))
        })
    }

    /// Iterate over the members in block and index order
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        let world = self.world;
        self.ids().map(move |id| Entity::new(world, id))
    }

    /// Entities in both sets.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the sets are from different worlds.
    pub fn intersection(&self, other: &EntitySet) -> Result<Self> {
        self.check_world(other)?;
        let mut result = self.new_empty();
        for (&block_id, block) in &self.blocks {
            let Some(other_block) = other.blocks.get(&block_id) else {
                continue;
            };
            let merged: Vec<u32> = block
                .iter()
                .zip(other_block)
                .map(|(&a, &b)| if a == b { a } else { 0 })
                .collect();
            if merged.iter().any(|&g| g != 0) {
                result.blocks.insert(block_id, merged);
            }
        }
        Ok(result)
    }

    /// Keep only entities also in `other`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the sets are from different worlds.
    pub fn intersection_update(&mut self, other: &EntitySet) -> Result<()> {
        *self = self.intersection(other)?;
        Ok(())
    }

    /// Entities in either set. Where both sets hold the same slot the newer
    /// generation wins.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the sets are from different worlds.
    pub fn union(&self, other: &EntitySet) -> Result<Self> {
        let mut result = self.clone();
        result.update(other)?;
        Ok(result)
    }

    /// Add every entity of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the sets are from different worlds.
    pub fn update(&mut self, other: &EntitySet) -> Result<()> {
        self.check_world(other)?;
        for (&block_id, other_block) in &other.blocks {
            let block = self.blocks.entry(block_id).or_default();
            if block.len() < other_block.len() {
                block.resize(other_block.len(), 0);
            }
            for (g, &other_g) in block.iter_mut().zip(other_block) {
                *g = (*g).max(other_g);
            }
        }
        Ok(())
    }

    /// Entities in this set whose slot is not held by the same or a newer
    /// generation in `other`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the sets are from different worlds.
    pub fn difference(&self, other: &EntitySet) -> Result<Self> {
        self.check_world(other)?;
        let mut result = self.new_empty();
        for (&block_id, block) in &self.blocks {
            let kept: Vec<u32> = match other.blocks.get(&block_id) {
                Some(other_block) => block
                    .iter()
                    .enumerate()
                    .map(|(i, &g)| if g > slot(other_block, i) { g } else { 0 })
                    .collect(),
                None => block.clone(),
            };
            if kept.iter().any(|&g| g != 0) {
                result.blocks.insert(block_id, kept);
            }
        }
        Ok(result)
    }

    /// Remove every entity of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] if the sets are from different worlds.
    pub fn difference_update(&mut self, other: &EntitySet) -> Result<()> {
        *self = self.difference(other)?;
        Ok(())
    }
}

impl PartialEq for EntitySet {
    /// Sets are equal when they have the same members; trailing empty slots
    /// and empty blocks are ignored.
    fn eq(&self, other: &Self) -> bool {
        if self.world != other.world {
            return false;
        }
        let empty: &[u32] = &[];
        self.blocks
            .keys()
            .chain(other.blocks.keys())
            .all(|block_id| {
                let a = self.blocks.get(block_id).map_or(empty, Vec::as_slice);
                let b = other.blocks.get(block_id).map_or(empty, Vec::as_slice);
                (0..a.len().max(b.len())).all(|i| slot(a, i) == slot(b, i))
            })
    }
}

impl Eq for EntitySet {}

impl BitAnd for &EntitySet {
    type Output = Result<EntitySet>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl BitOr for &EntitySet {
    type Output = Result<EntitySet>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl Sub for &EntitySet {
    type Output = Result<EntitySet>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(world: WorldId, generation: u32, block: u32, index: u32) -> Entity {
        Entity::new(world, EntityId::new(generation, block, index))
    }

    #[test]
    fn test_add_contains_remove() {
        let world = WorldId::next();
        let mut set = EntitySet::new(world);
        let a = entity(world, 1, 0, 3);

        assert!(!set.contains(a));
        set.add(a).unwrap();
        assert!(set.contains(a));
        assert_eq!(set.len(), 1);

        set.remove(a).unwrap();
        assert!(!set.contains(a));
        assert!(set.is_empty());
        assert_eq!(set.remove(a), Err(GreaseError::NoSuchEntity(a.id)));
    }

    #[test]
    fn test_stale_generation_is_not_member() {
        let world = WorldId::next();
        let mut set = EntitySet::new(world);
        set.add(entity(world, 2, 1, 0)).unwrap();

        assert!(!set.contains(entity(world, 1, 1, 0)));
        assert!(!set.discard(entity(world, 1, 1, 0)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_different_world_rejected() {
        let mut set = EntitySet::new(WorldId::next());
        let foreign = entity(WorldId::next(), 1, 0, 0);

        assert_eq!(set.add(foreign), Err(GreaseError::DifferentWorld));
        assert!(!set.contains(foreign));
        assert!(!set.discard(foreign));

        let other = EntitySet::new(WorldId::next());
        assert_eq!(set.union(&other), Err(GreaseError::DifferentWorld));
        assert_eq!(set.intersection_update(&other), Err(GreaseError::DifferentWorld));
    }

    #[test]
    fn test_iter_in_block_order() {
        let world = WorldId::next();
        let b = entity(world, 1, 2, 0);
        let a1 = entity(world, 1, 1, 5);
        let a0 = entity(world, 3, 1, 1);
        let set = EntitySet::from_entities(world, [b, a1, a0]).unwrap();

        assert_eq!(set.iter().collect::<Vec<_>>(), vec![a0, a1, b]);
    }

    #[test]
    fn test_equality_ignores_padding() {
        let world = WorldId::next();
        let a = entity(world, 1, 0, 0);
        let far = entity(world, 1, 0, 50);
        let mut left = EntitySet::from_entities(world, [a, far]).unwrap();
        let right = EntitySet::from_entities(world, [a]).unwrap();

        assert_ne!(left, right);
        left.remove(far).unwrap();
        assert_eq!(left, right);

        let mut with_empty_block = right.clone();
        let other_kind = entity(world, 1, 9, 0);
        with_empty_block.add(other_kind).unwrap();
        with_empty_block.discard(other_kind);
        assert_eq!(with_empty_block, right);
    }

    #[test]
    fn test_intersection_matches_generations() {
        let world = WorldId::next();
        let shared = entity(world, 1, 0, 0);
        let left = EntitySet::from_entities(
            world,
            [shared, entity(world, 1, 0, 1), entity(world, 2, 0, 2)],
        )
        .unwrap();
        let right = EntitySet::from_entities(
            world,
            [shared, entity(world, 1, 0, 2), entity(world, 1, 1, 0)],
        )
        .unwrap();

        let both = (&left & &right).unwrap();
        assert_eq!(both.iter().collect::<Vec<_>>(), vec![shared]);
    }

    #[test]
    fn test_union_keeps_newer_generation() {
        let world = WorldId::next();
        let old = entity(world, 1, 0, 0);
        let new = entity(world, 2, 0, 0);
        let left = EntitySet::from_entities(world, [old, entity(world, 1, 0, 4)]).unwrap();
        let right = EntitySet::from_entities(world, [new, entity(world, 1, 3, 0)]).unwrap();

        let union = (&left | &right).unwrap();
        assert_eq!(union.len(), 3);
        assert!(union.contains(new));
        assert!(!union.contains(old));

        let mut updated = left.clone();
        updated.update(&right).unwrap();
        assert_eq!(updated, union);
    }

    #[test]
    fn test_difference_removes_same_or_newer() {
        let world = WorldId::next();
        let kept_newer = entity(world, 3, 0, 0);
        let removed_same = entity(world, 1, 0, 1);
        let removed_by_newer = entity(world, 1, 0, 2);
        let untouched_block = entity(world, 1, 5, 0);
        let left = EntitySet::from_entities(
            world,
            [kept_newer, removed_same, removed_by_newer, untouched_block],
        )
        .unwrap();
        let right = EntitySet::from_entities(
            world,
            [entity(world, 2, 0, 0), removed_same, entity(world, 2, 0, 2)],
        )
        .unwrap();

        let diff = (&left - &right).unwrap();
        assert_eq!(
            diff.iter().collect::<Vec<_>>(),
            vec![kept_newer, untouched_block]
        );

        let mut in_place = left;
        in_place.difference_update(&right).unwrap();
        assert_eq!(in_place, diff);
    }
}
