//! Named, ordered world parts
//!
//! A world keeps its components, systems and renderers in [`Parts`]
//! collections. Parts run in the order they were added unless inserted at a
//! specific position. Setting a part under an existing name replaces it in
//! place.
//!
//! During a world step each system is lent out of its slot with
//! [`Parts::take`] and put back with [`Parts::restore`], so a system can
//! freely mutate the world (and its systems) while it runs.

use super::WorldId;
use crate::error::{GreaseError, Result};

/// Names that would shadow world attributes.
const RESERVED_NAMES: &[&str] = &["entities", "entity_id", "world"];

/// Names of the collection's own operations.
const OPERATION_NAMES: &[&str] = &[
    "set", "insert", "remove", "get", "get_mut", "join", "iter", "len", "names", "take", "restore",
];

/// A value that can live in a [`Parts`] collection.
pub trait Part {
    /// Called when the part is added to a world's collection
    fn attach(&mut self, _world: WorldId) {}
}

/// Where to insert a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Before the part with this name
    Before(String),
    /// At this position
    Index(usize),
}

impl Placement {
    /// Build a placement from optional `before` and `index` arguments,
    /// exactly one of which must be given.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::InvalidPlacement`] if both or neither are given.
    pub fn from_options(before: Option<&str>, index: Option<usize>) -> Result<Self> {
        match (before, index) {
            (Some(name), None) => Ok(Self::Before(name.to_string())),
            (None, Some(index)) => Ok(Self::Index(index)),
            _ => Err(GreaseError::InvalidPlacement),
        }
    }
}

/// Check that a part name is usable.
///
/// # Errors
///
/// Returns [`GreaseError::IllegalPartName`] for empty names, names starting
/// with `_`, reserved world attribute names and collection operation names.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('_')
        || RESERVED_NAMES.contains(&name)
        || OPERATION_NAMES.contains(&name)
    {
        Err(GreaseError::IllegalPartName(name.to_string()))
    } else {
        Ok(())
    }
}

struct Slot<T: ?Sized> {
    name: String,
    part: Option<Box<T>>,
}

/// Ordered collection of named parts.
pub struct Parts<T: ?Sized + Part> {
    world: WorldId,
    slots: Vec<Slot<T>>,
}

impl<T: ?Sized + Part> Parts<T> {
    /// Create an empty collection owned by `world`
    #[must_use]
    pub fn new(world: WorldId) -> Self {
        Self {
            world,
            slots: Vec::new(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    /// Set a part. An existing part of the same name is replaced in place
    /// and returned; otherwise the part is appended.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::IllegalPartName`] for unusable names.
    pub fn set(&mut self, name: &str, mut part: Box<T>) -> Result<Option<Box<T>>> {
        validate_name(name)?;
        part.attach(self.world);
        match self.position(name) {
            Some(index) => Ok(self.slots[index].part.replace(part)),
            None => {
                self.slots.push(Slot {
                    name: name.to_string(),
                    part: Some(part),
                });
                Ok(None)
            }
        }
    }

    /// Insert a part at a position. An existing part of the same name is
    /// removed first and returned.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::IllegalPartName`] for unusable names,
    /// [`GreaseError::NoSuchPart`] if the `before` part does not exist and
    /// [`GreaseError::InvalidPlacement`] for an index past the end.
    pub fn insert(
        &mut self,
        name: &str,
        mut part: Box<T>,
        placement: Placement,
    ) -> Result<Option<Box<T>>> {
        validate_name(name)?;
        if let Placement::Before(before) = &placement {
            if !self.contains(before) {
                return Err(GreaseError::NoSuchPart(before.clone()));
            }
        }
        let existing = self.position(name);
        let len_without = self.slots.len() - usize::from(existing.is_some());
        if let Placement::Index(index) = placement {
            if index > len_without {
                return Err(GreaseError::InvalidPlacement);
            }
        }

        let replaced = existing.and_then(|old| self.slots.remove(old).part);
        let index = match &placement {
            // Inserting before itself keeps the old position.
            Placement::Before(before) => self.position(before).or(existing).unwrap_or(len_without),
            Placement::Index(index) => *index,
        };
        part.attach(self.world);
        self.slots.insert(
            index,
            Slot {
                name: name.to_string(),
                part: Some(part),
            },
        );
        Ok(replaced)
    }

    /// Remove a part by name. Returns `None` if the part is currently lent
    /// out; it is then dropped instead of being restored.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchPart`] if no part has this name.
    pub fn remove(&mut self, name: &str) -> Result<Option<Box<T>>> {
        let index = self
            .position(name)
            .ok_or_else(|| GreaseError::NoSuchPart(name.to_string()))?;
        Ok(self.slots.remove(index).part)
    }

    /// Get a part by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.part.as_deref())
    }

    /// Get a part mutably by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.part.as_deref_mut())
    }

    /// Check if a part has this name
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterate over `(name, part)` in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| Some((slot.name.as_str(), slot.part.as_deref()?)))
    }

    /// Iterate mutably over `(name, part)` in order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .filter_map(|slot| Some((slot.name.as_str(), slot.part.as_deref_mut()?)))
    }

    /// Part names in order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name.clone()).collect()
    }

    /// Number of parts
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if there are no parts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Lend a part out of its slot. The slot keeps its name and position.
    pub fn take(&mut self, name: &str) -> Option<Box<T>> {
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.part.take())
    }

    /// Return a lent part. Ignored if the slot was removed or filled with
    /// another part in the meantime.
    pub fn restore(&mut self, name: &str, part: Box<T>) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.name == name && slot.part.is_none())
        {
            slot.part = Some(part);
        }
    }
}

impl<T: ?Sized + Part> std::fmt::Debug for Parts<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parts")
            .field("world", &self.world)
            .field("names", &self.names())
            .finish()
    }
}
