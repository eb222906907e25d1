//! Components
//!
//! Components hold all entity data. The world talks to them through the
//! object-safe [`ComponentStorage`] trait; the general purpose [`Component`]
//! stores rows of typed [`Field`]s described by a schema.
//!
//! # Example
//!
//! ```ignore
//! let mut health = Component::with_fields([("hp", FieldType::Int)]);
//! world.components.set("health", Box::new(health))?;
//! world.set(entity, "health", [("hp", 10.into())])?;
//! ```

use std::any::Any;
use std::collections::BTreeMap;

use super::accessor::{FieldAccessor, FieldAccessorMut};
use super::parts::Part;
use super::{Entity, EntitySet, Field, FieldType, FieldValue, WorldId};
use crate::error::{GreaseError, Result};

/// Entity data of one component keyed by field name.
pub type Row = BTreeMap<String, FieldValue>;

/// Interface between a world and its components.
pub trait ComponentStorage: Any {
    /// Bind the component to a world. Called when it is added to the world.
    fn attach(&mut self, world: WorldId);

    /// Advance the component to the next time step.
    fn step(&mut self, _dt: f64) {}

    /// Entities with data in this component
    fn entities(&self) -> &EntitySet;

    /// Check if the entity has data in this component
    fn contains(&self, entity: Entity) -> bool {
        self.entities().contains(entity)
    }

    /// Delete the entity's data. Returns whether it was present.
    fn remove(&mut self, entity: Entity) -> bool;

    /// The entity's data as a row, if present
    fn row(&self, entity: Entity) -> Option<Row>;

    /// Upcast for downcasting to the concrete component
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete component
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Part for dyn ComponentStorage {
    fn attach(&mut self, world: WorldId) {
        ComponentStorage::attach(self, world);
    }
}

/// General component with a configurable field schema.
#[derive(Debug, Clone)]
pub struct Component {
    world: WorldId,
    fields: Vec<Field>,
    entities: EntitySet,
    added: Vec<Entity>,
    deleted: Vec<Entity>,
    new_entities: Vec<Entity>,
    deleted_entities: Vec<Entity>,
}

impl Component {
    /// Create a component without fields. Such a component only tracks
    /// membership.
    #[must_use]
    pub fn new() -> Self {
        Self {
            world: WorldId::DETACHED,
            fields: Vec::new(),
            entities: EntitySet::new(WorldId::DETACHED),
            added: Vec::new(),
            deleted: Vec::new(),
            new_entities: Vec::new(),
            deleted_entities: Vec::new(),
        }
    }

    /// Create a component from `(name, type)` pairs using generic defaults
    #[must_use]
    pub fn with_fields<'a>(fields: impl IntoIterator<Item = (&'a str, FieldType)>) -> Self {
        let mut component = Self::new();
        for (name, ty) in fields {
            component.add_field(Field::new(name, ty));
        }
        component
    }

    /// Add a field, replacing any field of the same name
    pub fn add_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Add a field with an explicit default value.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::FieldType`] if the default does not coerce.
    pub fn with_field_default(
        mut self,
        name: &str,
        ty: FieldType,
        default: impl Into<FieldValue>,
    ) -> Result<Self> {
        self.add_field(Field::with_default(name, ty, default)?);
        Ok(self)
    }

    /// World this component is attached to
    #[must_use]
    pub const fn world(&self) -> WorldId {
        self.world
    }

    /// Fields in schema order
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    fn field_index(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| GreaseError::UnknownField {
                component: String::new(),
                field: name.to_string(),
            })
    }

    /// Entities with data in this component
    #[must_use]
    pub fn entities(&self) -> &EntitySet {
        &self.entities
    }

    /// Entities added since the previous time step
    #[must_use]
    pub fn new_entities(&self) -> &[Entity] {
        &self.new_entities
    }

    /// Entities deleted since the previous time step
    #[must_use]
    pub fn deleted_entities(&self) -> &[Entity] {
        &self.deleted_entities
    }

    /// Check if the entity has data in this component
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Set data for an entity, adding it if it is not a member yet.
    ///
    /// New members get every field not named in `data` set to its default.
    /// Existing members only have the named fields updated. Nothing is
    /// written if any value is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] for entities of another world,
    /// [`GreaseError::UnknownField`] for names outside the schema and
    /// [`GreaseError::FieldType`] for values that do not coerce.
    pub fn set<'a>(
        &mut self,
        entity: Entity,
        data: impl IntoIterator<Item = (&'a str, FieldValue)>,
    ) -> Result<()> {
        if entity.world != self.world {
            return Err(GreaseError::DifferentWorld);
        }
        let mut values = Vec::new();
        for (name, value) in data {
            let index = self.field_index(name)?;
            values.push((index, self.fields[index].coerce(value)?));
        }

        if !self.entities.contains(entity) {
            self.entities.add(entity)?;
            self.added.push(entity);
            for field in &mut self.fields {
                let default = field.default_value().clone();
                field.store(entity.id, default);
            }
        }
        for (index, value) in values {
            self.fields[index].store(entity.id, value);
        }
        Ok(())
    }

    /// All field values of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchEntity`] if the entity is not a member.
    pub fn get(&self, entity: Entity) -> Result<Row> {
        if !self.contains(entity) {
            return Err(GreaseError::NoSuchEntity(entity.id));
        }
        Ok(self
            .fields
            .iter()
            .filter_map(|f| Some((f.name().to_string(), f.get(entity.id)?.clone())))
            .collect())
    }

    /// A single field value of a member entity.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownField`] or [`GreaseError::NoSuchEntity`].
    pub fn get_field(&self, entity: Entity, field: &str) -> Result<&FieldValue> {
        let index = self.field_index(field)?;
        if !self.contains(entity) {
            return Err(GreaseError::NoSuchEntity(entity.id));
        }
        self.fields[index]
            .get(entity.id)
            .ok_or(GreaseError::NoSuchEntity(entity.id))
    }

    /// Set a single field, adding the entity with defaults if needed.
    ///
    /// # Errors
    ///
    /// Same as [`Component::set`].
    pub fn set_field(
        &mut self,
        entity: Entity,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        self.set(entity, [(field, value.into())])
    }

    /// Delete an entity from the component. Returns whether it was a member.
    pub fn delete(&mut self, entity: Entity) -> bool {
        if self.entities.discard(entity) {
            self.deleted.push(entity);
            true
        } else {
            false
        }
    }

    /// Batch read access to a field for the members of `entities`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownField`] if the field does not exist.
    pub fn accessor<'a>(
        &'a self,
        field: &str,
        entities: &'a EntitySet,
    ) -> Result<FieldAccessor<'a>> {
        let index = self.field_index(field)?;
        Ok(FieldAccessor::new(self, &self.fields[index], entities))
    }

    /// Batch write access to a field for the members of `entities`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownField`] if the field does not exist.
    pub fn accessor_mut(
        &mut self,
        field: &str,
        entities: EntitySet,
    ) -> Result<FieldAccessorMut<'_>> {
        let index = self.field_index(field)?;
        Ok(FieldAccessorMut::new(self, index, entities))
    }

    pub(crate) fn field_at_mut(&mut self, index: usize) -> &mut Field {
        &mut self.fields[index]
    }

    pub(crate) fn field_at(&self, index: usize) -> &Field {
        &self.fields[index]
    }
}

impl Default for Component {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentStorage for Component {
    fn attach(&mut self, world: WorldId) {
        if self.world != world {
            self.world = world;
            self.entities.reset_world(world);
            self.added.clear();
            self.deleted.clear();
            self.new_entities.clear();
            self.deleted_entities.clear();
        }
    }

    fn step(&mut self, _dt: f64) {
        self.new_entities = std::mem::take(&mut self.added);
        self.deleted_entities = std::mem::take(&mut self.deleted);
    }

    fn entities(&self) -> &EntitySet {
        &self.entities
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.delete(entity)
    }

    fn row(&self, entity: Entity) -> Option<Row> {
        self.get(entity).ok()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
