//! Entity Component System module
//!
//! Entities are generational ids grouped into blocks by kind. Components
//! store entity data in typed fields, systems run every time step, and the
//! [`World`] ties them together.

mod accessor;
mod block;
mod component;
pub mod components;
mod entity;
mod field;
mod kind;
mod parts;
mod set;
mod world;
mod world_entities;

pub use accessor::{
    CompareOp, FieldAccessor, FieldAccessorMut, FieldSnapshot, FieldSource, MutateOp,
};
pub use component::{Component, ComponentStorage, Row};
pub use entity::{Entity, EntityId, EntityIdGenerator, KindId, WorldId};
pub use field::{Field, FieldType, FieldValue};
pub use kind::KindRegistry;
pub use parts::{Part, Parts, Placement, validate_name};
pub use set::EntitySet;
pub use world::{World, WorldCallback};
pub use world_entities::WorldEntities;
