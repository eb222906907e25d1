//! Engine error types
//!
//! Every fallible operation in the crate returns [`Result`] with a
//! [`GreaseError`].

use thiserror::Error;

use crate::ecs::{EntityId, FieldType};

/// Errors that can occur while manipulating worlds, entities and modes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GreaseError {
    /// An entity or entity set belongs to another world.
    #[error("entities belong to a different world")]
    DifferentWorld,

    /// The entity is not a member of the set, component or world.
    #[error("no such entity: {0}")]
    NoSuchEntity(EntityId),

    /// The entity was deleted from its world and cannot be reused.
    #[error("entity {0} has been deleted from its world")]
    DeletedEntity(EntityId),

    /// Part names may not shadow world attributes or part operations.
    #[error("illegal part name: {0:?}")]
    IllegalPartName(String),

    /// No part is registered under this name.
    #[error("no such part: {0}")]
    NoSuchPart(String),

    /// A part insertion named both or neither of `before` and `index`, or the
    /// index is out of range.
    #[error("invalid part placement")]
    InvalidPlacement,

    /// No component is registered under this name.
    #[error("no such component: {0}")]
    NoSuchComponent(String),

    /// The component exists but has no field schema.
    #[error("component {0} does not have fields")]
    NotFieldComponent(String),

    /// The field is not part of the component schema.
    #[error("component {component} has no field {field}")]
    UnknownField {
        /// Component name (may be empty for detached components).
        component: String,
        /// Requested field.
        field: String,
    },

    /// A value could not be coerced to the field type.
    #[error("field {field} expects {expected}, got {found}")]
    FieldType {
        /// Field name.
        field: String,
        /// Declared field type.
        expected: FieldType,
        /// Type of the offending value.
        found: FieldType,
    },

    /// The attribute path does not exist on the field value.
    #[error("field {field} has no attribute {attr}")]
    UnknownAttribute {
        /// Field name.
        field: String,
        /// Requested attribute.
        attr: String,
    },

    /// A batch mutation is not defined for the operand types.
    #[error("unsupported operation {op} on {ty}")]
    UnsupportedOperation {
        /// Operation name.
        op: &'static str,
        /// Operand type description.
        ty: String,
    },

    /// No entity kind is registered under this name.
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),

    /// No entity kind has this id.
    #[error("unknown entity kind id: {0}")]
    UnknownKindId(u32),

    /// A multi-mode needs at least one submode.
    #[error("no submode to activate")]
    NoSubmodes,

    /// The mode id is not a submode of this multi-mode.
    #[error("unknown submode")]
    UnknownSubmode,

    /// No control action is defined under this name.
    #[error("no such action: {0}")]
    UnknownAction(String),

    /// Configuration file I/O or (de)serialization failed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, GreaseError>;
