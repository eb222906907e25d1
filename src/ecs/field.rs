//! Component fields
//!
//! A [`Field`] is one column of a component: a name, a [`FieldType`], a
//! default value and per-kind blocks of [`FieldValue`]s indexed like entity
//! ids. Values written to a field are coerced to its type first.

use std::cmp::Ordering;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::block::grow;
use super::{Entity, EntityId};
use crate::error::{GreaseError, Result};
use crate::geometry::{Rect, Rgba, Vec2d};

// ============================================================================
// Field Types
// ============================================================================

/// Data type of a component field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Signed integer
    Int,
    /// Double precision float
    Float,
    /// Boolean flag
    Bool,
    /// Text
    Str,
    /// 2D vector
    Vec2,
    /// List of 2D vectors, such as polygon vertices
    Vec2Array,
    /// RGBA color
    Rgba,
    /// Axis-aligned rectangle
    Rect,
    /// Optional reference to another entity
    Entity,
}

/// Whether `f` is a whole number that fits in an `i64` without saturating.
fn is_integral(f: f64) -> bool {
    // -2^63 is exact, 2^63 is one past i64::MAX
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl FieldType {
    /// Coerce `value` to this type for the field `field`.
    ///
    /// Integers widen to floats, integral floats narrow to integers and
    /// numbers convert to booleans by comparing against zero.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::FieldType`] if no coercion applies.
    pub fn coerce(self, field: &str, value: FieldValue) -> Result<FieldValue> {
        let coerced = match (self, value) {
            (ty, value) if value.ty() == ty => value,
            (Self::Float, FieldValue::Int(i)) => FieldValue::Float(i as f64),
            (Self::Int, FieldValue::Float(f)) if is_integral(f) => FieldValue::Int(f as i64),
            (Self::Int, FieldValue::Bool(b)) => FieldValue::Int(i64::from(b)),
            (Self::Bool, FieldValue::Int(i)) => FieldValue::Bool(i != 0),
            (Self::Bool, FieldValue::Float(f)) => FieldValue::Bool(f != 0.0),
            (expected, value) => {
                return Err(GreaseError::FieldType {
                    field: field.to_string(),
                    expected,
                    found: value.ty(),
                });
            }
        };
        Ok(coerced)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Vec2 => "vec2",
            Self::Vec2Array => "vec2 array",
            Self::Rgba => "rgba",
            Self::Rect => "rect",
            Self::Entity => "entity",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Field Values
// ============================================================================

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Signed integer
    Int(i64),
    /// Double precision float
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Text
    Str(String),
    /// 2D vector
    Vec2(Vec2d),
    /// List of 2D vectors
    Vec2Array(Vec<Vec2d>),
    /// RGBA color
    Rgba(Rgba),
    /// Axis-aligned rectangle
    Rect(Rect),
    /// Optional entity reference
    Entity(Option<Entity>),
}

impl FieldValue {
    /// Generic default for a field type: zero, false, empty or none.
    #[must_use]
    pub fn default_for(ty: FieldType) -> Self {
        match ty {
            FieldType::Int => Self::Int(0),
            FieldType::Float => Self::Float(0.0),
            FieldType::Bool => Self::Bool(false),
            FieldType::Str => Self::Str(String::new()),
            FieldType::Vec2 => Self::Vec2(Vec2d::ZERO),
            FieldType::Vec2Array => Self::Vec2Array(Vec::new()),
            FieldType::Rgba => Self::Rgba(Rgba::TRANSPARENT),
            FieldType::Rect => Self::Rect(Rect::default()),
            FieldType::Entity => Self::Entity(None),
        }
    }

    /// Type of the value
    #[must_use]
    pub const fn ty(&self) -> FieldType {
        match self {
            Self::Int(_) => FieldType::Int,
            Self::Float(_) => FieldType::Float,
            Self::Bool(_) => FieldType::Bool,
            Self::Str(_) => FieldType::Str,
            Self::Vec2(_) => FieldType::Vec2,
            Self::Vec2Array(_) => FieldType::Vec2Array,
            Self::Rgba(_) => FieldType::Rgba,
            Self::Rect(_) => FieldType::Rect,
            Self::Entity(_) => FieldType::Entity,
        }
    }

    /// Numeric value of ints and floats
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(i) => Some(i as f64),
            Self::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Integer value
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Boolean value
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Text value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Vector value
    #[must_use]
    pub fn as_vec2(&self) -> Option<Vec2d> {
        match *self {
            Self::Vec2(v) => Some(v),
            _ => None,
        }
    }

    /// Vector list value
    #[must_use]
    pub fn as_vec2_array(&self) -> Option<&[Vec2d]> {
        match self {
            Self::Vec2Array(v) => Some(v),
            _ => None,
        }
    }

    /// Color value
    #[must_use]
    pub fn as_rgba(&self) -> Option<Rgba> {
        match *self {
            Self::Rgba(c) => Some(c),
            _ => None,
        }
    }

    /// Rectangle value
    #[must_use]
    pub fn as_rect(&self) -> Option<Rect> {
        match *self {
            Self::Rect(r) => Some(r),
            _ => None,
        }
    }

    /// Entity reference value
    #[must_use]
    pub fn as_entity(&self) -> Option<Entity> {
        match *self {
            Self::Entity(e) => e,
            _ => None,
        }
    }

    /// Read a named scalar attribute: `x`/`y` of vectors, the edges of
    /// rectangles and the channels of colors.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<f64> {
        match self {
            Self::Vec2(v) => match name {
                "x" => Some(v.x),
                "y" => Some(v.y),
                _ => None,
            },
            Self::Rect(r) => match name {
                "left" => Some(r.left),
                "bottom" => Some(r.bottom),
                "right" => Some(r.right),
                "top" => Some(r.top),
                _ => None,
            },
            Self::Rgba(c) => match name {
                "r" => Some(c.r),
                "g" => Some(c.g),
                "b" => Some(c.b),
                "a" => Some(c.a),
                _ => None,
            },
            _ => None,
        }
    }

    /// Mutable access to a named scalar attribute
    pub fn attr_mut(&mut self, name: &str) -> Option<&mut f64> {
        match self {
            Self::Vec2(v) => match name {
                "x" => Some(&mut v.x),
                "y" => Some(&mut v.y),
                _ => None,
            },
            Self::Rect(r) => match name {
                "left" => Some(&mut r.left),
                "bottom" => Some(&mut r.bottom),
                "right" => Some(&mut r.right),
                "top" => Some(&mut r.top),
                _ => None,
            },
            Self::Rgba(c) => match name {
                "r" => Some(&mut c.r),
                "g" => Some(&mut c.g),
                "b" => Some(&mut c.b),
                "a" => Some(&mut c.a),
                _ => None,
            },
            _ => None,
        }
    }

    /// Write a named scalar attribute. Returns `false` if the value has no
    /// such attribute.
    pub fn set_attr(&mut self, name: &str, value: f64) -> bool {
        match self.attr_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Compare two values. Ints and floats compare numerically; text and
    /// booleans are ordered; other values are only comparable for equality.
    #[must_use]
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ if a == b => Some(Ordering::Equal),
                _ => None,
            },
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec2d> for FieldValue {
    fn from(value: Vec2d) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vec<Vec2d>> for FieldValue {
    fn from(value: Vec<Vec2d>) -> Self {
        Self::Vec2Array(value)
    }
}

impl From<Rgba> for FieldValue {
    fn from(value: Rgba) -> Self {
        Self::Rgba(value)
    }
}

impl From<Rect> for FieldValue {
    fn from(value: Rect) -> Self {
        Self::Rect(value)
    }
}

impl From<Entity> for FieldValue {
    fn from(value: Entity) -> Self {
        Self::Entity(Some(value))
    }
}

impl From<Option<Entity>> for FieldValue {
    fn from(value: Option<Entity>) -> Self {
        Self::Entity(value)
    }
}

// ============================================================================
// Field Storage
// ============================================================================

/// One column of component data.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: FieldType,
    default: FieldValue,
    blocks: FxHashMap<u32, Vec<FieldValue>>,
}

impl Field {
    /// Create a field with the generic default for its type
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: FieldValue::default_for(ty),
            blocks: FxHashMap::default(),
        }
    }

    /// Create a field with an explicit default value.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::FieldType`] if the default does not coerce to `ty`.
    pub fn with_default(
        name: impl Into<String>,
        ty: FieldType,
        default: impl Into<FieldValue>,
    ) -> Result<Self> {
        let mut field = Self::new(name, ty);
        field.default = ty.coerce(&field.name, default.into())?;
        Ok(field)
    }

    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field type
    #[must_use]
    pub const fn ty(&self) -> FieldType {
        self.ty
    }

    /// Default value for new rows
    #[must_use]
    pub fn default_value(&self) -> &FieldValue {
        &self.default
    }

    /// Coerce a value to the field type.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::FieldType`] if no coercion applies.
    pub fn coerce(&self, value: FieldValue) -> Result<FieldValue> {
        self.ty.coerce(&self.name, value)
    }

    /// Stored value for an id. Slots that were allocated but never written
    /// hold the default. Membership is tracked by the owning component, not
    /// the field.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&FieldValue> {
        self.blocks.get(&id.block)?.get(id.index as usize)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut FieldValue> {
        self.blocks.get_mut(&id.block)?.get_mut(id.index as usize)
    }

    /// Store a value for an id, growing the block as needed.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::FieldType`] if the value does not coerce.
    pub fn set(&mut self, id: EntityId, value: impl Into<FieldValue>) -> Result<()> {
        let value = self.coerce(value.into())?;
        self.store(id, value);
        Ok(())
    }

    /// Store an already coerced value
    pub(crate) fn store(&mut self, id: EntityId, value: FieldValue) {
        let index = id.index as usize;
        let block = self.blocks.entry(id.block).or_default();
        grow(block, index + 1, self.default.clone());
        block[index] = value;
    }

    /// Reset the slot of an id to the default
    pub fn clear(&mut self, id: EntityId) {
        let default = self.default.clone();
        if let Some(slot) = self.get_mut(id) {
            *slot = default;
        }
    }
}
