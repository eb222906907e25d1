//! Batch field access
//!
//! Field accessors view one field of a component across an entity set.
//! Queries return the matching entities as a new [`EntitySet`]; mutations
//! apply an operation to every member at once. Entities of the set that
//! have no data in the component are skipped.
//!
//! # Example
//!
//! ```ignore
//! let position = world.component("position")?;
//! let off_screen = position
//!     .accessor("xy", world.entities())?
//!     .attr("x")?
//!     .matching(CompareOp::Gt, &FieldValue::Float(800.0));
//!
//! world
//!     .component_mut("movement")?
//!     .accessor_mut("velocity", off_screen)?
//!     .apply(MutateOp::Mul, &FieldValue::Float(-1.0))?;
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{Component, Entity, EntitySet, Field, FieldType, FieldValue};
use crate::error::{GreaseError, Result};
use crate::geometry::Vec2d;

// ============================================================================
// Operators
// ============================================================================

/// Comparison used by field queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

impl CompareOp {
    /// Evaluate `lhs op rhs`. Values that cannot be ordered only satisfy `Ne`.
    #[must_use]
    pub fn test(self, lhs: &FieldValue, rhs: &FieldValue) -> bool {
        let ordering = lhs.compare(rhs);
        match self {
            Self::Eq => ordering == Some(Ordering::Equal),
            Self::Ne => ordering != Some(Ordering::Equal),
            Self::Lt => ordering == Some(Ordering::Less),
            Self::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => ordering == Some(Ordering::Greater),
            Self::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

/// Arithmetic used by batch mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutateOp {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division; integer division floors
    Div,
    /// Remainder with the sign of the divisor
    Rem,
}

impl MutateOp {
    const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Rem => "rem",
        }
    }

    fn unsupported(self, ty: String) -> GreaseError {
        GreaseError::UnsupportedOperation {
            op: self.name(),
            ty,
        }
    }

    fn scalar(self, a: f64, b: f64) -> Result<f64> {
        Ok(match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div | Self::Rem if b == 0.0 => {
                return Err(self.unsupported("division by zero".to_string()));
            }
            Self::Div => a / b,
            Self::Rem => a - b * (a / b).floor(),
        })
    }

    fn int(self, a: i64, b: i64) -> Result<i64> {
        let overflow = || self.unsupported("integer overflow".to_string());
        match self {
            Self::Add => a.checked_add(b).ok_or_else(overflow),
            Self::Sub => a.checked_sub(b).ok_or_else(overflow),
            Self::Mul => a.checked_mul(b).ok_or_else(overflow),
            Self::Div | Self::Rem if b == 0 => {
                Err(self.unsupported("division by zero".to_string()))
            }
            Self::Div | Self::Rem => {
                let mut quotient = a.checked_div(b).ok_or_else(overflow)?;
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    quotient -= 1;
                }
                if self == Self::Div {
                    Ok(quotient)
                } else {
                    Ok(a - b * quotient)
                }
            }
        }
    }

    /// Compute `lhs op rhs`.
    ///
    /// Numbers combine with numbers, vectors combine component-wise with
    /// vectors or scalars, vector lists combine each vertex with a vector or
    /// scalar, and text supports concatenation.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnsupportedOperation`] for other combinations
    /// and for division by zero.
    pub fn apply(self, lhs: &FieldValue, rhs: &FieldValue) -> Result<FieldValue> {
        use FieldValue as V;

        let vec = |a: Vec2d, b: Vec2d| -> Result<Vec2d> {
            Ok(Vec2d::new(self.scalar(a.x, b.x)?, self.scalar(a.y, b.y)?))
        };
        let operand = match rhs {
            V::Vec2(v) => Some(*v),
            other => other.as_f64().map(Vec2d::splat),
        };

        match (lhs, rhs) {
            (V::Int(a), V::Int(b)) => self.int(*a, *b).map(V::Int),
            (V::Int(_) | V::Float(_), V::Int(_) | V::Float(_)) => {
                let (a, b) = (lhs.as_f64(), rhs.as_f64());
                match (a, b) {
                    (Some(a), Some(b)) => self.scalar(a, b).map(V::Float),
                    _ => Err(self.unsupported(format!("{} and {}", lhs.ty(), rhs.ty()))),
                }
            }
            (V::Vec2(a), _) if operand.is_some() => {
                let b = operand.unwrap_or_default();
                vec(*a, b).map(V::Vec2)
            }
            (V::Vec2Array(points), _) if operand.is_some() => {
                let b = operand.unwrap_or_default();
                points
                    .iter()
                    .map(|&p| vec(p, b))
                    .collect::<Result<Vec<_>>>()
                    .map(V::Vec2Array)
            }
            (V::Str(a), V::Str(b)) if self == Self::Add => Ok(V::Str(format!("{a}{b}"))),
            _ => Err(self.unsupported(format!("{} and {}", lhs.ty(), rhs.ty()))),
        }
    }
}

// ============================================================================
// Value Sources
// ============================================================================

/// Per-entity operand for joined queries and mutations.
pub trait FieldSource {
    /// Value for the entity, if it has one
    fn value_for(&self, entity: Entity) -> Option<FieldValue>;
}

/// Owned copy of accessor values, for joins where the source component
/// cannot stay borrowed while the target is mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSnapshot {
    values: BTreeMap<Entity, FieldValue>,
}

impl FieldSnapshot {
    /// Number of captured values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Captured value for an entity
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&FieldValue> {
        self.values.get(&entity)
    }
}

impl FieldSource for FieldSnapshot {
    fn value_for(&self, entity: Entity) -> Option<FieldValue> {
        self.values.get(&entity).cloned()
    }
}

fn check_attr(field: &Field, attr: &str) -> Result<()> {
    if FieldValue::default_for(field.ty()).attr(attr).is_some() {
        Ok(())
    } else {
        Err(GreaseError::UnknownAttribute {
            field: field.name().to_string(),
            attr: attr.to_string(),
        })
    }
}

fn project(value: &FieldValue, attr: Option<&str>) -> Option<FieldValue> {
    match attr {
        None => Some(value.clone()),
        Some(attr) => value.attr(attr).map(FieldValue::Float),
    }
}

// ============================================================================
// Read Accessor
// ============================================================================

/// Read-only view of a field over an entity set.
#[derive(Debug, Clone)]
pub struct FieldAccessor<'a> {
    component: &'a Component,
    field: &'a Field,
    entities: &'a EntitySet,
    attr: Option<String>,
}

impl<'a> FieldAccessor<'a> {
    pub(crate) fn new(component: &'a Component, field: &'a Field, entities: &'a EntitySet) -> Self {
        Self {
            component,
            field,
            entities,
            attr: None,
        }
    }

    /// Narrow the accessor to a scalar attribute of the field value, such
    /// as `x` of a vector field.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownAttribute`] if the field type has no
    /// such attribute.
    pub fn attr(mut self, name: &str) -> Result<Self> {
        check_attr(self.field, name)?;
        self.attr = Some(name.to_string());
        Ok(self)
    }

    /// Value for a member of the set
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<FieldValue> {
        if !self.entities.contains(entity) || !self.component.contains(entity) {
            return None;
        }
        project(self.field.get(entity.id)?, self.attr.as_deref())
    }

    /// Iterate over `(entity, value)` for every member with data
    pub fn iter(&self) -> impl Iterator<Item = (Entity, FieldValue)> + '_ {
        self.entities
            .iter()
            .filter_map(move |entity| Some((entity, self.get(entity)?)))
    }

    /// Iterate over the values of every member with data
    pub fn values(&self) -> impl Iterator<Item = FieldValue> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Number of members with data
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if no member has data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Members whose value satisfies `value op operand`
    #[must_use]
    pub fn matching(&self, op: CompareOp, operand: &FieldValue) -> EntitySet {
        self.select(|value, _| op.test(value, operand))
    }

    /// Members whose value satisfies `value op other[entity]`. Entities
    /// missing from `other` are skipped.
    #[must_use]
    pub fn matching_join(&self, op: CompareOp, other: &impl FieldSource) -> EntitySet {
        self.select(|value, entity| {
            other
                .value_for(entity)
                .is_some_and(|operand| op.test(value, &operand))
        })
    }

    /// Members whose value equals one of `candidates`
    #[must_use]
    pub fn contained_in(&self, candidates: &[FieldValue]) -> EntitySet {
        self.select(|value, _| candidates.iter().any(|c| CompareOp::Eq.test(value, c)))
    }

    fn select(&self, mut keep: impl FnMut(&FieldValue, Entity) -> bool) -> EntitySet {
        let mut result = self.entities.new_empty();
        for (entity, value) in self.iter() {
            if keep(&value, entity) {
                // Members come from a set of the same world.
                let _ = result.add(entity);
            }
        }
        result
    }

    /// Copy the current values for use after the component is released
    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            values: self.iter().collect(),
        }
    }
}

impl FieldSource for FieldAccessor<'_> {
    fn value_for(&self, entity: Entity) -> Option<FieldValue> {
        self.get(entity)
    }
}

// ============================================================================
// Write Accessor
// ============================================================================

/// Mutable view of a field over an entity set.
#[derive(Debug)]
pub struct FieldAccessorMut<'a> {
    component: &'a mut Component,
    index: usize,
    entities: EntitySet,
    attr: Option<String>,
}

impl<'a> FieldAccessorMut<'a> {
    pub(crate) fn new(component: &'a mut Component, index: usize, entities: EntitySet) -> Self {
        Self {
            component,
            index,
            entities,
            attr: None,
        }
    }

    /// Narrow the accessor to a scalar attribute of the field value.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownAttribute`] if the field type has no
    /// such attribute.
    pub fn attr(mut self, name: &str) -> Result<Self> {
        check_attr(self.component.field_at(self.index), name)?;
        self.attr = Some(name.to_string());
        Ok(self)
    }

    fn members(&self) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|&entity| self.component.contains(entity))
            .collect()
    }

    /// Rewrite the value of every member with `update(current, entity)`.
    /// `None` leaves the member unchanged. Every new value is computed and
    /// coerced before any is stored, so an error leaves the field untouched.
    /// Returns the number updated.
    fn update(
        &mut self,
        mut update: impl FnMut(&FieldValue, Entity) -> Result<Option<FieldValue>>,
    ) -> Result<usize> {
        let field = self.component.field_at(self.index);
        let mut staged = Vec::new();
        for entity in self.members() {
            let Some(current) = field.get(entity.id) else {
                continue;
            };
            let new_value = match self.attr.as_deref() {
                None => {
                    let Some(value) = update(current, entity)? else {
                        continue;
                    };
                    field.coerce(value)?
                }
                Some(attr) => {
                    let Some(old) = current.attr(attr) else {
                        continue;
                    };
                    let Some(value) = update(&FieldValue::Float(old), entity)? else {
                        continue;
                    };
                    let scalar = value.as_f64().ok_or_else(|| GreaseError::FieldType {
                        field: format!("{}.{attr}", field.name()),
                        expected: FieldType::Float,
                        found: value.ty(),
                    })?;
                    let mut whole = current.clone();
                    whole.set_attr(attr, scalar);
                    whole
                }
            };
            staged.push((entity, new_value));
        }

        let updated = staged.len();
        let field = self.component.field_at_mut(self.index);
        for (entity, value) in staged {
            field.store(entity.id, value);
        }
        Ok(updated)
    }

    /// Assign `value` to every member. Returns the number updated.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::FieldType`] if the value does not coerce.
    pub fn set_all(&mut self, value: impl Into<FieldValue>) -> Result<usize> {
        let value = value.into();
        self.update(|_, _| Ok(Some(value.clone())))
    }

    /// Assign each member the value of `source` for the same entity.
    /// Entities missing from `source` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::FieldType`] if a value does not coerce.
    pub fn set_join(&mut self, source: &impl FieldSource) -> Result<usize> {
        self.update(|_, entity| Ok(source.value_for(entity)))
    }

    /// Apply `value = value op operand` to every member.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnsupportedOperation`] if the operation is not
    /// defined for the operand types.
    pub fn apply(&mut self, op: MutateOp, operand: &FieldValue) -> Result<usize> {
        self.update(|current, _| op.apply(current, operand).map(Some))
    }

    /// Apply `value = value op source[entity]` to every member. Entities
    /// missing from `source` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnsupportedOperation`] if the operation is not
    /// defined for the operand types.
    pub fn apply_join(&mut self, op: MutateOp, source: &impl FieldSource) -> Result<usize> {
        self.update(|current, entity| match source.value_for(entity) {
            Some(operand) => op.apply(current, &operand).map(Some),
            None => Ok(None),
        })
    }
}
