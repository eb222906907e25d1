//! Common components
//!
//! Ready-made schemas for 2D games. Systems shipped with the engine look
//! them up by their conventional names: `position`, `movement`, `shape`,
//! `renderable` and `collision`.

use super::{Component, Field, FieldType};

/// Default collision mask: collide with everything.
pub const ALL_LAYERS: i64 = 0xffff_ffff;

/// Position and orientation: `xy`, `last_xy`, `z`, `angle`, `last_angle`
#[must_use]
pub fn position() -> Component {
    Component::with_fields([
        ("xy", FieldType::Vec2),
        ("last_xy", FieldType::Vec2),
        ("z", FieldType::Float),
        ("angle", FieldType::Float),
        ("last_angle", FieldType::Float),
    ])
}

/// Linear and angular motion: `velocity`, `last_velocity`, `accel`, `rotation`
#[must_use]
pub fn movement() -> Component {
    Component::with_fields([
        ("velocity", FieldType::Vec2),
        ("last_velocity", FieldType::Vec2),
        ("accel", FieldType::Vec2),
        ("rotation", FieldType::Float),
    ])
}

/// Polygon outline: `verts`, `line_color`, `fill_color`
#[must_use]
pub fn shape() -> Component {
    Component::with_fields([
        ("verts", FieldType::Vec2Array),
        ("line_color", FieldType::Rgba),
        ("fill_color", FieldType::Rgba),
    ])
}

/// Draw order and tint: `depth`, `color`
#[must_use]
pub fn renderable() -> Component {
    Component::with_fields([("depth", FieldType::Float), ("color", FieldType::Rgba)])
}

/// Collision volume: `aabb`, `radius`, `from_mask`, `into_mask`.
///
/// Both masks default to [`ALL_LAYERS`].
#[must_use]
pub fn collision() -> Component {
    let mut component =
        Component::with_fields([("aabb", FieldType::Rect), ("radius", FieldType::Float)]);
    for mask in ["from_mask", "into_mask"] {
        // An integer default always coerces to an integer field.
        if let Ok(field) = Field::with_default(mask, FieldType::Int, ALL_LAYERS) {
            component.add_field(field);
        }
    }
    component
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::FieldValue;

    #[test]
    fn test_position_schema() {
        let position = position();
        let names: Vec<&str> = position.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["xy", "last_xy", "z", "angle", "last_angle"]);
    }

    #[test]
    fn test_collision_masks_default_to_all_layers() {
        let collision = collision();
        assert_eq!(
            collision.field("from_mask").unwrap().default_value(),
            &FieldValue::Int(ALL_LAYERS)
        );
        assert_eq!(
            collision.field("into_mask").unwrap().ty(),
            FieldType::Int
        );
        assert_eq!(collision.fields().len(), 4);
    }

    #[test]
    fn test_shape_and_movement_fields() {
        assert_eq!(shape().field("verts").unwrap().ty(), FieldType::Vec2Array);
        assert_eq!(movement().field("rotation").unwrap().ty(), FieldType::Float);
        assert_eq!(renderable().field("color").unwrap().ty(), FieldType::Rgba);
    }
}
