//! 2D geometry primitives used by component fields
//!
//! Vectors are double precision [`glam::DVec2`] values; rectangles and
//! colors are small `Copy` structs that serialize with serde.

mod color;
mod rect;

pub use color::Rgba;
pub use rect::Rect;

/// Double precision 2D vector.
pub type Vec2d = glam::DVec2;
