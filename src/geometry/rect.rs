//! Axis-aligned rectangles
//!
//! Used for bounding boxes in the collision component.

use serde::{Deserialize, Serialize};

use super::Vec2d;

/// An axis-aligned rectangle in world units.
///
/// Edges are inclusive: a point on the border is contained, and two
/// rectangles that share an edge intersect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum x
    pub left: f64,
    /// Minimum y
    pub bottom: f64,
    /// Maximum x
    pub right: f64,
    /// Maximum y
    pub top: f64,
}

impl Rect {
    /// Create a rectangle from its edges
    #[must_use]
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Create a rectangle centered on a point
    #[must_use]
    pub fn from_center(center: Vec2d, half_extents: Vec2d) -> Self {
        Self::new(
            center.x - half_extents.x,
            center.y - half_extents.y,
            center.x + half_extents.x,
            center.y + half_extents.y,
        )
    }

    /// Width of the rectangle
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height of the rectangle
    #[must_use]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Center point
    #[must_use]
    pub fn center(&self) -> Vec2d {
        Vec2d::new(
            (self.left + self.right) * 0.5,
            (self.bottom + self.top) * 0.5,
        )
    }

    /// Check if a point is inside the rectangle
    #[must_use]
    pub fn contains_point(&self, point: Vec2d) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.bottom
            && point.y <= self.top
    }

    /// Check if two rectangles overlap or touch
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.bottom <= other.top
            && other.bottom <= self.top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_point() {
        let rect = Rect::new(10.0, 10.0, 110.0, 60.0);

        assert!(rect.contains_point(Vec2d::new(50.0, 30.0)));
        assert!(rect.contains_point(Vec2d::new(10.0, 60.0)));
        assert!(!rect.contains_point(Vec2d::new(5.0, 5.0)));
    }

    #[test]
    fn test_rect_from_center() {
        let rect = Rect::from_center(Vec2d::new(5.0, -5.0), Vec2d::new(2.0, 1.0));

        assert!((rect.width() - 4.0).abs() < f64::EPSILON);
        assert!((rect.height() - 2.0).abs() < f64::EPSILON);
        assert_eq!(rect.center(), Vec2d::new(5.0, -5.0));
    }

    #[test]
    fn test_rect_intersects_touching_edges() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(1.0, 0.5, 2.0, 2.0);
        let c = Rect::new(1.5, 0.0, 2.0, 1.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }
}
