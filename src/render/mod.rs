//! Rendering seam
//!
//! Worlds draw through [`Renderer`] parts onto a [`DrawContext`]. The crate
//! ships no GPU backend: a window layer implements [`DrawContext`] on top of
//! its graphics API, while headless runs and tests use [`RecordingContext`].

mod vector;

pub use vector::VectorRenderer;

use std::any::Any;
use std::ops::BitOr;

use crate::ecs::{Part, World};
use crate::geometry::{Rgba, Vec2d};

/// Buffers to clear at the start of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearFlags(u8);

impl ClearFlags {
    pub const COLOR: Self = Self(1);
    pub const DEPTH: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::COLOR.0 | Self::DEPTH.0);

    /// Check if all flags in `other` are set
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ClearFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Drawing surface
pub trait DrawContext {
    /// Clear buffers
    fn clear(&mut self, flags: ClearFlags);

    /// Reset the current transform
    fn load_identity(&mut self);

    /// Draw a polygon outline in world coordinates
    fn draw_polygon(&mut self, _points: &[Vec2d], _color: Rgba, _line_width: f64) {}
}

/// A presentation part of a world
pub trait Renderer: Any {
    /// Draw the world
    fn draw(&mut self, world: &World, ctx: &mut dyn DrawContext);

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Part for dyn Renderer {}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(ClearFlags),
    LoadIdentity,
    Polygon {
        points: Vec<Vec2d>,
        color: Rgba,
        line_width: f64,
    },
}

/// Draw context that records calls instead of drawing
#[derive(Debug, Default, Clone)]
pub struct RecordingContext {
    commands: Vec<DrawCommand>,
}

impl RecordingContext {
    /// Create an empty recording
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands in order
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of polygons drawn
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Polygon { .. }))
            .count()
    }

    /// Forget everything recorded so far
    pub fn reset(&mut self) {
        self.commands.clear();
    }
}

impl DrawContext for RecordingContext {
    fn clear(&mut self, flags: ClearFlags) {
        self.commands.push(DrawCommand::Clear(flags));
    }

    fn load_identity(&mut self) {
        self.commands.push(DrawCommand::LoadIdentity);
    }

    fn draw_polygon(&mut self, points: &[Vec2d], color: Rgba, line_width: f64) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
            line_width,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_flags() {
        assert!(ClearFlags::ALL.contains(ClearFlags::COLOR));
        assert!(ClearFlags::ALL.contains(ClearFlags::COLOR | ClearFlags::DEPTH));
        assert!(!ClearFlags::DEPTH.contains(ClearFlags::COLOR));
    }

    #[test]
    fn test_recording_context() {
        let mut ctx = RecordingContext::new();
        ctx.clear(ClearFlags::ALL);
        ctx.load_identity();
        ctx.draw_polygon(&[Vec2d::ZERO, Vec2d::X], Rgba::WHITE, 1.0);

        assert_eq!(ctx.commands().len(), 3);
        assert_eq!(ctx.commands()[0], DrawCommand::Clear(ClearFlags::ALL));
        assert_eq!(ctx.polygon_count(), 1);

        ctx.reset();
        assert!(ctx.commands().is_empty());
    }
}
