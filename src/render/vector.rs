//! Vector shape renderer

use std::any::Any;

use super::{DrawContext, Renderer};
use crate::ecs::{Row, World};
use crate::geometry::{Rgba, Vec2d};

/// Draws the `shape` outline of every entity that also has a `position` and
/// is `renderable`, in ascending `depth` order.
///
/// Shape vertices are rotated by the position angle (degrees), scaled and
/// offset by the position.
#[derive(Debug, Clone)]
pub struct VectorRenderer {
    pub position_component: String,
    pub shape_component: String,
    pub renderable_component: String,
    pub scale: f64,
    pub line_width: f64,
}

impl Default for VectorRenderer {
    fn default() -> Self {
        Self {
            position_component: String::from("position"),
            shape_component: String::from("shape"),
            renderable_component: String::from("renderable"),
            scale: 1.0,
            line_width: 1.0,
        }
    }
}

impl VectorRenderer {
    #[must_use]
    pub fn new(line_width: f64) -> Self {
        Self {
            line_width,
            ..Self::default()
        }
    }

    /// Outline points of a shape row placed by a position row
    #[must_use]
    pub fn transform(&self, position: &Row, shape: &Row) -> Vec<Vec2d> {
        let xy = position.get("xy").and_then(|v| v.as_vec2()).unwrap_or_default();
        let angle = position.get("angle").and_then(|v| v.as_f64()).unwrap_or_default();
        let rotation = Vec2d::from_angle(angle.to_radians());
        shape
            .get("verts")
            .and_then(|v| v.as_vec2_array())
            .unwrap_or_default()
            .iter()
            .map(|vert| xy + rotation.rotate(*vert * self.scale))
            .collect()
    }
}

fn depth(rows: &[Row]) -> f64 {
    rows[2].get("depth").and_then(|v| v.as_f64()).unwrap_or_default()
}

impl Renderer for VectorRenderer {
    fn draw(&mut self, world: &World, ctx: &mut dyn DrawContext) {
        let names = [
            self.position_component.as_str(),
            self.shape_component.as_str(),
            self.renderable_component.as_str(),
        ];
        let mut rows = match world.join(&names) {
            Ok(rows) => rows,
            Err(err) => {
                log::trace!("Vector renderer skipped: {err}");
                return;
            }
        };
        rows.sort_by(|(_, a), (_, b)| depth(a).total_cmp(&depth(b)));

        for (_, rows) in &rows {
            let points = self.transform(&rows[0], &rows[1]);
            if points.len() < 2 {
                continue;
            }
            let color = rows[2]
                .get("color")
                .and_then(|v| v.as_rgba())
                .filter(|color| color.a > 0.0)
                .or_else(|| rows[1].get("line_color").and_then(|v| v.as_rgba()))
                .filter(|color| color.a > 0.0)
                .unwrap_or(Rgba::WHITE);
            ctx.draw_polygon(&points, color, self.line_width);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
