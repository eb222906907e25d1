//! Sweep and prune broad phase
//!
//! Bounding box edges of every collision member are kept sorted along both
//! axes. Positions change little between steps, so re-sorting the nearly
//! sorted edge lists is cheap, and the algorithm stays linear in practice
//! without tuning for body size or spacing.

use std::any::Any;
use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use super::Pair;
use crate::ecs::components::ALL_LAYERS;
use crate::ecs::{Component, Entity, World};
use crate::error::Result;
use crate::geometry::{Rect, Vec2d};
use crate::systems::System;

/// Mask used when an entity's collision data has no mask field
const DEFAULT_MASK: i64 = ALL_LAYERS;

/// Edge side. Closing edges sort before opening edges at the same
/// coordinate, so boxes that merely touch do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Close,
    Open,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    pos: f64,
    side: Side,
    entity: Entity,
}

/// Collision data of one member as of the last step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBox {
    pub aabb: Rect,
    pub from_mask: i64,
    pub into_mask: i64,
}

impl CollisionBox {
    fn read(component: &Component, entity: Entity) -> Option<Self> {
        let mask = |field| {
            component
                .get_field(entity, field)
                .ok()
                .and_then(|value| value.as_int())
                .unwrap_or(DEFAULT_MASK)
        };
        Some(Self {
            aabb: component.get_field(entity, "aabb").ok()?.as_rect()?,
            from_mask: mask("from_mask"),
            into_mask: mask("into_mask"),
        })
    }

    /// Check the layer masks of two boxes
    #[must_use]
    pub fn collides_with(&self, other: &Self) -> bool {
        self.from_mask & other.into_mask != 0 || other.from_mask & self.into_mask != 0
    }

    fn x_edges(&self, entity: Entity) -> [Edge; 2] {
        [
            Edge {
                pos: self.aabb.left,
                side: Side::Open,
                entity,
            },
            Edge {
                pos: self.aabb.right,
                side: Side::Close,
                entity,
            },
        ]
    }

    fn y_edges(&self, entity: Entity) -> [Edge; 2] {
        [
            Edge {
                pos: self.aabb.bottom,
                side: Side::Open,
                entity,
            },
            Edge {
                pos: self.aabb.top,
                side: Side::Close,
                entity,
            },
        ]
    }
}

fn sort_edges(edges: &mut [Edge]) {
    // Stable merge sort; cheap on nearly sorted input.
    edges.sort_by(|a, b| a.pos.total_cmp(&b.pos).then(a.side.cmp(&b.side)));
}

/// 2D sweep and prune bounding box collision detection
#[derive(Debug, Clone)]
pub struct SapCollision {
    pub collision_component: String,
    axes: Option<(Vec<Edge>, Vec<Edge>)>,
    boxes: BTreeMap<Entity, CollisionBox>,
    pairs: Option<Vec<Pair>>,
}

impl Default for SapCollision {
    fn default() -> Self {
        Self::new("collision")
    }
}

impl SapCollision {
    #[must_use]
    pub fn new(collision_component: &str) -> Self {
        Self {
            collision_component: collision_component.to_string(),
            axes: None,
            boxes: BTreeMap::new(),
            pairs: None,
        }
    }

    /// Update and sort the axis lists from the collision component
    ///
    /// # Errors
    ///
    /// Returns an error if the collision component is missing or is not a
    /// field component.
    pub fn update(&mut self, world: &World) -> Result<()> {
        let component = world.component(&self.collision_component)?;
        match self.axes.as_mut() {
            None => {
                let mut by_x = Vec::new();
                let mut by_y = Vec::new();
                self.boxes.clear();
                for entity in component.entities().iter() {
                    if let Some(data) = CollisionBox::read(component, entity) {
                        by_x.extend(data.x_edges(entity));
                        by_y.extend(data.y_edges(entity));
                        self.boxes.insert(entity, data);
                    }
                }
                self.axes = Some((by_x, by_y));
            }
            Some((by_x, by_y)) => {
                // Refresh cached boxes, dropping members deleted from the
                // component.
                self.boxes.retain(|entity, data| match CollisionBox::read(component, *entity) {
                    Some(fresh) => {
                        *data = fresh;
                        true
                    }
                    None => false,
                });
                let boxes = &self.boxes;
                for edges in [&mut *by_x, &mut *by_y] {
                    edges.retain(|edge| boxes.contains_key(&edge.entity));
                }
                for edge in by_x.iter_mut() {
                    let aabb = boxes[&edge.entity].aabb;
                    edge.pos = if edge.side == Side::Open { aabb.left } else { aabb.right };
                }
                for edge in by_y.iter_mut() {
                    let aabb = boxes[&edge.entity].aabb;
                    edge.pos = if edge.side == Side::Open { aabb.bottom } else { aabb.top };
                }

                for &entity in component.new_entities() {
                    if self.boxes.contains_key(&entity) {
                        continue;
                    }
                    if let Some(data) = CollisionBox::read(component, entity) {
                        by_x.extend(data.x_edges(entity));
                        by_y.extend(data.y_edges(entity));
                        self.boxes.insert(entity, data);
                    }
                }
            }
        }
        if let Some((by_x, by_y)) = self.axes.as_mut() {
            sort_edges(by_x);
            sort_edges(by_y);
        }
        self.pairs = None;
        Ok(())
    }

    /// Collision data of a member as of the last step
    #[must_use]
    pub fn collision_box(&self, entity: Entity) -> Option<&CollisionBox> {
        self.boxes.get(&entity)
    }

    /// Pairs of members whose boxes overlap, recalculated on demand after
    /// each step. Empty before the first step.
    pub fn collision_pairs(&mut self) -> &[Pair] {
        if self.pairs.is_none() {
            self.pairs = Some(self.compute_pairs());
        }
        self.pairs.as_deref().unwrap_or_default()
    }

    fn compute_pairs(&self) -> Vec<Pair> {
        let Some((by_x, by_y)) = &self.axes else {
            return Vec::new();
        };

        // Candidates overlapping along x
        let mut candidates = FxHashSet::default();
        let mut open: Vec<Entity> = Vec::new();
        for edge in by_x {
            match edge.side {
                Side::Open => {
                    candidates.extend(open.iter().map(|&other| Pair::new(edge.entity, other)));
                    open.push(edge.entity);
                }
                Side::Close => open.retain(|&e| e != edge.entity),
            }
        }
        log::trace!("{} x-axis candidates", candidates.len());

        // Confirm along y
        let mut pairs = Vec::new();
        open.clear();
        for edge in by_y {
            if candidates.is_empty() {
                break;
            }
            match edge.side {
                Side::Open => {
                    for &other in &open {
                        let pair = Pair::new(other, edge.entity);
                        if candidates.remove(&pair) && self.masks_match(other, edge.entity) {
                            pairs.push(pair);
                        }
                    }
                    open.push(edge.entity);
                }
                Side::Close => open.retain(|&e| e != edge.entity),
            }
        }
        pairs
    }

    fn masks_match(&self, a: Entity, b: Entity) -> bool {
        match (self.boxes.get(&a), self.boxes.get(&b)) {
            (Some(a), Some(b)) => a.collides_with(b),
            _ => false,
        }
    }

    /// Members whose box contained `point` as of the last step
    #[must_use]
    pub fn query_point(&self, point: Vec2d) -> Vec<Entity> {
        let Some((by_x, _)) = &self.axes else {
            return Vec::new();
        };
        // Only boxes opening at or left of the point can contain it.
        let end = by_x.partition_point(|edge| edge.pos <= point.x);
        let mut hits: Vec<Entity> = by_x[..end]
            .iter()
            .filter(|edge| edge.side == Side::Open)
            .map(|edge| edge.entity)
            .filter(|entity| {
                self.boxes
                    .get(entity)
                    .is_some_and(|data| data.aabb.contains_point(point))
            })
            .collect();
        hits.sort();
        hits
    }
}

impl System for SapCollision {
    fn step(&mut self, world: &mut World, _dt: f64) -> Result<()> {
        self.update(world)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
