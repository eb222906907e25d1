//! Worlds
//!
//! A world is a coordinated collection of components, systems and renderers.
//! Components hold the entity data, systems hold the behaviour run every
//! time step, and renderers present the world. The world owns its entities
//! and their kinds, and it is itself a [`Mode`] with its own clock so that it
//! can be pushed onto a [`crate::mode::Manager`].
//!
//! # Example
//!
//! ```ignore
//! let mut world = World::new();
//! world.components.set("position", Box::new(components::position()))?;
//! world.components.set("movement", Box::new(components::movement()))?;
//! world.systems.set("integrator", Box::new(EulerMovement::default()))?;
//!
//! let ship = world.create_entity(KindId::ROOT)?;
//! world.set(ship, "movement", [("velocity", Vec2d::new(10.0, 0.0).into())])?;
//! world.tick(1.0 / 60.0)?;
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

use super::{
    Component, ComponentStorage, Entity, EntityId, EntityIdGenerator, EntitySet, FieldValue, KindId,
    KindRegistry, Parts, Row, WorldEntities, WorldId,
};
use crate::core::config::WorldConfig;
use crate::core::events::{EventQueue, InputEvent, WorldEvent};
use crate::error::{GreaseError, Result};
use crate::mode::{Mode, ModeClock, STEP_TIMER, TimerId};
use crate::render::{ClearFlags, DrawContext, Renderer};
use crate::systems::System;

/// A callback scheduled on the world clock, called with the time elapsed
/// since it last ran
pub type WorldCallback = Box<dyn FnMut(&mut World, f64) -> Result<()>>;

/// Game world containing entities, components, systems and renderers
pub struct World {
    id: WorldId,
    /// Entity data, stepped in order before the systems
    pub components: Parts<dyn ComponentStorage>,
    /// Behaviour, stepped in order every time step
    pub systems: Parts<dyn System>,
    /// Presentation, drawn in order
    pub renderers: Parts<dyn Renderer>,
    entities: WorldEntities,
    id_gen: EntityIdGenerator,
    kinds: KindRegistry,
    kind_sets: BTreeMap<KindId, EntitySet>,
    clock: ModeClock,
    config: WorldConfig,
    active: bool,
    running: bool,
    events: EventQueue,
    callbacks: FxHashMap<TimerId, WorldCallback>,
}

impl World {
    /// Create an empty world with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create an empty world
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let id = WorldId::next();
        log::debug!("Created {id} stepping at {} Hz", config.step_rate);
        Self {
            id,
            components: Parts::new(id),
            systems: Parts::new(id),
            renderers: Parts::new(id),
            entities: WorldEntities::new(id),
            id_gen: EntityIdGenerator::new(),
            kinds: KindRegistry::new(),
            kind_sets: BTreeMap::new(),
            clock: ModeClock::new(config.step_rate),
            running: config.running,
            config,
            active: false,
            events: EventQueue::new(),
            callbacks: FxHashMap::default(),
        }
    }

    /// Create a world and run `configure` on it right away, typically to add
    /// components, systems and renderers.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `configure`.
    pub fn configured(
        config: WorldConfig,
        configure: impl FnOnce(&mut World) -> Result<()>,
    ) -> Result<Self> {
        let mut world = Self::with_config(config);
        configure(&mut world)?;
        Ok(world)
    }

    /// Identity of this world
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Settings the world was created with
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Register an entity kind under `parent`
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownKindId`] if the parent is not registered.
    pub fn register_kind(&mut self, name: &str, parent: KindId) -> Result<KindId> {
        self.kinds.register(name, parent)
    }

    /// The world's entity kinds
    #[must_use]
    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    /// Create a new entity of `kind`. The entity joins the kind sets of its
    /// kind and of every ancestor kind.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownKindId`] if the kind is not registered.
    pub fn create_entity(&mut self, kind: KindId) -> Result<Entity> {
        self.kinds.check(kind)?;
        let entity = Entity::new(self.id, self.id_gen.new_entity_id(kind));
        self.entities.add(entity)?;
        for ancestor in self.kinds.lineage(kind) {
            let world = self.id;
            self.kind_sets
                .entry(ancestor)
                .or_insert_with(|| EntitySet::new(world))
                .add(entity)?;
        }
        log::trace!("Created {entity}");
        Ok(entity)
    }

    /// Create a new entity of the kind named `kind`
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownKind`] if no kind has this name.
    pub fn create_entity_of(&mut self, kind: &str) -> Result<Entity> {
        let kind = self.kinds.by_name(kind)?;
        self.create_entity(kind)
    }

    fn forget(&mut self, entity: Entity) {
        for (_, component) in self.components.iter_mut() {
            component.remove(entity);
        }
        for set in self.kind_sets.values_mut() {
            set.discard(entity);
        }
        self.id_gen.recycle(entity.id);
        self.events.push(WorldEvent::EntityDeleted { entity });
        log::trace!("Deleted {entity}");
    }

    /// Remove an entity from the world, deleting its data from every
    /// component. Its id is recycled with a new generation.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] for entities of another world
    /// and [`GreaseError::NoSuchEntity`] if the entity is not alive.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<()> {
        if entity.world != self.id {
            return Err(GreaseError::DifferentWorld);
        }
        self.entities.remove(entity)?;
        self.forget(entity);
        Ok(())
    }

    /// Remove an entity if it is alive. Returns whether it was removed.
    pub fn discard_entity(&mut self, entity: Entity) -> bool {
        self.contains(entity) && self.remove_entity(entity).is_ok()
    }

    /// Remove every live member of `entities` from the world. Returns the
    /// number of entities removed.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] for a set of another world.
    pub fn delete(&mut self, entities: &EntitySet) -> Result<usize> {
        let doomed = self.entities.discard_set(entities)?;
        for &entity in &doomed {
            self.forget(entity);
        }
        Ok(doomed.len())
    }

    /// Check if an entity is alive in this world
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        entity.world == self.id && self.entities.contains(entity)
    }

    /// Look up a live entity by id
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchEntity`] if no live entity has this id.
    pub fn get(&self, id: EntityId) -> Result<Entity> {
        self.entities.get(id)
    }

    /// All live entities
    #[must_use]
    pub fn entities(&self) -> &WorldEntities {
        &self.entities
    }

    /// Entities of `kind` or any kind descending from it
    #[must_use]
    pub fn kind_set(&self, kind: KindId) -> EntitySet {
        self.kind_sets
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| EntitySet::new(self.id))
    }

    /// Entities of any of `kinds`
    ///
    /// # Errors
    ///
    /// Never fails in practice; kind sets always belong to this world.
    pub fn kinds_union(&self, kinds: &[KindId]) -> Result<EntitySet> {
        let mut union = EntitySet::new(self.id);
        for set in kinds.iter().filter_map(|kind| self.kind_sets.get(kind)) {
            union.update(set)?;
        }
        Ok(union)
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Get a field component by name
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchComponent`] if no component has this name
    /// and [`GreaseError::NotFieldComponent`] if it is not a [`Component`].
    pub fn component(&self, name: &str) -> Result<&Component> {
        self.components
            .get(name)
            .ok_or_else(|| GreaseError::NoSuchComponent(name.to_string()))?
            .as_any()
            .downcast_ref()
            .ok_or_else(|| GreaseError::NotFieldComponent(name.to_string()))
    }

    /// Get a field component mutably by name
    ///
    /// # Errors
    ///
    /// Same as [`World::component`].
    pub fn component_mut(&mut self, name: &str) -> Result<&mut Component> {
        self.components
            .get_mut(name)
            .ok_or_else(|| GreaseError::NoSuchComponent(name.to_string()))?
            .as_any_mut()
            .downcast_mut()
            .ok_or_else(|| GreaseError::NotFieldComponent(name.to_string()))
    }

    /// Set component data for a live entity, adding it to the component if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::DifferentWorld`] or
    /// [`GreaseError::DeletedEntity`] if the entity is not alive here, and
    /// the component's errors for bad data.
    pub fn set<'a>(
        &mut self,
        entity: Entity,
        component: &str,
        data: impl IntoIterator<Item = (&'a str, FieldValue)>,
    ) -> Result<()> {
        if entity.world != self.id {
            return Err(GreaseError::DifferentWorld);
        }
        if !self.entities.contains(entity) {
            return Err(GreaseError::DeletedEntity(entity.id));
        }
        self.component_mut(component)?
            .set(entity, data)
            .map_err(|err| match err {
                GreaseError::UnknownField { field, .. } => GreaseError::UnknownField {
                    component: component.to_string(),
                    field,
                },
                other => other,
            })
    }

    /// An entity's data in one component
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchComponent`] or
    /// [`GreaseError::NoSuchEntity`] if the entity has no data there.
    pub fn get_row(&self, entity: Entity, component: &str) -> Result<Row> {
        self.components
            .get(component)
            .ok_or_else(|| GreaseError::NoSuchComponent(component.to_string()))?
            .row(entity)
            .ok_or(GreaseError::NoSuchEntity(entity.id))
    }

    fn storages<'a>(&'a self, names: &[&str]) -> Result<Vec<&'a dyn ComponentStorage>> {
        names
            .iter()
            .map(|name| {
                self.components
                    .get(name)
                    .ok_or_else(|| GreaseError::NoSuchComponent((*name).to_string()))
            })
            .collect()
    }

    /// Entities present in every named component. No names gives an empty
    /// set.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchComponent`] for unknown names.
    pub fn entities_in(&self, names: &[&str]) -> Result<EntitySet> {
        let storages = self.storages(names)?;
        let Some((first, rest)) = storages.split_first() else {
            return Ok(EntitySet::new(self.id));
        };
        let mut common = first.entities().clone();
        for storage in rest {
            common.intersection_update(storage.entities())?;
        }
        Ok(common)
    }

    /// Entities present in every named component, each with its rows in the
    /// order of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSuchComponent`] for unknown names.
    pub fn join(&self, names: &[&str]) -> Result<Vec<(Entity, Vec<Row>)>> {
        let storages = self.storages(names)?;
        let common = self.entities_in(names)?;
        Ok(common
            .iter()
            .filter_map(|entity| {
                let rows = storages
                    .iter()
                    .map(|storage| storage.row(entity))
                    .collect::<Option<Vec<Row>>>()?;
                Some((entity, rows))
            })
            .collect())
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Run `callback` once after `delay` seconds of world time
    pub fn schedule_once(
        &mut self,
        delay: f64,
        callback: impl FnMut(&mut World, f64) -> Result<()> + 'static,
    ) -> TimerId {
        let timer = self.clock.schedule_once(delay);
        self.callbacks.insert(timer, Box::new(callback));
        timer
    }

    /// Run `callback` every `interval` seconds of world time
    pub fn schedule_interval(
        &mut self,
        interval: f64,
        callback: impl FnMut(&mut World, f64) -> Result<()> + 'static,
    ) -> TimerId {
        let timer = self.clock.schedule_interval(interval);
        self.callbacks.insert(timer, Box::new(callback));
        timer
    }

    /// Cancel a scheduled callback. The step timer cannot be cancelled.
    pub fn unschedule(&mut self, timer: TimerId) -> bool {
        if timer == STEP_TIMER {
            return false;
        }
        self.callbacks.remove(&timer);
        self.clock.unschedule(timer)
    }

    /// Resume the world clock
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Pause the world clock. Ticks are ignored until [`World::start`].
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Check if the world clock is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// World clock time in seconds
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    /// The world clock
    #[must_use]
    pub fn clock(&self) -> &ModeClock {
        &self.clock
    }

    /// Change the number of steps per second
    pub fn set_step_rate(&mut self, step_rate: f64) {
        self.config.step_rate = step_rate;
        self.clock.set_step_rate(step_rate);
    }

    // ========================================================================
    // Events and drawing
    // ========================================================================

    /// World events of the previous step
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// World event queue, for pushing events
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Clear the frame and run every renderer in order
    pub fn on_draw(&mut self, ctx: &mut dyn DrawContext) {
        ctx.clear(ClearFlags::ALL);
        ctx.load_identity();
        for name in self.renderers.names() {
            if let Some(mut renderer) = self.renderers.take(&name) {
                renderer.draw(self, ctx);
                self.renderers.restore(&name, renderer);
            }
        }
    }

    fn run_callback(&mut self, timer: TimerId, elapsed: f64) -> Result<()> {
        let Some(mut callback) = self.callbacks.remove(&timer) else {
            return Ok(());
        };
        let result = callback(self, elapsed);
        if self.clock.is_scheduled(timer) {
            self.callbacks.entry(timer).or_insert(callback);
        }
        result
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for World {
    fn name(&self) -> &str {
        "World"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) -> Result<()> {
        if !self.active {
            self.active = true;
            log::debug!("{} activated with systems {:?}", self.id, self.systems.names());
        }
        Ok(())
    }

    fn deactivate(&mut self) {
        if self.active {
            log::debug!("{} deactivated", self.id);
        }
        self.active = false;
    }

    /// Execute a time step: components first, then systems, each in order.
    /// `dt` is clamped to a few step intervals so a stalled frame does not
    /// cause a huge jump.
    fn step(&mut self, dt: f64) -> Result<()> {
        let dt = dt.min(self.config.max_dt_steps / self.clock.step_rate());
        self.events.swap();
        for (_, component) in self.components.iter_mut() {
            component.step(dt);
        }
        for name in self.systems.names() {
            if let Some(mut system) = self.systems.take(&name) {
                let result = system.step(self, dt);
                self.systems.restore(&name, system);
                result?;
            }
        }
        Ok(())
    }

    /// Advance the world clock, running due steps and scheduled callbacks.
    /// Does nothing while the world is stopped.
    fn tick(&mut self, dt: f64) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        for fired in self.clock.tick(dt) {
            if fired.timer == STEP_TIMER {
                self.step(fired.elapsed)?;
            } else {
                self.run_callback(fired.timer, fired.elapsed)?;
            }
        }
        Ok(())
    }

    fn step_rate(&self) -> f64 {
        self.clock.step_rate()
    }

    /// Offer an input event to each system in order until one consumes it.
    fn handle_event(&mut self, event: &InputEvent) -> Result<bool> {
        if !self.active {
            return Ok(false);
        }
        for name in self.systems.names() {
            if let Some(mut system) = self.systems.take(&name) {
                let result = system.on_event(self, event);
                self.systems.restore(&name, system);
                if result? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn draw(&mut self, ctx: &mut dyn DrawContext) {
        self.on_draw(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("entities", &self.entities.len())
            .field("components", &self.components.names())
            .field("systems", &self.systems.names())
            .field("renderers", &self.renderers.names())
            .field("time", &self.clock.time())
            .field("active", &self.active)
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::events::{Key, Modifiers};
    use crate::ecs::{FieldType, components};
    use crate::render::{DrawCommand, RecordingContext};
    use crate::systems::FnSystem;

    type Log = Rc<RefCell<Vec<String>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    struct Recorder {
        label: &'static str,
        log: Log,
        consume: bool,
    }

    impl System for Recorder {
        fn step(&mut self, _world: &mut World, dt: f64) -> Result<()> {
            self.log.borrow_mut().push(format!("{} {dt}", self.label));
            Ok(())
        }

        fn on_event(&mut self, _world: &mut World, _event: &InputEvent) -> Result<bool> {
            self.log.borrow_mut().push(format!("{} event", self.label));
            Ok(self.consume)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn recorder(label: &'static str, log: &Log, consume: bool) -> Box<dyn System> {
        Box::new(Recorder {
            label,
            log: Rc::clone(log),
            consume,
        })
    }

    fn health_world() -> World {
        let mut world = World::new();
        world
            .components
            .set("health", Box::new(Component::with_fields([("hp", FieldType::Int)])))
            .unwrap();
        world
    }

    #[test]
    fn test_new_world_defaults() {
        let world = World::new();
        assert!((world.step_rate() - 60.0).abs() < f64::EPSILON);
        assert!(world.is_running());
        assert!(!world.is_active());
        assert!(world.time().abs() < f64::EPSILON);
        assert!(world.entities().is_empty());
    }

    #[test]
    fn test_configured_runs_hook() {
        let world = World::configured(WorldConfig::default().with_step_rate(30.0), |world| {
            world.components.set("position", Box::new(components::position()))?;
            Ok(())
        })
        .unwrap();
        assert!(world.components.contains("position"));
        assert!((world.step_rate() - 30.0).abs() < f64::EPSILON);

        let failed = World::configured(WorldConfig::default(), |world| {
            world.components.set("world", Box::new(components::position()))?;
            Ok(())
        });
        assert!(matches!(failed, Err(GreaseError::IllegalPartName(_))));
    }

    #[test]
    fn test_create_and_remove_entity() {
        let mut world = health_world();
        let entity = world.create_entity(KindId::ROOT).unwrap();
        assert!(world.contains(entity));
        assert_eq!(world.get(entity.id).unwrap(), entity);

        world.set(entity, "health", [("hp", 5.into())]).unwrap();
        world.remove_entity(entity).unwrap();
        assert!(!world.contains(entity));
        assert!(!world.component("health").unwrap().contains(entity));
        assert_eq!(world.remove_entity(entity), Err(GreaseError::NoSuchEntity(entity.id)));
        assert!(!world.discard_entity(entity));

        // Recycled id comes back with a new generation.
        let reborn = world.create_entity(KindId::ROOT).unwrap();
        assert_eq!(reborn.id.index, entity.id.index);
        assert_eq!(reborn.id.generation, entity.id.generation + 1);
        assert!(world.get(entity.id).is_err());
    }

    #[test]
    fn test_entity_deleted_event() {
        let mut world = World::new();
        let entity = world.create_entity(KindId::ROOT).unwrap();
        world.remove_entity(entity).unwrap();
        assert!(world.events().is_empty());

        world.step(0.01).unwrap();
        let events: Vec<&WorldEvent> = world.events().iter().collect();
        assert_eq!(events, vec![&WorldEvent::EntityDeleted { entity }]);
    }

    #[test]
    fn test_kind_sets_follow_lineage() {
        let mut world = World::new();
        let sprite = world.register_kind("Sprite", KindId::ROOT).unwrap();
        let ship = world.register_kind("Ship", sprite).unwrap();
        let rock = world.register_kind("Rock", sprite).unwrap();

        let player = world.create_entity(ship).unwrap();
        let asteroid = world.create_entity_of("Rock").unwrap();
        let marker = world.create_entity(KindId::ROOT).unwrap();

        assert_eq!(world.kind_set(ship).len(), 1);
        assert!(world.kind_set(sprite).contains(asteroid));
        assert_eq!(world.kind_set(KindId::ROOT).len(), 3);
        assert!(world.kind_set(KindId(99)).is_empty());
        assert_eq!(world.kinds_union(&[ship, rock]).unwrap().len(), 2);
        assert!(matches!(world.create_entity(KindId(99)), Err(GreaseError::UnknownKindId(99))));
        assert!(world.create_entity_of("Nope").is_err());

        world.remove_entity(player).unwrap();
        assert!(world.kind_set(sprite).len() == 1 && world.kind_set(ship).is_empty());
        assert!(world.kind_set(KindId::ROOT).contains(marker));
    }

    #[test]
    fn test_delete_set_cascades() {
        let mut world = health_world();
        let rock = world.register_kind("Rock", KindId::ROOT).unwrap();
        let rocks: Vec<Entity> = (0..3).map(|_| world.create_entity(rock).unwrap()).collect();
        let keeper = world.create_entity(KindId::ROOT).unwrap();
        for &entity in rocks.iter().chain([&keeper]) {
            world.set(entity, "health", [("hp", 1.into())]).unwrap();
        }

        let doomed = world.kind_set(rock);
        assert_eq!(world.delete(&doomed).unwrap(), 3);
        assert_eq!(world.entities().len(), 1);
        assert!(world.kind_set(rock).is_empty());
        assert_eq!(world.component("health").unwrap().entities().len(), 1);
        assert_eq!(world.delete(&doomed).unwrap(), 0);

        let other = World::new();
        assert_eq!(world.delete(&other.kind_set(KindId::ROOT)), Err(GreaseError::DifferentWorld));
    }

    #[test]
    fn test_set_checks_entity_and_component() {
        let mut world = health_world();
        let entity = world.create_entity(KindId::ROOT).unwrap();

        assert_eq!(
            world.set(entity, "mana", [("mp", 1.into())]),
            Err(GreaseError::NoSuchComponent("mana".to_string()))
        );
        assert_eq!(
            world.set(entity, "health", [("mp", 1.into())]),
            Err(GreaseError::UnknownField {
                component: "health".to_string(),
                field: "mp".to_string()
            })
        );

        let mut other = World::new();
        let stranger = other.create_entity(KindId::ROOT).unwrap();
        assert_eq!(
            world.set(stranger, "health", [("hp", 1.into())]),
            Err(GreaseError::DifferentWorld)
        );

        world.remove_entity(entity).unwrap();
        assert_eq!(
            world.set(entity, "health", [("hp", 1.into())]),
            Err(GreaseError::DeletedEntity(entity.id))
        );
    }

    #[test]
    fn test_join_rows_in_name_order() {
        let mut world = World::new();
        world.components.set("position", Box::new(components::position())).unwrap();
        world.components.set("movement", Box::new(components::movement())).unwrap();
        let both = world.create_entity(KindId::ROOT).unwrap();
        let one = world.create_entity(KindId::ROOT).unwrap();
        world.set(both, "position", [("z", 2.0.into())]).unwrap();
        world.set(both, "movement", [("rotation", 3.0.into())]).unwrap();
        world.set(one, "position", [("z", 1.0.into())]).unwrap();

        let joined = world.join(&["movement", "position"]).unwrap();
        assert_eq!(joined.len(), 1);
        let (entity, rows) = &joined[0];
        assert_eq!(*entity, both);
        assert_eq!(rows[0]["rotation"], FieldValue::Float(3.0));
        assert_eq!(rows[1]["z"], FieldValue::Float(2.0));

        assert_eq!(world.join(&["position"]).unwrap().len(), 2);
        assert!(world.join(&[]).unwrap().is_empty());
        assert_eq!(world.join(&["nope"]), Err(GreaseError::NoSuchComponent("nope".to_string())));
        assert_eq!(world.get_row(one, "position").unwrap()["z"], FieldValue::Float(1.0));
    }

    #[test]
    fn test_step_runs_systems_in_order_with_clamped_dt() {
        let log = log();
        let mut world = World::new();
        world.systems.set("b", recorder("b", &log, false)).unwrap();
        world
            .systems
            .insert("a", recorder("a", &log, false), crate::ecs::Placement::Index(0))
            .unwrap();

        world.step(0.5).unwrap();
        let max_dt = 10.0 / 60.0;
        assert_eq!(*log.borrow(), vec![format!("a {max_dt}"), format!("b {max_dt}")]);
    }

    #[test]
    fn test_systems_added_during_step_run_next_step() {
        let log = log();
        let mut world = World::new();
        let added = Rc::clone(&log);
        world
            .systems
            .set(
                "spawner",
                Box::new(FnSystem(move |world: &mut World, _dt: f64| {
                    if !world.systems.contains("late") {
                        world.systems.set("late", recorder("late", &added, false))?;
                    }
                    Ok(())
                })),
            )
            .unwrap();

        world.step(0.01).unwrap();
        assert!(log.borrow().is_empty());
        world.step(0.01).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_system_can_remove_itself() {
        let mut world = World::new();
        world
            .systems
            .set(
                "once",
                Box::new(FnSystem(|world: &mut World, _dt: f64| {
                    world.systems.remove("once")?;
                    Ok(())
                })),
            )
            .unwrap();
        world.step(0.01).unwrap();
        assert!(world.systems.is_empty());
    }

    #[test]
    fn test_tick_steps_at_rate_and_respects_stop() {
        let log = log();
        let mut world = World::with_config(WorldConfig::default().with_step_rate(10.0));
        world.systems.set("rec", recorder("rec", &log, false)).unwrap();

        world.tick(0.05).unwrap();
        assert!(log.borrow().is_empty());
        world.tick(0.05).unwrap();
        assert_eq!(log.borrow().len(), 1);

        world.stop();
        world.tick(1.0).unwrap();
        assert_eq!(log.borrow().len(), 1);
        assert!((world.time() - 0.1).abs() < 1e-9);

        world.start();
        world.tick(0.1).unwrap();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_scheduled_callbacks() {
        let mut world = World::with_config(WorldConfig::default().with_step_rate(1.0));
        let health = Component::with_fields([("hp", FieldType::Int)]);
        world.components.set("health", Box::new(health)).unwrap();
        let entity = world.create_entity(KindId::ROOT).unwrap();
        world.set(entity, "health", [("hp", 0.into())]).unwrap();

        let regen = world.schedule_interval(0.25, move |world, _elapsed| {
            let hp = world.component("health")?.get_field(entity, "hp")?.as_int().unwrap_or(0);
            world.set(entity, "health", [("hp", (hp + 1).into())])
        });
        world.schedule_once(0.3, move |world, _elapsed| {
            world.set(entity, "health", [("hp", 100.into())])
        });

        world.tick(0.25).unwrap();
        assert_eq!(world.get_row(entity, "health").unwrap()["hp"], FieldValue::Int(1));
        world.tick(0.25).unwrap();
        // Interval fires, then the one-shot overrides.
        assert_eq!(world.get_row(entity, "health").unwrap()["hp"], FieldValue::Int(100));

        assert!(world.unschedule(regen));
        assert!(!world.unschedule(STEP_TIMER));
        world.tick(0.25).unwrap();
        assert_eq!(world.get_row(entity, "health").unwrap()["hp"], FieldValue::Int(100));
    }

    #[test]
    fn test_handle_event_only_while_active() {
        let log = log();
        let mut world = World::new();
        world.systems.set("first", recorder("first", &log, true)).unwrap();
        world.systems.set("second", recorder("second", &log, false)).unwrap();
        let event = InputEvent::KeyPress {
            key: Key::Up,
            modifiers: Modifiers::NONE,
        };

        assert!(!world.handle_event(&event).unwrap());
        assert!(log.borrow().is_empty());

        world.activate().unwrap();
        assert!(world.handle_event(&event).unwrap());
        assert_eq!(*log.borrow(), vec!["first event"]);

        world.deactivate();
        assert!(!world.handle_event(&event).unwrap());
    }

    #[test]
    fn test_on_draw_clears_then_renders() {
        struct Counter;
        impl Renderer for Counter {
            fn draw(&mut self, world: &World, ctx: &mut dyn DrawContext) {
                for _ in world.entities().iter() {
                    ctx.draw_polygon(&[], crate::geometry::Rgba::WHITE, 1.0);
                }
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let mut world = World::new();
        world.renderers.set("counter", Box::new(Counter)).unwrap();
        world.create_entity(KindId::ROOT).unwrap();
        world.create_entity(KindId::ROOT).unwrap();

        let mut ctx = RecordingContext::new();
        world.draw(&mut ctx);
        assert_eq!(ctx.commands()[0], DrawCommand::Clear(ClearFlags::ALL));
        assert_eq!(ctx.commands()[1], DrawCommand::LoadIdentity);
        assert_eq!(ctx.polygon_count(), 2);
    }

    #[test]
    fn test_component_downcast_errors() {
        struct Tags(EntitySet);
        impl ComponentStorage for Tags {
            fn attach(&mut self, world: WorldId) {
                self.0 = EntitySet::new(world);
            }
            fn entities(&self) -> &EntitySet {
                &self.0
            }
            fn remove(&mut self, entity: Entity) -> bool {
                self.0.discard(entity)
            }
            fn row(&self, entity: Entity) -> Option<Row> {
                self.0.contains(entity).then(Row::new)
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        let mut world = World::new();
        world
            .components
            .set("tags", Box::new(Tags(EntitySet::new(WorldId::DETACHED))))
            .unwrap();
        assert_eq!(
            world.component("tags").unwrap_err(),
            GreaseError::NotFieldComponent("tags".to_string())
        );
        assert_eq!(
            world.component("missing").unwrap_err(),
            GreaseError::NoSuchComponent("missing".to_string())
        );
    }
}
