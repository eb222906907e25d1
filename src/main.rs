//! Headless asteroids demo
//!
//! A ship drifts through an asteroid field, steered by a scripted sequence
//! of key events. Bullets break asteroids on contact. Run with
//! `RUST_LOG=info` (or `debug`) to follow along. An engine config file in
//! RON or JSON may be passed as the first argument.

use std::path::Path;

use bgrease::prelude::*;

const FIELD: Rect = Rect::new(-200.0, -150.0, 200.0, 150.0);
const SHIP_TURN: f64 = 180.0;
const SHIP_THRUST: f64 = 60.0;
const BULLET_SPEED: f64 = 150.0;
const BULLET_LIFE: f64 = 1.5;

#[derive(Debug, Clone, Copy)]
struct Kinds {
    ship: KindId,
    asteroid: KindId,
    bullet: KindId,
}

fn heading(angle: f64) -> Vec2d {
    Vec2d::from_angle(angle.to_radians()).rotate(Vec2d::Y)
}

fn the_ship(world: &World, kinds: Kinds) -> Option<Entity> {
    world.kind_set(kinds.ship).iter().next()
}

fn polygon(points: usize, radius: f64) -> Vec<Vec2d> {
    (0..points)
        .map(|i| {
            let wobble = if i % 2 == 0 { 1.0 } else { 0.8 };
            Vec2d::from_angle(std::f64::consts::TAU * i as f64 / points as f64) * radius * wobble
        })
        .collect()
}

fn spawn(
    world: &mut World,
    kind: KindId,
    xy: Vec2d,
    velocity: Vec2d,
    verts: Vec<Vec2d>,
    radius: f64,
) -> Result<Entity> {
    let entity = world.create_entity(kind)?;
    world.set(entity, "position", [("xy", xy.into())])?;
    world.set(entity, "movement", [("velocity", velocity.into())])?;
    world.set(entity, "shape", [("verts", verts.into())])?;
    world.set(entity, "renderable", [("color", Rgba::WHITE.into())])?;
    world.set(entity, "collision", [("radius", radius.into())])?;
    Ok(entity)
}

/// Move anything leaving the field to the opposite edge
fn wrap_around(world: &mut World, _dt: f64) -> Result<()> {
    let position = world.component_mut("position")?;
    let members = position.entities().clone();
    for entity in members.iter() {
        let mut xy = position.get_field(entity, "xy")?.as_vec2().unwrap_or_default();
        if xy.x < FIELD.left {
            xy.x += FIELD.width();
        } else if xy.x > FIELD.right {
            xy.x -= FIELD.width();
        }
        if xy.y < FIELD.bottom {
            xy.y += FIELD.height();
        } else if xy.y > FIELD.top {
            xy.y -= FIELD.height();
        }
        position.set_field(entity, "xy", xy)?;
    }
    Ok(())
}

fn controls(kinds: Kinds) -> Result<KeyControls> {
    let mut controls = KeyControls::new();
    for (name, direction) in [("turn_left", 1.0), ("turn_right", -1.0)] {
        controls.define_hold(name, move |world, dt| {
            if let Some(ship) = the_ship(world, kinds) {
                let position = world.component_mut("position")?;
                let angle = position.get_field(ship, "angle")?.as_f64().unwrap_or_default();
                position.set_field(ship, "angle", angle + direction * SHIP_TURN * dt)?;
            }
            Ok(())
        });
    }
    controls.define_hold("thrust", move |world, _dt| {
        if let Some(ship) = the_ship(world, kinds) {
            let angle = world
                .component("position")?
                .get_field(ship, "angle")?
                .as_f64()
                .unwrap_or_default();
            world.set(ship, "movement", [("accel", (heading(angle) * SHIP_THRUST).into())])?;
        }
        Ok(())
    });
    controls.define_release("thrust_off", move |world| {
        if let Some(ship) = the_ship(world, kinds) {
            world.set(ship, "movement", [("accel", Vec2d::ZERO.into())])?;
        }
        Ok(())
    });
    controls.define_press("fire", move |world| {
        let Some(ship) = the_ship(world, kinds) else {
            return Ok(());
        };
        let position = world.component("position")?;
        let xy = position.get_field(ship, "xy")?.as_vec2().unwrap_or_default();
        let angle = position.get_field(ship, "angle")?.as_f64().unwrap_or_default();
        let velocity = heading(angle) * BULLET_SPEED;
        let bullet = spawn(world, kinds.bullet, xy, velocity, polygon(4, 1.0), 1.0)?;
        world.schedule_once(BULLET_LIFE, move |world, _| {
            world.discard_entity(bullet);
            Ok(())
        });
        Ok(())
    });

    controls.bind_hold(Some("turn_left"), Key::Left, Modifiers::NONE)?;
    controls.bind_hold(Some("turn_right"), Key::Right, Modifiers::NONE)?;
    controls.bind_hold(Some("thrust"), Key::Up, Modifiers::NONE)?;
    controls.bind_release(Some("thrust_off"), Key::Up, Modifiers::NONE)?;
    controls.bind_press(Some("fire"), Key::Space, Modifiers::NONE)?;
    Ok(controls)
}

/// Resolve last step's collisions: bullets break asteroids, asteroids
/// send the ship back to the middle.
fn impacts(kinds: Kinds) -> impl FnMut(&mut World, f64) -> Result<()> {
    move |world, _dt| {
        let hits: Vec<(Entity, Entity)> = world.events().collisions().collect();
        for (a, b) in hits {
            let (a, b) = if a.kind() <= b.kind() { (a, b) } else { (b, a) };
            if a.kind() == kinds.ship && b.kind() == kinds.asteroid && world.contains(a) {
                log::info!("Ship hit by {b}");
                world.set(a, "position", [("xy", Vec2d::ZERO.into())])?;
                world.set(a, "movement", [("velocity", Vec2d::ZERO.into())])?;
            } else if a.kind() == kinds.asteroid
                && b.kind() == kinds.bullet
                && world.discard_entity(b)
            {
                log::info!("Asteroid {a} destroyed");
                world.discard_entity(a);
            }
        }
        Ok(())
    }
}

fn asteroid_field() -> Result<World> {
    World::configured(WorldConfig::default(), |world| {
        let kinds = Kinds {
            ship: world.register_kind("ship", KindId::ROOT)?,
            asteroid: world.register_kind("asteroid", KindId::ROOT)?,
            bullet: world.register_kind("bullet", KindId::ROOT)?,
        };

        world.components.set("position", Box::new(components::position()))?;
        world.components.set("movement", Box::new(components::movement()))?;
        world.components.set("shape", Box::new(components::shape()))?;
        world.components.set("renderable", Box::new(components::renderable()))?;
        world.components.set("collision", Box::new(components::collision()))?;

        world.systems.set("controls", Box::new(controls(kinds)?))?;
        world.systems.set("movement", Box::new(EulerMovement::default()))?;
        world.systems.set("wrap", Box::new(FnSystem(wrap_around)))?;
        world
            .systems
            .set("collision", Box::new(Circular::default().with_handler(dispatch_events)))?;
        world.systems.set("impacts", Box::new(FnSystem(impacts(kinds))))?;
        world.renderers.set("vector", Box::new(VectorRenderer::new(1.5)))?;

        spawn(
            world,
            kinds.ship,
            Vec2d::ZERO,
            Vec2d::ZERO,
            vec![Vec2d::new(0.0, 8.0), Vec2d::new(-5.0, -6.0), Vec2d::new(5.0, -6.0)],
            6.0,
        )?;
        for i in 0..6 {
            let direction = Vec2d::from_angle(std::f64::consts::TAU * f64::from(i) / 6.0);
            spawn(
                world,
                kinds.asteroid,
                direction * 80.0,
                direction.perp() * 20.0,
                polygon(10, 12.0),
                12.0,
            )?;
        }
        Ok(())
    })
}

/// Plays the field by feeding scripted key events
#[derive(Debug, Default)]
struct Blasteroids {
    frame: u64,
}

impl Blasteroids {
    fn script(frame: u64) -> Vec<InputEvent> {
        let key = |key, down: bool| {
            if down {
                InputEvent::KeyPress {
                    key,
                    modifiers: Modifiers::NONE,
                }
            } else {
                InputEvent::KeyRelease {
                    key,
                    modifiers: Modifiers::NONE,
                }
            }
        };
        let mut events = Vec::new();
        match frame {
            30 => events.push(key(Key::Left, true)),
            45 => events.push(key(Key::Left, false)),
            60 => events.push(key(Key::Up, true)),
            120 => events.push(key(Key::Up, false)),
            _ => {}
        }
        if frame % 20 == 0 {
            events.push(key(Key::Space, true));
        } else if frame % 20 == 1 {
            events.push(key(Key::Space, false));
        }
        events
    }
}

impl Game for Blasteroids {
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
        log::info!("Initializing asteroid field");
        ctx.manager.push_mode(Box::new(asteroid_field()?))?;
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext) -> Result<()> {
        self.frame += 1;
        for event in Self::script(self.frame) {
            ctx.send_input(event);
        }
        Ok(())
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        if let Some(world) = ctx.manager.current_as::<World>() {
            log::info!(
                "{} entities left after {:.1}s of world time",
                world.entities().len(),
                world.time()
            );
        }
        log::info!("Last frame drew {} polygons", ctx.frame.polygon_count());
    }
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => EngineConfig::load_json(path),
        _ => EngineConfig::load_ron(path),
    }
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path)),
        None => Ok(EngineConfig::default()
            .with_title("Blasteroids")
            .with_fixed_dt(1.0 / 60.0)
            .with_max_frames(600)),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return;
        }
    };

    let mut engine = Engine::new(config, Blasteroids::default());
    if let Err(e) = engine.run() {
        eprintln!("Engine error: {}", e);
    }
}
