//! Engine loop
//!
//! The engine owns a mode [`Manager`] and drives it frame by frame: queued
//! input is dispatched, the manager ticks with the frame time, the game
//! updates, and the current mode draws. No window is opened; a platform layer
//! supplies a [`DrawContext`] and feeds input through
//! [`EngineContext::send_input`].

use std::thread;
use std::time::{Duration, Instant};

use crate::core::config::EngineConfig;
use crate::core::debug::FrameStats;
use crate::core::events::InputEvent;
use crate::error::Result;
use crate::mode::Manager;
use crate::render::{DrawContext, RecordingContext};

/// Game trait that users implement
pub trait Game: 'static {
    /// Called once before the first frame, typically to push the first mode
    ///
    /// # Errors
    ///
    /// An error aborts the engine before any frame runs.
    fn init(&mut self, engine: &mut EngineContext) -> Result<()>;

    /// Called every frame after the modes have ticked
    ///
    /// # Errors
    ///
    /// An error stops the engine.
    fn update(&mut self, _engine: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Called when the engine stops, whatever the reason
    fn shutdown(&mut self, _engine: &mut EngineContext) {}
}

/// Context passed to game callbacks
#[derive(Debug, Default)]
pub struct EngineContext {
    /// Mode stack
    pub manager: Manager,
    /// Frame statistics
    pub stats: FrameStats,
    /// Drawing calls of the last frame, when no draw context was supplied
    pub frame: RecordingContext,
    input: Vec<InputEvent>,
    time: f64,
    delta: f64,
    should_quit: bool,
}

impl EngineContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an input event for dispatch at the start of the next frame
    pub fn send_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Seconds elapsed since the engine started
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Duration of the current frame in seconds
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Request engine shutdown after the current frame
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Check if the engine should quit
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    game: G,
    context: EngineContext,
    surface: Option<Box<dyn DrawContext>>,
}

impl<G: Game> Engine<G> {
    /// Create a new engine with the given game
    pub fn new(config: EngineConfig, game: G) -> Self {
        Self {
            config,
            game,
            context: EngineContext::new(),
            surface: None,
        }
    }

    /// Draw into `surface` instead of recording each frame
    #[must_use]
    pub fn with_draw_context(mut self, surface: impl DrawContext + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn game(&self) -> &G {
        &self.game
    }

    #[must_use]
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.context
    }

    /// Run until the game quits, the mode stack empties or the frame limit
    /// is reached. Returns the number of frames run.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by the game or a mode. The game is
    /// shut down either way.
    pub fn run(&mut self) -> Result<u64> {
        // A host application may have installed its own logger already.
        let _ = env_logger::try_init();
        log::info!("Starting engine: {}", self.config.title);

        if let Err(err) = self.game.init(&mut self.context) {
            log::error!("Game initialization failed: {err}");
            self.game.shutdown(&mut self.context);
            return Err(err);
        }

        let frame_time = (self.config.target_fps > 0)
            .then(|| Duration::from_secs_f64(1.0 / f64::from(self.config.target_fps)));
        let mut last = Instant::now();
        let mut frames = 0;
        let result = loop {
            if self.context.should_quit {
                log::info!("Quit requested");
                break Ok(frames);
            }
            if self.context.manager.is_empty() {
                log::info!("No modes left");
                break Ok(frames);
            }
            if self.config.max_frames.is_some_and(|max| frames >= max) {
                break Ok(frames);
            }

            let started = Instant::now();
            let dt = match self.config.fixed_dt {
                Some(dt) => dt,
                None => started.duration_since(last).as_secs_f64(),
            };
            last = started;

            if let Err(err) = self.frame(dt) {
                log::error!("Frame {frames} failed: {err}");
                break Err(err);
            }
            frames += 1;
            if frames % 600 == 0 {
                log::debug!("{}", self.context.stats);
            }

            // Fixed time runs as fast as possible.
            if self.config.fixed_dt.is_none()
                && let Some(frame_time) = frame_time
            {
                let spent = started.elapsed();
                if spent < frame_time {
                    thread::sleep(frame_time - spent);
                }
            }
        };

        log::info!(
            "Engine stopped after {} frames: {}",
            self.context.stats.total_frames(),
            self.context.stats
        );
        self.game.shutdown(&mut self.context);
        result
    }

    /// Run a single frame lasting `dt` seconds
    ///
    /// # Errors
    ///
    /// Propagates errors from input dispatch, the modes and the game.
    pub fn frame(&mut self, dt: f64) -> Result<()> {
        let context = &mut self.context;
        context.delta = dt;
        context.time += dt;

        for event in std::mem::take(&mut context.input) {
            context.manager.dispatch(&event)?;
        }
        context.manager.tick(dt)?;
        self.game.update(context)?;

        match self.surface.as_mut() {
            Some(surface) => context.manager.draw(surface.as_mut()),
            None => {
                context.frame.reset();
                context.manager.draw(&mut context.frame);
            }
        }
        context.stats.record_frame(dt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::events::{Key, Modifiers};
    use crate::ecs::{KindId, World, components};
    use crate::geometry::{Rgba, Vec2d};
    use crate::input::KeyControls;
    use crate::mode::Mode;
    use crate::render::{ClearFlags, DrawCommand, VectorRenderer};
    use crate::systems::EulerMovement;

    /// One ship drifting right, thrusting up while the up key is held
    struct Drift {
        updates: u32,
        quit_after: Option<u32>,
        shut_down: Rc<RefCell<bool>>,
    }

    impl Drift {
        fn new() -> Self {
            Self {
                updates: 0,
                quit_after: None,
                shut_down: Rc::default(),
            }
        }
    }

    fn drift_world() -> Result<World> {
        World::configured(Default::default(), |world| {
            world.components.set("position", Box::new(components::position()))?;
            world.components.set("movement", Box::new(components::movement()))?;
            world.components.set("shape", Box::new(components::shape()))?;
            world.components.set("renderable", Box::new(components::renderable()))?;
            world.systems.set("movement", Box::new(EulerMovement::default()))?;

            let mut controls = KeyControls::new();
            controls.define_hold("thrust", |world, dt| {
                let ship = world.entities_in(&["movement"])?.iter().next();
                if let Some(ship) = ship {
                    let movement = world.component_mut("movement")?;
                    let velocity =
                        movement.get_field(ship, "velocity")?.as_vec2().unwrap_or_default();
                    movement.set_field(ship, "velocity", velocity + Vec2d::new(0.0, 60.0 * dt))?;
                }
                Ok(())
            });
            controls.bind_hold(Some("thrust"), Key::Up, Modifiers::NONE)?;
            world.systems.set("controls", Box::new(controls))?;
            world.renderers.set("vector", Box::new(VectorRenderer::new(2.0)))?;

            let ship = world.create_entity(KindId::ROOT)?;
            world.set(ship, "position", [("xy", Vec2d::ZERO.into())])?;
            world.set(ship, "movement", [("velocity", Vec2d::new(6.0, 0.0).into())])?;
            let verts = vec![Vec2d::new(0.0, 1.0), Vec2d::new(-1.0, -1.0), Vec2d::new(1.0, -1.0)];
            world.set(ship, "shape", [("verts", verts.into())])?;
            world.set(ship, "renderable", [("color", Rgba::rgb(1.0, 0.0, 0.0).into())])?;
            Ok(())
        })
    }

    impl Game for Drift {
        fn init(&mut self, engine: &mut EngineContext) -> Result<()> {
            engine.manager.push_mode(Box::new(drift_world()?))?;
            Ok(())
        }

        fn update(&mut self, engine: &mut EngineContext) -> Result<()> {
            self.updates += 1;
            if self.quit_after == Some(self.updates) {
                engine.quit();
            }
            Ok(())
        }

        fn shutdown(&mut self, _engine: &mut EngineContext) {
            *self.shut_down.borrow_mut() = true;
        }
    }

    fn ship_xy(engine: &Engine<Drift>) -> Vec2d {
        let world = engine.context().manager.current_as::<World>().unwrap();
        let ship = world.entities_in(&["position"]).unwrap().iter().next().unwrap();
        world
            .component("position")
            .unwrap()
            .get_field(ship, "xy")
            .unwrap()
            .as_vec2()
            .unwrap()
    }

    #[test]
    fn test_fixed_frames_step_the_world() {
        let config = EngineConfig::default().with_fixed_dt(1.0 / 60.0).with_max_frames(60);
        let mut engine = Engine::new(config, Drift::new());
        let shut_down = Rc::clone(&engine.game().shut_down);

        assert_eq!(engine.run().unwrap(), 60);
        assert!(*shut_down.borrow());
        assert_eq!(engine.game().updates, 60);
        assert!((engine.context().time() - 1.0).abs() < 1e-9);
        assert_eq!(engine.context().stats.total_frames(), 60);

        // About one second of drift at 6 units/s
        let xy = ship_xy(&engine);
        assert!((xy.x - 6.0).abs() < 0.2, "{xy}");
        assert!(xy.y.abs() < 1e-9);

        // The last frame was recorded
        let commands = engine.context().frame.commands();
        assert_eq!(commands[0], DrawCommand::Clear(ClearFlags::ALL));
        assert_eq!(engine.context().frame.polygon_count(), 1);
    }

    #[test]
    fn test_held_key_reaches_world_systems() {
        let config = EngineConfig::default().with_fixed_dt(1.0 / 60.0).with_max_frames(30);
        let mut engine = Engine::new(config, Drift::new());
        engine.context_mut().send_input(InputEvent::KeyPress {
            key: Key::Up,
            modifiers: Modifiers::NONE,
        });
        engine.run().unwrap();
        assert!(ship_xy(&engine).y > 1.0);
    }

    #[test]
    fn test_quit_from_update() {
        let config = EngineConfig::default().with_fixed_dt(0.01);
        let mut game = Drift::new();
        game.quit_after = Some(3);
        let mut engine = Engine::new(config, game);
        assert_eq!(engine.run().unwrap(), 3);
    }

    #[test]
    fn test_stops_when_no_modes_left() {
        struct Empty;
        impl Game for Empty {
            fn init(&mut self, _engine: &mut EngineContext) -> Result<()> {
                Ok(())
            }
        }
        let mut engine = Engine::new(EngineConfig::default(), Empty);
        assert_eq!(engine.run().unwrap(), 0);
    }

    #[test]
    fn test_external_draw_context() {
        #[derive(Clone, Default)]
        struct Shared(Rc<RefCell<RecordingContext>>);
        impl DrawContext for Shared {
            fn clear(&mut self, flags: ClearFlags) {
                self.0.borrow_mut().clear(flags);
            }
            fn load_identity(&mut self) {
                self.0.borrow_mut().load_identity();
            }
            fn draw_polygon(&mut self, points: &[Vec2d], color: Rgba, line_width: f64) {
                self.0.borrow_mut().draw_polygon(points, color, line_width);
            }
        }

        let surface = Shared::default();
        let config = EngineConfig::default().with_fixed_dt(0.01).with_max_frames(2);
        let mut engine = Engine::new(config, Drift::new()).with_draw_context(surface.clone());
        engine.run().unwrap();
        assert_eq!(surface.0.borrow().polygon_count(), 2);
        assert!(engine.context().frame.commands().is_empty());
        // Red outline, 2 units wide
        let polygon = surface.0.borrow().commands().iter().find_map(|command| match command {
            DrawCommand::Polygon { color, line_width, .. } => Some((*color, *line_width)),
            _ => None,
        });
        assert_eq!(polygon, Some((Rgba::rgb(1.0, 0.0, 0.0), 2.0)));
        assert!(engine.context().manager.current_mode().is_some_and(|mode| mode.is_active()));
    }
}
