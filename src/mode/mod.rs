//! Application modes
//!
//! A mode is one screen of an application: a title screen, an options dialog,
//! a game in progress. An active mode is ticked and receives input events, a
//! deactivated mode is paused.
//!
//! Modes are kept on a LIFO stack by a [`Manager`]. A [`Multi`] holds several
//! submodes of which one is active, for modes that switch in sequence rather
//! than as a stack (hotseat turns, wizard pages, slides).
//!
//! # Example
//!
//! ```ignore
//! let mut manager = Manager::new();
//! manager.push_mode(Box::new(World::new()))?;
//! manager.push_mode(Box::new(PauseScreen::default()))?; // world is paused
//! manager.pop_mode()?;                                  // world resumes
//! ```

mod clock;
mod manager;
mod multi;

pub use clock::{Fired, ModeClock, STEP_TIMER, TimerId};
pub use manager::Manager;
pub use multi::{Multi, SubmodePlacement};

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::events::InputEvent;
use crate::error::Result;
use crate::render::DrawContext;

/// Time steps per second of a mode that does not choose its own rate.
pub const DEFAULT_STEP_RATE: f64 = 60.0;

static NEXT_MODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a mode inside a [`Manager`] or [`Multi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeId(u64);

impl ModeId {
    /// Allocate a fresh id
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_MODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mode {}", self.0)
    }
}

/// An application mode.
///
/// The lifecycle is:
///
/// 1. `activate()` - when the mode becomes the current mode
/// 2. `tick()` - each frame while current
/// 3. `deactivate()` - when another mode covers it or it is removed
///
/// `activate` must do nothing if the mode is already active.
pub trait Mode: Any {
    /// Mode name for logging
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Whether the mode is currently active
    fn is_active(&self) -> bool;

    /// Activate the mode
    ///
    /// # Errors
    ///
    /// Implementations may refuse activation, in which case the mode stays
    /// inactive.
    fn activate(&mut self) -> Result<()>;

    /// Deactivate the mode
    fn deactivate(&mut self);

    /// Execute one time step
    ///
    /// # Errors
    ///
    /// Propagates errors from the mode's own logic.
    fn step(&mut self, dt: f64) -> Result<()>;

    /// Advance the mode by a frame of `dt` seconds. Modes with their own
    /// clock decide here how many steps to run.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Mode::step`].
    fn tick(&mut self, dt: f64) -> Result<()> {
        self.step(dt)
    }

    /// Time steps per second
    fn step_rate(&self) -> f64 {
        DEFAULT_STEP_RATE
    }

    /// Handle an input event. Returns `true` if the event was consumed.
    ///
    /// # Errors
    ///
    /// Propagates errors from event handlers.
    fn handle_event(&mut self, _event: &InputEvent) -> Result<bool> {
        Ok(false)
    }

    /// Draw the mode
    fn draw(&mut self, _ctx: &mut dyn DrawContext) {}

    /// A finished mode is removed from its manager after the current frame
    fn is_finished(&self) -> bool {
        false
    }

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl fmt::Debug for dyn Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mode")
            .field("name", &self.name())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Test modes shared by the manager and multi tests
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::GreaseError;

    /// Shared log of lifecycle calls
    pub type Journal = Rc<RefCell<Vec<String>>>;

    pub struct TestMode {
        pub label: &'static str,
        pub active: bool,
        pub steps: Vec<f64>,
        pub fail_activate: bool,
        /// Fail every activation after the first
        pub fail_reactivate: bool,
        pub activations: u32,
        pub finished: bool,
        pub journal: Journal,
    }

    impl TestMode {
        pub fn new(label: &'static str, journal: &Journal) -> Self {
            Self {
                label,
                active: false,
                steps: Vec::new(),
                fail_activate: false,
                fail_reactivate: false,
                activations: 0,
                finished: false,
                journal: Rc::clone(journal),
            }
        }

        pub fn boxed(label: &'static str, journal: &Journal) -> Box<dyn Mode> {
            Box::new(Self::new(label, journal))
        }
    }

    impl Mode for TestMode {
        fn name(&self) -> &str {
            self.label
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn activate(&mut self) -> Result<()> {
            if self.fail_activate || (self.fail_reactivate && self.activations > 0) {
                return Err(GreaseError::NoSubmodes);
            }
            if !self.active {
                self.active = true;
                self.activations += 1;
                self.journal.borrow_mut().push(format!("activate {}", self.label));
            }
            Ok(())
        }

        fn deactivate(&mut self) {
            self.active = false;
            self.journal.borrow_mut().push(format!("deactivate {}", self.label));
        }

        fn step(&mut self, dt: f64) -> Result<()> {
            self.steps.push(dt);
            Ok(())
        }

        fn handle_event(&mut self, event: &InputEvent) -> Result<bool> {
            self.journal.borrow_mut().push(format!("event {} {event:?}", self.label));
            Ok(true)
        }

        fn is_finished(&self) -> bool {
            self.finished
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    pub fn journal() -> Journal {
        Rc::new(RefCell::new(Vec::new()))
    }

    pub fn entries(journal: &Journal) -> Vec<String> {
        journal.borrow_mut().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{TestMode, journal};
    use super::*;

    #[test]
    fn test_mode_ids_are_unique() {
        let a = ModeId::next();
        let b = ModeId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_default_mode_methods() {
        let log = journal();
        let mut mode = TestMode::new("title", &log);
        assert_eq!(mode.name(), "title");
        assert!((mode.step_rate() - DEFAULT_STEP_RATE).abs() < f64::EPSILON);

        mode.tick(0.5).unwrap();
        assert_eq!(mode.steps, vec![0.5]);
        assert!(!mode.is_finished());
    }
}
