//! Mode manager
//!
//! Keeps a stack of modes where the mode on top is the only active one. As
//! modes are pushed and popped, the manager deactivates the covered mode and
//! activates the one now on top.

use std::fmt;

use super::{Mode, ModeId};
use crate::core::events::InputEvent;
use crate::error::Result;
use crate::render::DrawContext;

/// Hook run when the last mode is popped
pub type LastModePopHook = Box<dyn FnMut(&dyn Mode)>;

/// LIFO stack of modes
#[derive(Default)]
pub struct Manager {
    modes: Vec<(ModeId, Box<dyn Mode>)>,
    on_last_mode_pop: Option<LastModePopHook>,
}

impl Manager {
    /// Create an empty manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` whenever [`Manager::pop_mode`] empties the stack
    pub fn set_on_last_mode_pop(&mut self, hook: impl FnMut(&dyn Mode) + 'static) {
        self.on_last_mode_pop = Some(Box::new(hook));
    }

    /// The mode on top of the stack
    #[must_use]
    pub fn current_mode(&self) -> Option<&dyn Mode> {
        self.modes.last().map(|(_, mode)| mode.as_ref())
    }

    /// The mode on top of the stack, mutably
    pub fn current_mode_mut(&mut self) -> Option<&mut dyn Mode> {
        match self.modes.last_mut() {
            Some((_, mode)) => Some(mode.as_mut()),
            None => None,
        }
    }

    /// Id of the mode on top of the stack
    #[must_use]
    pub fn current_mode_id(&self) -> Option<ModeId> {
        self.modes.last().map(|(id, _)| *id)
    }

    /// Downcast the current mode
    #[must_use]
    pub fn current_as<T: Mode>(&self) -> Option<&T> {
        self.current_mode()?.as_any().downcast_ref()
    }

    /// Downcast the current mode mutably
    pub fn current_as_mut<T: Mode>(&mut self) -> Option<&mut T> {
        self.current_mode_mut()?.as_any_mut().downcast_mut()
    }

    /// Get a mode anywhere on the stack
    #[must_use]
    pub fn mode(&self, id: ModeId) -> Option<&dyn Mode> {
        self.modes
            .iter()
            .find(|(mode_id, _)| *mode_id == id)
            .map(|(_, mode)| mode.as_ref())
    }

    /// Mode ids from bottom to top
    #[must_use]
    pub fn modes(&self) -> Vec<ModeId> {
        self.modes.iter().map(|(id, _)| *id).collect()
    }

    /// Number of modes on the stack
    #[must_use]
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Check if the stack is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Push a mode and make it active. The previous top is deactivated.
    ///
    /// # Errors
    ///
    /// If the new mode fails to activate it is not pushed, the previous top is
    /// reactivated and the activation error is returned.
    pub fn push_mode(&mut self, mut mode: Box<dyn Mode>) -> Result<ModeId> {
        if let Some(current) = self.current_mode_mut() {
            current.deactivate();
        }
        if let Err(err) = mode.activate() {
            log::warn!("Mode {} failed to activate: {err}", mode.name());
            if let Some(current) = self.current_mode_mut() {
                current.activate()?;
            }
            return Err(err);
        }
        let id = ModeId::next();
        log::debug!("Pushed mode {} as {id}", mode.name());
        self.modes.push((id, mode));
        Ok(id)
    }

    /// Pop and deactivate the top mode. The mode below, if any, is activated;
    /// otherwise the last-pop hook runs.
    ///
    /// # Errors
    ///
    /// If the mode below fails to activate, the popped mode is put back on
    /// top and reactivated, and the activation error is returned.
    pub fn pop_mode(&mut self) -> Result<Option<Box<dyn Mode>>> {
        let Some((id, mut mode)) = self.modes.pop() else {
            return Ok(None);
        };
        mode.deactivate();
        match self.current_mode_mut() {
            Some(current) => {
                if let Err(err) = current.activate() {
                    log::warn!("Mode below {} failed to activate: {err}", mode.name());
                    mode.activate()?;
                    self.modes.push((id, mode));
                    return Err(err);
                }
            }
            None => {
                if let Some(hook) = self.on_last_mode_pop.as_mut() {
                    hook(mode.as_ref());
                }
            }
        }
        log::debug!("Popped mode {} ({id})", mode.name());
        Ok(Some(mode))
    }

    /// Replace the top mode with `mode`. Unlike pop and push, the mode below
    /// is not activated in between and the last-pop hook does not run.
    /// Returns the replaced mode and the new mode's id.
    ///
    /// # Errors
    ///
    /// If `mode` fails to activate the old top is put back and reactivated.
    pub fn swap_modes(
        &mut self,
        mut mode: Box<dyn Mode>,
    ) -> Result<(Option<Box<dyn Mode>>, ModeId)> {
        let old = self.modes.pop();
        let old = match old {
            Some((id, mut old_mode)) => {
                old_mode.deactivate();
                Some((id, old_mode))
            }
            None => None,
        };
        if let Err(err) = mode.activate() {
            if let Some((id, mut old_mode)) = old {
                old_mode.activate()?;
                self.modes.push((id, old_mode));
            }
            return Err(err);
        }
        let id = ModeId::next();
        log::debug!("Swapped in mode {} as {id}", mode.name());
        self.modes.push((id, mode));
        Ok((old.map(|(_, old_mode)| old_mode), id))
    }

    /// Remove a mode. Removing the top mode is the same as
    /// [`Manager::pop_mode`]; any other mode is removed without affecting the
    /// rest. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Propagates activation errors when the top mode is popped.
    pub fn remove_mode(&mut self, id: ModeId) -> Result<Option<Box<dyn Mode>>> {
        if self.current_mode_id() == Some(id) {
            return self.pop_mode();
        }
        Ok(self
            .modes
            .iter()
            .position(|(mode_id, _)| *mode_id == id)
            .map(|index| self.modes.remove(index).1))
    }

    fn pop_if_finished(&mut self) -> Result<()> {
        if let Some((id, mode)) = self.modes.last()
            && mode.is_finished()
        {
            log::debug!("Mode {} finished", mode.name());
            let id = *id;
            self.remove_mode(id)?;
        }
        Ok(())
    }

    /// Tick the current mode, then pop it if it finished
    ///
    /// # Errors
    ///
    /// Propagates errors from the mode.
    pub fn tick(&mut self, dt: f64) -> Result<()> {
        if let Some(mode) = self.current_mode_mut() {
            mode.tick(dt)?;
        }
        self.pop_if_finished()
    }

    /// Send an input event to the current mode. Returns `true` if consumed.
    ///
    /// # Errors
    ///
    /// Propagates errors from the mode's handlers.
    pub fn dispatch(&mut self, event: &InputEvent) -> Result<bool> {
        let handled = match self.current_mode_mut() {
            Some(mode) => mode.handle_event(event)?,
            None => false,
        };
        self.pop_if_finished()?;
        Ok(handled)
    }

    /// Draw the current mode
    pub fn draw(&mut self, ctx: &mut dyn DrawContext) {
        if let Some(mode) = self.current_mode_mut() {
            mode.draw(ctx);
        }
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.modes.iter().map(|(_, mode)| mode.name()).collect();
        f.debug_struct("Manager")
            .field("modes", &names)
            .field("has_last_pop_hook", &self.on_last_mode_pop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::super::testing::{TestMode, entries, journal};
    use super::*;
    use crate::core::events::{InputEvent, Key, Modifiers};
    use crate::error::GreaseError;

    #[test]
    fn test_empty_manager() {
        let mut manager = Manager::new();
        assert!(manager.current_mode().is_none());
        assert!(manager.is_empty());
        assert!(manager.pop_mode().unwrap().is_none());
        manager.tick(0.1).unwrap();
    }

    #[test]
    fn test_push_and_pop_activation_order() {
        let log = journal();
        let mut manager = Manager::new();
        let a = manager.push_mode(TestMode::boxed("a", &log)).unwrap();
        let b = manager.push_mode(TestMode::boxed("b", &log)).unwrap();
        assert_eq!(manager.modes(), vec![a, b]);
        assert_eq!(manager.current_mode_id(), Some(b));
        assert_eq!(
            entries(&log),
            vec!["activate a", "deactivate a", "activate b"]
        );

        let popped = manager.pop_mode().unwrap().unwrap();
        assert_eq!(popped.name(), "b");
        assert!(!popped.is_active());
        assert_eq!(entries(&log), vec!["deactivate b", "activate a"]);
        assert!(manager.current_mode().unwrap().is_active());
    }

    #[test]
    fn test_last_mode_pop_hook() {
        let log = journal();
        let popped_name = Rc::new(Cell::new(""));
        let seen = Rc::clone(&popped_name);
        let mut manager = Manager::new();
        manager.set_on_last_mode_pop(move |mode| {
            if mode.name() == "only" {
                seen.set("only");
            }
        });
        manager.push_mode(TestMode::boxed("only", &log)).unwrap();
        manager.pop_mode().unwrap();
        assert_eq!(popped_name.get(), "only");
    }

    #[test]
    fn test_swap_modes_skips_mode_below() {
        let log = journal();
        let popped = Rc::new(Cell::new(false));
        let flag = Rc::clone(&popped);
        let mut manager = Manager::new();
        manager.set_on_last_mode_pop(move |_| flag.set(true));
        manager.push_mode(TestMode::boxed("a", &log)).unwrap();
        manager.push_mode(TestMode::boxed("b", &log)).unwrap();
        entries(&log);

        let (old, _) = manager.swap_modes(TestMode::boxed("c", &log)).unwrap();
        assert_eq!(old.unwrap().name(), "b");
        assert_eq!(entries(&log), vec!["deactivate b", "activate c"]);
        assert_eq!(manager.len(), 2);

        let mut single = Manager::new();
        single.push_mode(TestMode::boxed("x", &log)).unwrap();
        single.swap_modes(TestMode::boxed("y", &log)).unwrap();
        assert!(!popped.get());
    }

    #[test]
    fn test_remove_mode() {
        let log = journal();
        let mut manager = Manager::new();
        let a = manager.push_mode(TestMode::boxed("a", &log)).unwrap();
        let b = manager.push_mode(TestMode::boxed("b", &log)).unwrap();
        let c = manager.push_mode(TestMode::boxed("c", &log)).unwrap();
        entries(&log);

        // Not on top: removed silently.
        assert_eq!(manager.remove_mode(b).unwrap().unwrap().name(), "b");
        assert!(entries(&log).is_empty());

        // On top: same as pop.
        manager.remove_mode(c).unwrap();
        assert_eq!(entries(&log), vec!["deactivate c", "activate a"]);
        assert_eq!(manager.modes(), vec![a]);

        assert!(manager.remove_mode(c).unwrap().is_none());
    }

    #[test]
    fn test_failed_activation_restores_previous() {
        let log = journal();
        let mut manager = Manager::new();
        manager.push_mode(TestMode::boxed("a", &log)).unwrap();
        let mut broken = TestMode::new("broken", &log);
        broken.fail_activate = true;

        assert!(manager.push_mode(Box::new(broken)).is_err());
        assert_eq!(manager.len(), 1);
        assert!(manager.current_mode().unwrap().is_active());
    }

    #[test]
    fn test_failed_pop_keeps_top_mode() {
        let log = journal();
        let mut manager = Manager::new();
        let mut stubborn = TestMode::new("a", &log);
        stubborn.fail_reactivate = true;
        manager.push_mode(Box::new(stubborn)).unwrap();
        let b = manager.push_mode(TestMode::boxed("b", &log)).unwrap();
        entries(&log);

        assert_eq!(manager.pop_mode().err(), Some(GreaseError::NoSubmodes));
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.current_mode_id(), Some(b));
        assert!(manager.current_mode().unwrap().is_active());
        assert_eq!(entries(&log), vec!["deactivate b", "activate b"]);
    }

    #[test]
    fn test_tick_dispatch_and_finish() {
        let log = journal();
        let mut manager = Manager::new();
        manager.push_mode(TestMode::boxed("a", &log)).unwrap();
        manager.push_mode(TestMode::boxed("b", &log)).unwrap();

        manager.tick(0.25).unwrap();
        assert_eq!(manager.current_as::<TestMode>().unwrap().steps, vec![0.25]);

        let event = InputEvent::KeyPress {
            key: Key::Space,
            modifiers: Modifiers::NONE,
        };
        entries(&log);
        assert!(manager.dispatch(&event).unwrap());
        assert_eq!(entries(&log).len(), 1);

        manager.current_as_mut::<TestMode>().unwrap().finished = true;
        manager.tick(0.25).unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.current_mode().unwrap().name(), "a");
    }
}
