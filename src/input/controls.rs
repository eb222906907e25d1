//! Key bindings for world systems
//!
//! [`KeyControls`] decouples physical keys from what they do. Actions are
//! defined once under a name and then bound to any number of key and
//! modifier combinations, so controls can be rebound at runtime.
//!
//! # Example
//!
//! ```ignore
//! let mut controls = KeyControls::new();
//! controls.define_hold("thrust", |world, dt| ship_thrust(world, dt));
//! controls.define_press("fire", |world| fire_bullet(world));
//! controls.bind_hold(Some("thrust"), Key::Up, Modifiers::NONE)?;
//! controls.bind_press(Some("fire"), Key::Space, Modifiers::NONE)?;
//! world.systems.set("controls", Box::new(controls))?;
//! ```

use std::any::Any;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::core::events::{InputEvent, Key, Modifiers};
use crate::ecs::World;
use crate::error::{GreaseError, Result};
use crate::systems::System;

/// Action run every step while its key is held
pub type HoldAction = Box<dyn FnMut(&mut World, f64) -> Result<()>>;

/// Action run once when its key goes down or up
pub type KeyAction = Box<dyn FnMut(&mut World) -> Result<()>>;

type Binding = (Key, Modifiers);

/// Named actions and the keys they are bound to, for one trigger.
struct ActionMap<A> {
    actions: FxHashMap<String, A>,
    bindings: FxHashMap<Binding, String>,
}

impl<A> Default for ActionMap<A> {
    fn default() -> Self {
        Self {
            actions: FxHashMap::default(),
            bindings: FxHashMap::default(),
        }
    }
}

impl<A> ActionMap<A> {
    fn bind(&mut self, action: Option<&str>, key: Key, modifiers: Modifiers) -> Result<()> {
        match action {
            Some(name) => {
                if !self.actions.contains_key(name) {
                    return Err(GreaseError::UnknownAction(name.to_string()));
                }
                self.bindings.insert((key, modifiers), name.to_string());
            }
            None => {
                self.bindings.remove(&(key, modifiers));
            }
        }
        Ok(())
    }

    fn bound(&mut self, binding: &Binding) -> Option<(&str, &mut A)> {
        let name = self.bindings.get(binding)?;
        let action = self.actions.get_mut(name)?;
        Some((name.as_str(), action))
    }
}

/// System mapping keys to named actions.
///
/// * Press actions run when a bound key goes down.
/// * Release actions run when a bound key goes up.
/// * Hold actions run every step while a bound key is down. An action
///   bound to several held keys still runs once per step.
///
/// Bindings match the exact modifier state of the key event.
#[derive(Default)]
pub struct KeyControls {
    hold: ActionMap<HoldAction>,
    press: ActionMap<KeyAction>,
    release: ActionMap<KeyAction>,
    /// Keys currently down, in press order
    held: Vec<Binding>,
}

impl fmt::Debug for KeyControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyControls")
            .field("hold_bindings", &self.hold.bindings)
            .field("press_bindings", &self.press.bindings)
            .field("release_bindings", &self.release.bindings)
            .field("held", &self.held)
            .finish_non_exhaustive()
    }
}

impl KeyControls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// Define or replace a hold action
    pub fn define_hold(
        &mut self,
        name: &str,
        action: impl FnMut(&mut World, f64) -> Result<()> + 'static,
    ) {
        self.hold.actions.insert(name.to_string(), Box::new(action));
    }

    /// Define or replace a press action
    pub fn define_press(
        &mut self,
        name: &str,
        action: impl FnMut(&mut World) -> Result<()> + 'static,
    ) {
        self.press.actions.insert(name.to_string(), Box::new(action));
    }

    /// Define or replace a release action
    pub fn define_release(
        &mut self,
        name: &str,
        action: impl FnMut(&mut World) -> Result<()> + 'static,
    ) {
        self.release.actions.insert(name.to_string(), Box::new(action));
    }

    // ------------------------------------------------------------------------
    // Bindings
    // ------------------------------------------------------------------------

    /// Bind a key to a hold action, replacing any existing hold binding for
    /// the key. `None` unbinds the key.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownAction`] if no hold action has the name.
    pub fn bind_hold(
        &mut self,
        action: Option<&str>,
        key: Key,
        modifiers: Modifiers,
    ) -> Result<()> {
        self.hold.bind(action, key, modifiers)
    }

    /// Bind a key to a press action. `None` unbinds the key.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownAction`] if no press action has the name.
    pub fn bind_press(
        &mut self,
        action: Option<&str>,
        key: Key,
        modifiers: Modifiers,
    ) -> Result<()> {
        self.press.bind(action, key, modifiers)
    }

    /// Bind a key to a release action. `None` unbinds the key.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownAction`] if no release action has the name.
    pub fn bind_release(
        &mut self,
        action: Option<&str>,
        key: Key,
        modifiers: Modifiers,
    ) -> Result<()> {
        self.release.bind(action, key, modifiers)
    }

    /// Name of the hold action bound to a key
    #[must_use]
    pub fn hold_action(&self, key: Key, modifiers: Modifiers) -> Option<&str> {
        self.hold.bindings.get(&(key, modifiers)).map(String::as_str)
    }

    /// Check if a key is down
    #[must_use]
    pub fn is_held(&self, key: Key) -> bool {
        self.held.iter().any(|(k, _)| *k == key)
    }

    fn key_press(&mut self, world: &mut World, key: Key, modifiers: Modifiers) -> Result<bool> {
        let binding = (key, modifiers);
        if !self.held.contains(&binding) {
            self.held.push(binding);
        }
        match self.press.bound(&binding) {
            Some((name, action)) => {
                log::trace!("key {key:?} pressed: {name}");
                action(world)?;
                Ok(true)
            }
            None => Ok(self.hold.bindings.contains_key(&binding)),
        }
    }

    fn key_release(&mut self, world: &mut World, key: Key, modifiers: Modifiers) -> Result<bool> {
        // Modifiers may have changed while the key was down.
        self.held.retain(|(k, _)| *k != key);
        match self.release.bound(&(key, modifiers)) {
            Some((name, action)) => {
                log::trace!("key {key:?} released: {name}");
                action(world)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl System for KeyControls {
    fn step(&mut self, world: &mut World, dt: f64) -> Result<()> {
        let mut already_run: Vec<&str> = Vec::new();
        for binding in &self.held {
            let Some(name) = self.hold.bindings.get(binding) else {
                continue;
            };
            if already_run.contains(&name.as_str()) {
                continue;
            }
            already_run.push(name);
            if let Some(action) = self.hold.actions.get_mut(name) {
                action(world, dt)?;
            }
        }
        Ok(())
    }

    fn on_event(&mut self, world: &mut World, event: &InputEvent) -> Result<bool> {
        match *event {
            InputEvent::KeyPress { key, modifiers } => self.key_press(world, key, modifiers),
            InputEvent::KeyRelease { key, modifiers } => self.key_release(world, key, modifiers),
            _ => Ok(false),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
