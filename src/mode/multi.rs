//! Multi-mode
//!
//! A [`Multi`] is a mode holding an ordered list of submodes with one active
//! at a time. Submodes can be switched to directly or in sequence. While the
//! multi is active its active submode is active too; the multi has no clock of
//! its own and forwards ticks and events to the active submode.

use std::any::Any;
use std::fmt;

use super::{DEFAULT_STEP_RATE, Mode, ModeId};
use crate::core::events::InputEvent;
use crate::error::{GreaseError, Result};
use crate::render::DrawContext;

/// Where to add a submode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmodePlacement {
    /// Before an existing submode
    Before(ModeId),
    /// At this position
    Index(usize),
}

/// A mode with ordered submodes
pub struct Multi {
    name: String,
    submodes: Vec<(ModeId, Box<dyn Mode>)>,
    active_submode: Option<ModeId>,
    active: bool,
    finished: bool,
}

impl Multi {
    /// Create an empty multi
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            submodes: Vec::new(),
            active_submode: None,
            active: false,
            finished: false,
        }
    }

    /// Create a multi from submodes in order
    #[must_use]
    pub fn with_submodes(
        name: impl Into<String>,
        submodes: impl IntoIterator<Item = Box<dyn Mode>>,
    ) -> Self {
        let mut multi = Self::new(name);
        multi
            .submodes
            .extend(submodes.into_iter().map(|mode| (ModeId::next(), mode)));
        multi
    }

    fn index_of(&self, id: ModeId) -> Option<usize> {
        self.submodes.iter().position(|(submode, _)| *submode == id)
    }

    /// Submode ids in order
    #[must_use]
    pub fn submodes(&self) -> Vec<ModeId> {
        self.submodes.iter().map(|(id, _)| *id).collect()
    }

    /// The active submode, or the one to activate with the multi
    #[must_use]
    pub fn active_submode(&self) -> Option<ModeId> {
        self.active_submode
    }

    /// Get a submode
    #[must_use]
    pub fn submode(&self, id: ModeId) -> Option<&dyn Mode> {
        self.index_of(id).map(|index| self.submodes[index].1.as_ref())
    }

    /// Get a submode mutably
    pub fn submode_mut(&mut self, id: ModeId) -> Option<&mut dyn Mode> {
        match self.index_of(id) {
            Some(index) => Some(self.submodes[index].1.as_mut()),
            None => None,
        }
    }

    fn active_mode_mut(&mut self) -> Option<&mut dyn Mode> {
        let id = self.active_submode?;
        self.submode_mut(id)
    }

    /// Add a submode without activating it
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownSubmode`] if the `before` submode does
    /// not exist and [`GreaseError::InvalidPlacement`] for an index past the
    /// end.
    pub fn add_submode(
        &mut self,
        mode: Box<dyn Mode>,
        placement: Option<SubmodePlacement>,
    ) -> Result<ModeId> {
        let index = match placement {
            None => self.submodes.len(),
            Some(SubmodePlacement::Before(before)) => {
                self.index_of(before).ok_or(GreaseError::UnknownSubmode)?
            }
            Some(SubmodePlacement::Index(index)) if index <= self.submodes.len() => index,
            Some(SubmodePlacement::Index(_)) => return Err(GreaseError::InvalidPlacement),
        };
        let id = ModeId::next();
        self.submodes.insert(index, (id, mode));
        Ok(id)
    }

    fn deactivate_submode(&mut self) {
        if self.active
            && let Some(mode) = self.active_mode_mut()
        {
            mode.deactivate();
        }
        self.active_submode = None;
    }

    /// Make a submode the active one. If the multi itself is inactive the
    /// submode is activated together with the multi.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::UnknownSubmode`] for an id that is not a
    /// submode, or the submode's activation error.
    pub fn activate_submode(&mut self, id: ModeId) -> Result<()> {
        if self.index_of(id).is_none() {
            return Err(GreaseError::UnknownSubmode);
        }
        if self.active_submode == Some(id) {
            return Ok(());
        }
        self.deactivate_submode();
        self.active_submode = Some(id);
        if self.active
            && let Some(mode) = self.active_mode_mut()
        {
            log::debug!("Activating submode {}", mode.name());
            mode.activate()?;
        }
        Ok(())
    }

    fn activate_or_finish(&mut self, next: Option<ModeId>) -> Result<Option<ModeId>> {
        match next {
            Some(id) => self.activate_submode(id)?,
            None => {
                self.deactivate_submode();
                self.finished = true;
                log::debug!("{} ran out of submodes", self.name);
            }
        }
        Ok(next)
    }

    /// Activate the submode after the active one, or the first if none is
    /// active. At the end, `wrap` starts over from the first; otherwise the
    /// multi finishes and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSubmodes`] if there are no submodes.
    pub fn activate_next(&mut self, wrap: bool) -> Result<Option<ModeId>> {
        if self.submodes.is_empty() {
            return Err(GreaseError::NoSubmodes);
        }
        let next = match self.active_submode.and_then(|id| self.index_of(id)) {
            None => Some(0),
            Some(index) if index + 1 < self.submodes.len() => Some(index + 1),
            Some(_) if wrap => Some(0),
            Some(_) => None,
        };
        self.activate_or_finish(next.map(|index| self.submodes[index].0))
    }

    /// Activate the submode before the active one, or the last if none is
    /// active. At the start, `wrap` continues from the last; otherwise the
    /// multi finishes and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`GreaseError::NoSubmodes`] if there are no submodes.
    pub fn activate_previous(&mut self, wrap: bool) -> Result<Option<ModeId>> {
        let Some(last) = self.submodes.len().checked_sub(1) else {
            return Err(GreaseError::NoSubmodes);
        };
        let previous = match self.active_submode.and_then(|id| self.index_of(id)) {
            None => Some(last),
            Some(0) if wrap => Some(last),
            Some(0) => None,
            Some(index) => Some(index - 1),
        };
        self.activate_or_finish(previous.map(|index| self.submodes[index].0))
    }

    /// Remove a submode, by default the active one. Unknown ids are ignored.
    /// Removing the active submode activates the next one, wrapping around;
    /// removing the only submode finishes the multi.
    ///
    /// # Errors
    ///
    /// Propagates the activation error of the next submode.
    pub fn remove_submode(&mut self, id: Option<ModeId>) -> Result<Option<Box<dyn Mode>>> {
        let Some(id) = id.or(self.active_submode) else {
            return Ok(None);
        };
        let Some(index) = self.index_of(id) else {
            return Ok(None);
        };
        if self.active_submode == Some(id) {
            if self.submodes.len() == 1 {
                self.activate_or_finish(None)?;
            } else {
                let next = self.submodes[(index + 1) % self.submodes.len()].0;
                self.activate_submode(next)?;
            }
        }
        let index = self.index_of(id).unwrap_or(index);
        Ok(Some(self.submodes.remove(index).1))
    }
}

impl Mode for Multi {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    /// Activates the previously active submode, or the first one.
    fn activate(&mut self) -> Result<()> {
        if self.submodes.is_empty() {
            return Err(GreaseError::NoSubmodes);
        }
        if self.active {
            return Ok(());
        }
        let id = match self.active_submode {
            Some(id) if self.index_of(id).is_some() => id,
            _ => self.submodes[0].0,
        };
        self.active_submode = Some(id);
        if let Some(mode) = self.submode_mut(id) {
            mode.activate()?;
        }
        self.active = true;
        self.finished = false;
        Ok(())
    }

    /// Deactivates the active submode but remembers it.
    fn deactivate(&mut self) {
        if let Some(mode) = self.active_mode_mut() {
            mode.deactivate();
        }
        self.active = false;
    }

    fn step(&mut self, dt: f64) -> Result<()> {
        match self.active_mode_mut() {
            Some(mode) => mode.step(dt),
            None => Ok(()),
        }
    }

    fn tick(&mut self, dt: f64) -> Result<()> {
        match self.active_mode_mut() {
            Some(mode) => mode.tick(dt),
            None => Ok(()),
        }
    }

    fn step_rate(&self) -> f64 {
        self.active_submode
            .and_then(|id| self.submode(id))
            .map_or(DEFAULT_STEP_RATE, |mode| mode.step_rate())
    }

    fn handle_event(&mut self, event: &InputEvent) -> Result<bool> {
        match self.active_mode_mut() {
            Some(mode) => mode.handle_event(event),
            None => Ok(false),
        }
    }

    fn draw(&mut self, ctx: &mut dyn DrawContext) {
        if let Some(mode) = self.active_mode_mut() {
            mode.draw(ctx);
        }
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

impl fmt::Debug for Multi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multi")
            .field("name", &self.name)
            .field("submodes", &self.submodes())
            .field("active_submode", &self.active_submode)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::Manager;
    use super::super::testing::{TestMode, entries, journal};
    use super::*;

    fn multi_of(
        labels: &[&'static str],
        log: &super::super::testing::Journal,
    ) -> (Multi, Vec<ModeId>) {
        let mut multi = Multi::new("multi");
        let ids = labels
            .iter()
            .map(|label| multi.add_submode(TestMode::boxed(label, log), None).unwrap())
            .collect();
        (multi, ids)
    }

    #[test]
    fn test_add_submode_placement() {
        let log = journal();
        let (mut multi, ids) = multi_of(&["a", "c"], &log);
        let b = multi
            .add_submode(TestMode::boxed("b", &log), Some(SubmodePlacement::Before(ids[1])))
            .unwrap();
        let z = multi
            .add_submode(TestMode::boxed("z", &log), Some(SubmodePlacement::Index(0)))
            .unwrap();
        assert_eq!(multi.submodes(), vec![z, ids[0], b, ids[1]]);

        assert_eq!(
            multi.add_submode(
                TestMode::boxed("q", &log),
                Some(SubmodePlacement::Before(ModeId::next()))
            ),
            Err(GreaseError::UnknownSubmode)
        );
        assert_eq!(
            multi.add_submode(TestMode::boxed("q", &log), Some(SubmodePlacement::Index(10))),
            Err(GreaseError::InvalidPlacement)
        );
        // Adding does not activate.
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_empty_multi_cannot_activate() {
        let mut multi = Multi::new("empty");
        assert_eq!(multi.activate(), Err(GreaseError::NoSubmodes));
        assert_eq!(multi.activate_next(true), Err(GreaseError::NoSubmodes));
        assert_eq!(multi.activate_previous(true), Err(GreaseError::NoSubmodes));
    }

    #[test]
    fn test_activate_activates_first_then_remembered() {
        let log = journal();
        let (mut multi, ids) = multi_of(&["a", "b"], &log);
        multi.activate().unwrap();
        assert_eq!(multi.active_submode(), Some(ids[0]));
        assert_eq!(entries(&log), vec!["activate a"]);

        multi.activate_submode(ids[1]).unwrap();
        assert_eq!(entries(&log), vec!["deactivate a", "activate b"]);

        multi.deactivate();
        assert_eq!(multi.active_submode(), Some(ids[1]));
        multi.activate().unwrap();
        assert_eq!(entries(&log), vec!["deactivate b", "activate b"]);
    }

    #[test]
    fn test_activate_submode_while_inactive_is_deferred() {
        let log = journal();
        let (mut multi, ids) = multi_of(&["a", "b"], &log);
        multi.activate_submode(ids[1]).unwrap();
        assert!(entries(&log).is_empty());
        multi.activate().unwrap();
        assert_eq!(entries(&log), vec!["activate b"]);
        assert_eq!(multi.activate_submode(ModeId::next()), Err(GreaseError::UnknownSubmode));
    }

    #[test]
    fn test_activate_next_and_previous() {
        let log = journal();
        let (mut multi, ids) = multi_of(&["a", "b", "c"], &log);
        multi.activate().unwrap();

        assert_eq!(multi.activate_next(true).unwrap(), Some(ids[1]));
        assert_eq!(multi.activate_next(true).unwrap(), Some(ids[2]));
        assert_eq!(multi.activate_next(true).unwrap(), Some(ids[0]));
        assert_eq!(multi.activate_previous(true).unwrap(), Some(ids[2]));
        assert_eq!(multi.activate_previous(false).unwrap(), Some(ids[1]));
        assert!(!multi.is_finished());
    }

    #[test]
    fn test_next_without_wrap_finishes() {
        let log = journal();
        let (mut multi, ids) = multi_of(&["a", "b"], &log);
        multi.activate().unwrap();
        multi.activate_submode(ids[1]).unwrap();
        entries(&log);

        assert_eq!(multi.activate_next(false).unwrap(), None);
        assert!(multi.is_finished());
        assert_eq!(multi.active_submode(), None);
        assert_eq!(entries(&log), vec!["deactivate b"]);
    }

    #[test]
    fn test_single_submode_next_with_wrap_stays() {
        let log = journal();
        let (mut multi, ids) = multi_of(&["a"], &log);
        multi.activate().unwrap();
        entries(&log);
        assert_eq!(multi.activate_next(true).unwrap(), Some(ids[0]));
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_remove_submode() {
        let log = journal();
        let (mut multi, ids) = multi_of(&["a", "b", "c"], &log);
        multi.activate().unwrap();
        entries(&log);

        // Inactive submode: removed without switching.
        assert_eq!(multi.remove_submode(Some(ids[1])).unwrap().unwrap().name(), "b");
        assert!(entries(&log).is_empty());
        assert!(multi.remove_submode(Some(ids[1])).unwrap().is_none());

        // Active submode: the next one takes over.
        multi.remove_submode(None).unwrap();
        assert_eq!(entries(&log), vec!["deactivate a", "activate c"]);
        assert_eq!(multi.active_submode(), Some(ids[2]));

        // Last one: the multi finishes.
        multi.remove_submode(None).unwrap();
        assert!(multi.is_finished());
        assert!(multi.submodes().is_empty());
    }

    #[test]
    fn test_manager_removes_finished_multi() {
        let log = journal();
        let (multi, _) = multi_of(&["a", "b"], &log);
        let mut manager = Manager::new();
        manager.push_mode(TestMode::boxed("base", &log)).unwrap();
        manager.push_mode(Box::new(multi)).unwrap();

        manager.tick(0.5).unwrap();
        let multi = manager.current_as_mut::<Multi>().unwrap();
        let first = multi.active_submode().unwrap();
        let submode = multi.submode(first).unwrap();
        assert_eq!(submode.as_any().downcast_ref::<TestMode>().unwrap().steps, vec![0.5]);

        multi.activate_next(false).unwrap();
        multi.activate_next(false).unwrap();
        manager.tick(0.5).unwrap();
        assert_eq!(manager.current_mode().unwrap().name(), "base");
        assert!(manager.current_mode().unwrap().is_active());
    }
}
