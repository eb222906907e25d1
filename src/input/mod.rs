//! Input handling module
//!
//! Key bindings that turn [`InputEvent`](crate::core::events::InputEvent)s
//! into world actions.

mod controls;

pub use controls::{HoldAction, KeyAction, KeyControls};
