//! Renderer dispatch for custom attributes.
//!
//! [`render`] maps a definition and the record's stored tuples to an
//! [`AttributeControl`]: a plain description of what to draw, configured by
//! the definition's `extra_settings`. [`AttributeControl::interact`] turns a
//! [`UserAction`] on that control into a [`ValueChange`] for the value store.
//! Nothing here holds state.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod control;
mod datetime;
mod error;
mod interact;

pub use control::{
    AttributeControl, ControlKind, NumberDisplay, OptionChip, TextKind, fill_ratio, render,
};
pub use error::RenderError;
pub use interact::UserAction;
pub use tracker_attributes::ValueChange;
