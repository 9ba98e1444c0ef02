//! Typed custom attributes for tracker records.
//!
//! An *attribute definition* describes one typed, configurable field that can
//! be attached to issues, cycles or modules. An *attribute value* holds the
//! wire-encoded data for one attribute on one record.
//!
//! This crate is pure data:
//! - [`AttributeType`] and the static type registry ([`AttributeTypeMeta`])
//! - [`AttributeDefinition`] / [`AttributePatch`] with typed [`ExtraSettings`]
//! - [`PropValue`] / [`AttributeValue`] and the per-type [`codec`]
//!
//! Persistence, caching and rendering live in the `tracker-store`,
//! `tracker-client` and `tracker-render` crates.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod codec;
pub mod definition;
pub mod registry;
pub mod settings;
pub mod types;
pub mod value;

pub use codec::{
    AttributeInput, CodecError, Encoded, ValueChange, decode, encode, encode_for, parse_input,
};
pub use definition::{AttributeDefinition, AttributePatch};
pub use registry::AttributeTypeMeta;
pub use settings::{
    CheckboxRepresentation, CheckboxSettings, DatetimeSettings, ExtraSettings, FileSettings,
    NumberRepresentation, NumberSettings, TimeFormat,
};
pub use types::{AttributeType, RelationUnit};
pub use value::{AttributeValue, PropValue, ValuesPayload};
