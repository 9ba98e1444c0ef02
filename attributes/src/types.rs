//! Attribute type tags.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Closed set of attribute type tags.
///
/// `Entity` is a container ("object") owning field-level definitions.
/// `Option` is a selectable choice belonging to a `Select`/`MultiSelect`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttributeType {
    Checkbox,
    Datetime,
    Email,
    Entity,
    Files,
    MultiSelect,
    Number,
    Option,
    Relation,
    Select,
    Text,
    Url,
}

impl AttributeType {
    /// Every tag, in registry order.
    pub const ALL: [AttributeType; 12] = [
        AttributeType::Checkbox,
        AttributeType::Datetime,
        AttributeType::Email,
        AttributeType::Entity,
        AttributeType::Files,
        AttributeType::MultiSelect,
        AttributeType::Number,
        AttributeType::Option,
        AttributeType::Relation,
        AttributeType::Select,
        AttributeType::Text,
        AttributeType::Url,
    ];

    /// Values of this type are stored as more than one tuple.
    pub fn is_multi_valued(self) -> bool {
        matches!(self, AttributeType::MultiSelect)
    }

    /// Definitions of this type own children instead of holding values.
    pub fn is_container(self) -> bool {
        matches!(self, AttributeType::Entity)
    }

    /// Whether records can carry a value for this type.
    pub fn holds_value(self) -> bool {
        !matches!(self, AttributeType::Entity | AttributeType::Option)
    }

    /// Whether children of this definition are `Option` definitions.
    pub fn has_options(self) -> bool {
        matches!(self, AttributeType::Select | AttributeType::MultiSelect)
    }
}

/// Resource kind targeted by a `relation` attribute.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationUnit {
    #[default]
    Cycle,
    Issue,
    Module,
    User,
}
