//! Attribute definitions and partial updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::ExtraSettings;
use crate::types::{AttributeType, RelationUnit};

/// Schema entry describing one typed, configurable field.
///
/// Entities ("objects") are definitions of type [`AttributeType::Entity`]
/// whose `children` are field-level definitions; select/multi-select
/// definitions own `Option` children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DefinitionWire", into = "DefinitionWire")]
pub struct AttributeDefinition {
    /// Server-assigned identifier.
    pub id: String,
    pub attribute_type: AttributeType,
    pub display_name: String,
    /// String-encoded default; interpretation depends on `attribute_type`.
    pub default_value: Option<String>,
    pub extra_settings: ExtraSettings,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_required: bool,
    pub is_multi: bool,
    pub is_default: bool,
    pub is_shared: bool,
    /// Lookup key of the owning definition or entity, never an ownership link.
    pub parent: Option<String>,
    pub unit: Option<RelationUnit>,
    pub sort_order: f64,
    pub project: Option<String>,
    pub workspace: Option<String>,
    pub children: Vec<AttributeDefinition>,
}

impl AttributeDefinition {
    /// A bare definition with registry-default settings.
    pub fn new(
        id: impl Into<String>,
        attribute_type: AttributeType,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            attribute_type,
            display_name: display_name.into(),
            default_value: None,
            extra_settings: ExtraSettings::default_for(attribute_type),
            color: None,
            icon: None,
            is_required: false,
            is_multi: attribute_type.is_multi_valued(),
            is_default: false,
            is_shared: false,
            parent: None,
            unit: None,
            sort_order: 0.0,
            project: None,
            workspace: None,
            children: Vec::new(),
        }
    }

    /// Shallow merge: every field present in `patch` replaces the current one.
    ///
    /// `extra_settings` is replaced wholesale, not merged key by key. Settings
    /// that do not fit the (possibly new) type are reset to its defaults.
    pub fn merge_patch(&mut self, patch: &AttributePatch) {
        if let Some(ty) = patch.attribute_type {
            self.attribute_type = ty;
        }
        if let Some(name) = &patch.display_name {
            self.display_name = name.clone();
        }
        if let Some(default_value) = &patch.default_value {
            self.default_value = Some(default_value.clone());
        }
        if let Some(settings) = &patch.extra_settings {
            self.extra_settings = settings.clone();
        }
        if !self.extra_settings.fits(self.attribute_type) {
            self.extra_settings = ExtraSettings::default_for(self.attribute_type);
        }
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
        if let Some(icon) = &patch.icon {
            self.icon = Some(icon.clone());
        }
        if let Some(v) = patch.is_required {
            self.is_required = v;
        }
        if let Some(v) = patch.is_multi {
            self.is_multi = v;
        }
        if let Some(v) = patch.is_default {
            self.is_default = v;
        }
        if let Some(v) = patch.is_shared {
            self.is_shared = v;
        }
        if let Some(parent) = &patch.parent {
            self.parent = Some(parent.clone());
        }
        if let Some(unit) = patch.unit {
            self.unit = Some(unit);
        }
        if let Some(order) = patch.sort_order {
            self.sort_order = order;
        }
        if let Some(project) = &patch.project {
            self.project = Some(project.clone());
        }
    }

    /// Children ordered for display.
    pub fn sorted_children(&self) -> Vec<&AttributeDefinition> {
        let mut children: Vec<&AttributeDefinition> = self.children.iter().collect();
        children.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
        children
    }

    pub fn child(&self, id: &str) -> Option<&AttributeDefinition> {
        self.children.iter().find(|c| c.id == id)
    }

    pub fn child_mut(&mut self, id: &str) -> Option<&mut AttributeDefinition> {
        self.children.iter_mut().find(|c| c.id == id)
    }

    /// Option children flagged as default, in display order.
    ///
    /// More than one child may carry the flag; nothing here enforces a
    /// single default.
    pub fn default_options(&self) -> Vec<&AttributeDefinition> {
        self.sorted_children()
            .into_iter()
            .filter(|c| c.attribute_type == AttributeType::Option && c.is_default)
            .collect()
    }
}

/// Typed partial definition, used for create payloads and updates.
///
/// Absent fields are omitted from the serialized body.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AttributePatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_settings: Option<ExtraSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_multi: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_shared: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<RelationUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl AttributePatch {
    pub fn is_empty(&self) -> bool {
        self == &AttributePatch::default()
    }

    /// Fields of `other` override fields of `self`.
    pub fn overlay(mut self, other: &AttributePatch) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            attribute_type,
            display_name,
            default_value,
            extra_settings,
            color,
            icon,
            is_required,
            is_multi,
            is_default,
            is_shared,
            parent,
            unit,
            sort_order,
            project
        );
        self
    }

    pub fn with_type(mut self, ty: AttributeType) -> Self {
        self.attribute_type = Some(ty);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }

    /// Materialise a definition from a create payload, as the server would.
    pub fn into_definition(self, id: impl Into<String>) -> AttributeDefinition {
        let ty = self.attribute_type.unwrap_or(AttributeType::Text);
        let mut definition = AttributeDefinition::new(id, ty, "");
        definition.merge_patch(&self);
        definition
    }
}

#[derive(Serialize, Deserialize)]
struct DefinitionWire {
    id: String,
    #[serde(rename = "type")]
    attribute_type: AttributeType,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    default_value: Option<String>,
    #[serde(default)]
    extra_settings: Value,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    is_multi: bool,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    is_shared: bool,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    unit: Option<RelationUnit>,
    #[serde(default)]
    sort_order: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<AttributeDefinition>,
}

impl From<DefinitionWire> for AttributeDefinition {
    fn from(wire: DefinitionWire) -> Self {
        Self {
            extra_settings: ExtraSettings::from_json(wire.attribute_type, &wire.extra_settings),
            id: wire.id,
            attribute_type: wire.attribute_type,
            display_name: wire.display_name,
            default_value: wire.default_value,
            color: wire.color,
            icon: wire.icon,
            is_required: wire.is_required,
            is_multi: wire.is_multi,
            is_default: wire.is_default,
            is_shared: wire.is_shared,
            parent: wire.parent,
            unit: wire.unit,
            sort_order: wire.sort_order,
            project: wire.project,
            workspace: wire.workspace,
            children: wire.children,
        }
    }
}

impl From<AttributeDefinition> for DefinitionWire {
    fn from(def: AttributeDefinition) -> Self {
        Self {
            extra_settings: def.extra_settings.to_json(),
            id: def.id,
            attribute_type: def.attribute_type,
            display_name: def.display_name,
            default_value: def.default_value,
            color: def.color,
            icon: def.icon,
            is_required: def.is_required,
            is_multi: def.is_multi,
            is_default: def.is_default,
            is_shared: def.is_shared,
            parent: def.parent,
            unit: def.unit,
            sort_order: def.sort_order,
            project: def.project,
            workspace: def.workspace,
            children: def.children,
        }
    }
}
