//! Static metadata per attribute type.
//!
//! `meta()` is an exhaustive `match`, so adding a tag without registry
//! metadata does not compile.

use crate::definition::AttributePatch;
use crate::settings::{
    CheckboxRepresentation, CheckboxSettings, DatetimeSettings, ExtraSettings, FileSettings,
    NumberSettings,
};
use crate::types::{AttributeType, RelationUnit};

/// Presentation and seeding data for one type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTypeMeta {
    pub label: &'static str,
    pub icon: &'static str,
    /// Seeds the creation form.
    pub default_form_values: AttributePatch,
    /// Merged into the create request when the attribute is first added.
    pub initial_payload: AttributePatch,
}

impl AttributeType {
    pub fn meta(self) -> AttributeTypeMeta {
        match self {
            AttributeType::Checkbox => {
                let settings = ExtraSettings::Checkbox(CheckboxSettings {
                    representation: CheckboxRepresentation::Check,
                });
                AttributeTypeMeta {
                    label: "Checkbox",
                    icon: "check_circle",
                    default_form_values: AttributePatch {
                        default_value: Some("true".to_string()),
                        extra_settings: Some(settings.clone()),
                        ..Default::default()
                    },
                    initial_payload: AttributePatch {
                        default_value: Some("true".to_string()),
                        extra_settings: Some(settings),
                        ..Default::default()
                    },
                }
            }
            AttributeType::Datetime => {
                let settings = ExtraSettings::Datetime(DatetimeSettings::default());
                AttributeTypeMeta {
                    label: "Date Time",
                    icon: "calendar_today",
                    default_form_values: AttributePatch {
                        default_value: Some(String::new()),
                        extra_settings: Some(settings.clone()),
                        ..Default::default()
                    },
                    initial_payload: AttributePatch {
                        extra_settings: Some(settings),
                        ..Default::default()
                    },
                }
            }
            AttributeType::Email => text_like("Email", "alternate_email"),
            AttributeType::Entity => AttributeTypeMeta {
                label: "Entity",
                icon: "category",
                default_form_values: AttributePatch::default(),
                initial_payload: AttributePatch::default(),
            },
            AttributeType::Files => {
                let settings = ExtraSettings::Files(FileSettings::default());
                AttributeTypeMeta {
                    label: "Files",
                    icon: "attach_file",
                    default_form_values: AttributePatch {
                        extra_settings: Some(settings.clone()),
                        ..Default::default()
                    },
                    initial_payload: AttributePatch {
                        extra_settings: Some(settings),
                        ..Default::default()
                    },
                }
            }
            AttributeType::MultiSelect => AttributeTypeMeta {
                label: "Multi select",
                icon: "checklist",
                default_form_values: AttributePatch {
                    is_multi: Some(true),
                    ..Default::default()
                },
                initial_payload: AttributePatch {
                    is_multi: Some(true),
                    ..Default::default()
                },
            },
            AttributeType::Number => {
                let settings = ExtraSettings::Number(NumberSettings::default());
                AttributeTypeMeta {
                    label: "Number",
                    icon: "pin",
                    default_form_values: AttributePatch {
                        default_value: Some(String::new()),
                        extra_settings: Some(settings.clone()),
                        ..Default::default()
                    },
                    initial_payload: AttributePatch {
                        extra_settings: Some(settings),
                        ..Default::default()
                    },
                }
            }
            AttributeType::Option => AttributeTypeMeta {
                label: "Option",
                icon: "radio_button_checked",
                default_form_values: AttributePatch {
                    color: Some("#000000".to_string()),
                    is_default: Some(false),
                    ..Default::default()
                },
                initial_payload: AttributePatch::default(),
            },
            AttributeType::Relation => AttributeTypeMeta {
                label: "Relation",
                icon: "link",
                default_form_values: AttributePatch {
                    unit: Some(RelationUnit::Cycle),
                    ..Default::default()
                },
                initial_payload: AttributePatch {
                    unit: Some(RelationUnit::Cycle),
                    ..Default::default()
                },
            },
            AttributeType::Select => AttributeTypeMeta {
                label: "Select",
                icon: "arrow_drop_down_circle",
                default_form_values: AttributePatch {
                    is_multi: Some(false),
                    ..Default::default()
                },
                initial_payload: AttributePatch::default(),
            },
            AttributeType::Text => text_like("Text", "title"),
            AttributeType::Url => text_like("URL", "language"),
        }
    }

    /// Create request for a new attribute of this type under `parent`.
    ///
    /// The display name defaults to the type label, as the product does when
    /// an attribute is first added.
    pub fn creation_payload(self, parent: impl Into<String>) -> AttributePatch {
        let meta = self.meta();
        AttributePatch::default()
            .with_type(self)
            .with_display_name(meta.label)
            .overlay(&meta.initial_payload)
            .with_parent(parent)
    }
}

fn text_like(label: &'static str, icon: &'static str) -> AttributeTypeMeta {
    AttributeTypeMeta {
        label,
        icon,
        default_form_values: AttributePatch {
            default_value: Some(String::new()),
            ..Default::default()
        },
        initial_payload: AttributePatch::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_tag_has_metadata() {
        for ty in AttributeType::ALL {
            let meta = ty.meta();
            assert!(!meta.label.is_empty(), "{ty} has no label");
            assert!(!meta.icon.is_empty(), "{ty} has no icon");
            if let Some(settings) = &meta.default_form_values.extra_settings {
                assert!(settings.fits(ty), "{ty} form settings do not fit");
            }
        }
    }

    #[test]
    fn checkbox_defaults_to_checked_check_representation() {
        let meta = AttributeType::Checkbox.meta();
        assert_eq!(meta.default_form_values.default_value.as_deref(), Some("true"));
        assert_eq!(
            meta.default_form_values
                .extra_settings
                .as_ref()
                .and_then(ExtraSettings::as_checkbox)
                .map(|s| s.representation),
            Some(CheckboxRepresentation::Check)
        );
    }

    #[test]
    fn relation_payload_targets_cycles() {
        let payload = AttributeType::Relation.creation_payload("entity-1");
        assert_eq!(payload.unit, Some(RelationUnit::Cycle));
        assert_eq!(payload.parent.as_deref(), Some("entity-1"));
        assert_eq!(payload.display_name.as_deref(), Some("Relation"));
        assert_eq!(payload.attribute_type, Some(AttributeType::Relation));
    }

    #[test]
    fn files_payload_accepts_jpegs() {
        let payload = AttributeType::Files.creation_payload("entity-1");
        let formats = payload
            .extra_settings
            .as_ref()
            .and_then(ExtraSettings::as_files)
            .map(|s| s.file_formats.clone());
        assert_eq!(
            formats,
            Some(vec![".jpg".to_string(), ".jpeg".to_string()])
        );
    }

    #[test]
    fn multi_select_is_multi() {
        let payload = AttributeType::MultiSelect.creation_payload("e");
        assert_eq!(payload.is_multi, Some(true));
    }
}
