use chrono::{DateTime, Utc};
use tracker_attributes::{
    AttributeDefinition, AttributeInput, AttributeType, CheckboxRepresentation, DatetimeSettings,
    NumberRepresentation, PropValue, RelationUnit, decode,
};

use crate::datetime::format_datetime;
use crate::error::RenderError;

/// Flavour of a free-text control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TextKind {
    Text,
    Email,
    Url,
}

/// How a number is drawn. Ratios lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberDisplay {
    Numeric,
    Bar { ratio: Option<f64> },
    Ring { ratio: Option<f64> },
}

/// One option of a select or multi-select.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChip {
    pub id: String,
    pub label: String,
    pub color: Option<String>,
    pub selected: bool,
    /// Whether the chip shows a remove affordance.
    pub removable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Checkbox {
        checked: bool,
        representation: CheckboxRepresentation,
    },
    Datetime {
        value: Option<DateTime<Utc>>,
        /// Formatted per the definition's settings; `None` when unset or
        /// when both parts are hidden.
        display: Option<String>,
        settings: DatetimeSettings,
    },
    Number {
        value: Option<i64>,
        display: NumberDisplay,
        show_number: bool,
        color: Option<String>,
    },
    Text {
        kind: TextKind,
        value: Option<String>,
    },
    Select {
        selected: Option<String>,
        options: Vec<OptionChip>,
    },
    MultiSelect {
        options: Vec<OptionChip>,
    },
    Relation {
        unit: RelationUnit,
        value: Option<String>,
    },
    File {
        accepted_formats: Vec<String>,
        value: Option<String>,
    },
}

/// A concrete control for one attribute on one record.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeControl {
    pub attribute_id: String,
    pub attribute_type: AttributeType,
    pub label: String,
    pub required: bool,
    pub kind: ControlKind,
}

impl AttributeControl {
    /// Ids of the currently selected options, for select controls.
    pub fn selected_ids(&self) -> Vec<&str> {
        match &self.kind {
            ControlKind::Select { selected, .. } => selected.iter().map(String::as_str).collect(),
            ControlKind::MultiSelect { options } => options
                .iter()
                .filter(|chip| chip.selected)
                .map(|chip| chip.id.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn has_option(&self, option_id: &str) -> bool {
        match &self.kind {
            ControlKind::Select { options, .. } | ControlKind::MultiSelect { options } => {
                options.iter().any(|chip| chip.id == option_id)
            }
            _ => false,
        }
    }
}

/// Fraction of `divided_by` reached by `value`, clamped to `[0, 1]`.
pub fn fill_ratio(value: Option<i64>, divided_by: Option<f64>) -> Option<f64> {
    let denominator = divided_by.filter(|d| *d != 0.0 && d.is_finite())?;
    let ratio = value? as f64 / denominator;
    Some(ratio.clamp(0.0, 1.0))
}

fn option_chips(definition: &AttributeDefinition, selected: &[&str]) -> Vec<OptionChip> {
    let last_required = definition.is_required && selected.len() == 1;
    for id in selected {
        if !definition.children.iter().any(|child| child.id == *id) {
            tracing::warn!(attribute_id = %definition.id, option_id = %id, "stored value names no known option");
        }
    }
    definition
        .sorted_children()
        .into_iter()
        .filter(|child| child.attribute_type == AttributeType::Option)
        .map(|option| {
            let is_selected = selected.contains(&option.id.as_str());
            OptionChip {
                id: option.id.clone(),
                label: option.display_name.clone(),
                color: option.color.clone(),
                selected: is_selected,
                removable: is_selected && !last_required,
            }
        })
        .collect()
}

/// Build the control for `definition` given the record's stored tuples.
///
/// Deterministic in its inputs. Options are read from
/// `definition.children`. A select with nothing stored shows its first
/// default option as selected.
pub fn render(
    definition: &AttributeDefinition,
    stored: Option<&[PropValue]>,
) -> Result<AttributeControl, RenderError> {
    let ty = definition.attribute_type;
    if !ty.holds_value() {
        return Err(RenderError::NotRenderable(ty));
    }

    let kind = match decode(ty, stored)? {
        AttributeInput::Checkbox(checked) => ControlKind::Checkbox {
            checked,
            representation: definition
                .extra_settings
                .as_checkbox()
                .map(|s| s.representation)
                .unwrap_or_default(),
        },
        AttributeInput::Datetime(value) => {
            let settings = definition
                .extra_settings
                .as_datetime()
                .cloned()
                .unwrap_or_default();
            ControlKind::Datetime {
                value,
                display: value.and_then(|at| format_datetime(at, &settings)),
                settings,
            }
        }
        AttributeInput::Number(value) => {
            let settings = definition
                .extra_settings
                .as_number()
                .cloned()
                .unwrap_or_default();
            let ratio = fill_ratio(value, settings.divided_by);
            let display = match settings.representation {
                NumberRepresentation::Numerical => NumberDisplay::Numeric,
                NumberRepresentation::Bar => NumberDisplay::Bar { ratio },
                NumberRepresentation::Ring => NumberDisplay::Ring { ratio },
            };
            ControlKind::Number {
                value,
                display,
                show_number: settings.show_number,
                color: settings.color,
            }
        }
        AttributeInput::Text(value) => ControlKind::Text {
            kind: match ty {
                AttributeType::Email => TextKind::Email,
                AttributeType::Url => TextKind::Url,
                _ => TextKind::Text,
            },
            value,
        },
        AttributeInput::Select(value) => {
            let selected = value.or_else(|| {
                definition
                    .default_options()
                    .first()
                    .map(|option| option.id.clone())
            });
            let ids: Vec<&str> = selected.iter().map(String::as_str).collect();
            ControlKind::Select {
                options: option_chips(definition, &ids),
                selected,
            }
        }
        AttributeInput::MultiSelect(values) => {
            let ids: Vec<&str> = values.iter().map(String::as_str).collect();
            ControlKind::MultiSelect {
                options: option_chips(definition, &ids),
            }
        }
        AttributeInput::Relation(value) => ControlKind::Relation {
            unit: definition.unit.unwrap_or_default(),
            value,
        },
        AttributeInput::File(value) => ControlKind::File {
            accepted_formats: definition
                .extra_settings
                .as_files()
                .map(|s| s.file_formats.clone())
                .unwrap_or_default(),
            value,
        },
    };

    Ok(AttributeControl {
        attribute_id: definition.id.clone(),
        attribute_type: ty,
        label: definition.display_name.clone(),
        required: definition.is_required,
        kind,
    })
}
