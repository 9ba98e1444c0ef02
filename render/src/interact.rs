//! User gestures on a rendered control, turned into encoded value changes.

use chrono::{DateTime, Utc};
use tracker_attributes::{AttributeInput, AttributeType, ValueChange, encode_for};

use crate::control::{AttributeControl, ControlKind};
use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq, Eq, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UserAction {
    Toggle,
    SetDate(DateTime<Utc>),
    SetNumber(i64),
    SetText(String),
    /// Pick the single value of a select (adds to a multi-select).
    SelectOption(String),
    AddOption(String),
    RemoveOption(String),
    SetRelation(String),
    /// Asset URL of an uploaded file.
    SetFile(String),
    Clear,
}

impl AttributeControl {
    /// Encode the change `action` makes to this control's value.
    pub fn interact(&self, action: UserAction) -> Result<ValueChange, RenderError> {
        let input = self.next_input(action).inspect_err(|err| {
            tracing::debug!(attribute_id = %self.attribute_id, error = %err, "interaction refused");
        })?;
        let encoded = encode_for(self.attribute_type, &input)?;
        Ok(ValueChange::new(self.attribute_id.clone(), encoded))
    }

    fn unsupported(&self, action: &UserAction) -> RenderError {
        RenderError::UnsupportedAction {
            action: action.into(),
            control: self.attribute_type,
        }
    }

    fn required(&self) -> RenderError {
        RenderError::RequiredValue {
            attribute_id: self.attribute_id.clone(),
        }
    }

    fn known_option(&self, option_id: &str) -> Result<(), RenderError> {
        if self.has_option(option_id) {
            Ok(())
        } else {
            Err(RenderError::UnknownOption {
                attribute_id: self.attribute_id.clone(),
                option_id: option_id.to_string(),
            })
        }
    }

    fn next_input(&self, action: UserAction) -> Result<AttributeInput, RenderError> {
        // Clearing a required value is refused for every kind except the
        // checkbox, which has no empty state.
        if action == UserAction::Clear
            && self.required
            && self.attribute_type != AttributeType::Checkbox
        {
            return Err(self.required());
        }

        match (&self.kind, action) {
            (ControlKind::Checkbox { checked, .. }, UserAction::Toggle) => {
                Ok(AttributeInput::Checkbox(!checked))
            }
            (ControlKind::Checkbox { .. }, UserAction::Clear) => Ok(AttributeInput::Checkbox(false)),

            (ControlKind::Datetime { .. }, UserAction::SetDate(at)) => {
                Ok(AttributeInput::Datetime(Some(at)))
            }
            (ControlKind::Datetime { .. }, UserAction::Clear) => Ok(AttributeInput::Datetime(None)),

            (ControlKind::Number { .. }, UserAction::SetNumber(n)) => {
                Ok(AttributeInput::Number(Some(n)))
            }
            (ControlKind::Number { .. }, UserAction::Clear) => Ok(AttributeInput::Number(None)),

            (ControlKind::Text { .. }, UserAction::SetText(text)) => {
                if text.trim().is_empty() && self.required {
                    return Err(self.required());
                }
                Ok(AttributeInput::Text(Some(text)))
            }
            (ControlKind::Text { .. }, UserAction::Clear) => Ok(AttributeInput::Text(None)),

            (ControlKind::Select { .. }, UserAction::SelectOption(id)) => {
                self.known_option(&id)?;
                Ok(AttributeInput::Select(Some(id)))
            }
            (ControlKind::Select { selected, .. }, UserAction::RemoveOption(id)) => {
                // Only the shown selection can be removed.
                if selected.as_deref() != Some(id.as_str()) {
                    return Err(self.unsupported(&UserAction::RemoveOption(id)));
                }
                if self.required {
                    return Err(self.required());
                }
                Ok(AttributeInput::Select(None))
            }
            (ControlKind::Select { .. }, UserAction::Clear) => Ok(AttributeInput::Select(None)),

            (
                ControlKind::MultiSelect { .. },
                UserAction::AddOption(id) | UserAction::SelectOption(id),
            ) => {
                self.known_option(&id)?;
                let mut ids: Vec<String> =
                    self.selected_ids().into_iter().map(str::to_string).collect();
                if !ids.contains(&id) {
                    ids.push(id);
                }
                Ok(AttributeInput::MultiSelect(ids))
            }
            (ControlKind::MultiSelect { .. }, UserAction::RemoveOption(id)) => {
                let current = self.selected_ids();
                let ids: Vec<String> = current
                    .iter()
                    .copied()
                    .filter(|selected| *selected != id)
                    .map(str::to_string)
                    .collect();
                if self.required && ids.is_empty() && !current.is_empty() {
                    return Err(self.required());
                }
                Ok(AttributeInput::MultiSelect(ids))
            }
            (ControlKind::MultiSelect { .. }, UserAction::Clear) => {
                Ok(AttributeInput::MultiSelect(Vec::new()))
            }

            (ControlKind::Relation { .. }, UserAction::SetRelation(id)) => {
                Ok(AttributeInput::Relation(Some(id)))
            }
            (ControlKind::Relation { .. }, UserAction::Clear) => Ok(AttributeInput::Relation(None)),

            (
                ControlKind::File {
                    accepted_formats, ..
                },
                UserAction::SetFile(url),
            ) => {
                let lower = url.to_ascii_lowercase();
                let accepted = accepted_formats.is_empty()
                    || accepted_formats
                        .iter()
                        .any(|format| lower.ends_with(&format.to_ascii_lowercase()));
                if !accepted {
                    return Err(RenderError::UnsupportedFormat {
                        file: url,
                        accepted: accepted_formats.clone(),
                    });
                }
                Ok(AttributeInput::File(Some(url)))
            }
            (ControlKind::File { .. }, UserAction::Clear) => Ok(AttributeInput::File(None)),

            (_, action) => Err(self.unsupported(&action)),
        }
    }
}
