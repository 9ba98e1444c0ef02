//! Type-specific configuration carried in `extra_settings`.
//!
//! On the wire `extra_settings` is a free-form JSON object whose shape depends
//! on the owning definition's type. [`ExtraSettings::from_json`] turns it into
//! a tagged union. Decoding is lenient: missing keys fall back to the registry
//! defaults and a malformed object is logged and replaced by the defaults.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::types::AttributeType;

/// Presentation of a checkbox attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckboxRepresentation {
    #[default]
    Check,
    ToggleSwitch,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckboxSettings {
    pub representation: CheckboxRepresentation,
}

/// Clock used to display the time part of a datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12")]
    TwelveHour,
    #[serde(rename = "24")]
    TwentyFourHour,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatetimeSettings {
    pub date_format: String,
    pub time_format: TimeFormat,
    pub hide_date: bool,
    pub hide_time: bool,
}

impl Default for DatetimeSettings {
    fn default() -> Self {
        Self {
            date_format: "DD-MM-YYYY".to_string(),
            time_format: TimeFormat::TwelveHour,
            hide_date: false,
            hide_time: false,
        }
    }
}

/// Presentation of a number attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberRepresentation {
    #[default]
    Numerical,
    Bar,
    Ring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberSettings {
    pub representation: NumberRepresentation,
    /// Denominator for bar/ring fill ratios.
    #[serde(
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub divided_by: Option<f64>,
    pub show_number: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Default for NumberSettings {
    fn default() -> Self {
        Self {
            representation: NumberRepresentation::Numerical,
            divided_by: Some(100.0),
            show_number: true,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub file_formats: Vec<String>,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            file_formats: vec![".jpg".to_string(), ".jpeg".to_string()],
        }
    }
}

/// `extra_settings` keyed by attribute type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExtraSettings {
    Checkbox(CheckboxSettings),
    Datetime(DatetimeSettings),
    Number(NumberSettings),
    Files(FileSettings),
    /// Types without settings.
    #[default]
    None,
}

impl ExtraSettings {
    /// Registry defaults for `ty`.
    pub fn default_for(ty: AttributeType) -> Self {
        match ty {
            AttributeType::Checkbox => ExtraSettings::Checkbox(CheckboxSettings::default()),
            AttributeType::Datetime => ExtraSettings::Datetime(DatetimeSettings::default()),
            AttributeType::Number => ExtraSettings::Number(NumberSettings::default()),
            AttributeType::Files => ExtraSettings::Files(FileSettings::default()),
            _ => ExtraSettings::None,
        }
    }

    /// Decode the wire object for a definition of type `ty`.
    pub fn from_json(ty: AttributeType, value: &Value) -> Self {
        if !value.is_object() {
            return Self::default_for(ty);
        }
        let decoded = match ty {
            AttributeType::Checkbox => {
                serde_json::from_value(value.clone()).map(ExtraSettings::Checkbox)
            }
            AttributeType::Datetime => {
                serde_json::from_value(value.clone()).map(ExtraSettings::Datetime)
            }
            AttributeType::Number => serde_json::from_value(value.clone()).map(ExtraSettings::Number),
            AttributeType::Files => serde_json::from_value(value.clone()).map(ExtraSettings::Files),
            _ => Ok(ExtraSettings::None),
        };
        decoded.unwrap_or_else(|err| {
            tracing::warn!(attribute_type = %ty, error = %err, "malformed extra_settings, using defaults");
            Self::default_for(ty)
        })
    }

    /// Encode back to the wire object.
    pub fn to_json(&self) -> Value {
        let encoded = match self {
            ExtraSettings::Checkbox(s) => serde_json::to_value(s),
            ExtraSettings::Datetime(s) => serde_json::to_value(s),
            ExtraSettings::Number(s) => serde_json::to_value(s),
            ExtraSettings::Files(s) => serde_json::to_value(s),
            ExtraSettings::None => return Value::Object(Default::default()),
        };
        encoded.unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// Whether these settings belong to a definition of type `ty`.
    pub fn fits(&self, ty: AttributeType) -> bool {
        matches!(
            (self, ty),
            (ExtraSettings::Checkbox(_), AttributeType::Checkbox)
                | (ExtraSettings::Datetime(_), AttributeType::Datetime)
                | (ExtraSettings::Number(_), AttributeType::Number)
                | (ExtraSettings::Files(_), AttributeType::Files)
        ) || matches!(self, ExtraSettings::None)
    }

    pub fn as_number(&self) -> Option<&NumberSettings> {
        match self {
            ExtraSettings::Number(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DatetimeSettings> {
        match self {
            ExtraSettings::Datetime(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_checkbox(&self) -> Option<&CheckboxSettings> {
        match self {
            ExtraSettings::Checkbox(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_files(&self) -> Option<&FileSettings> {
        match self {
            ExtraSettings::Files(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for ExtraSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Accepts `50`, `50.5`, `"50"` or `null`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn number_settings_accept_string_denominator() {
        let settings = ExtraSettings::from_json(
            AttributeType::Number,
            &json!({"representation": "bar", "divided_by": "50"}),
        );
        let number = settings.as_number().unwrap();
        assert_eq!(number.representation, NumberRepresentation::Bar);
        assert_eq!(number.divided_by, Some(50.0));
        assert!(number.show_number);
    }

    #[test]
    fn missing_settings_use_defaults() {
        assert_eq!(
            ExtraSettings::from_json(AttributeType::Datetime, &Value::Null),
            ExtraSettings::Datetime(DatetimeSettings::default())
        );
        assert_eq!(
            ExtraSettings::from_json(AttributeType::Text, &json!({"anything": 1})),
            ExtraSettings::None
        );
    }

    #[test]
    fn malformed_settings_fall_back() {
        let settings = ExtraSettings::from_json(
            AttributeType::Checkbox,
            &json!({"representation": "sparkles"}),
        );
        assert_eq!(settings, ExtraSettings::Checkbox(CheckboxSettings::default()));
    }

    #[test]
    fn time_format_uses_numeric_tags() {
        let settings = ExtraSettings::from_json(
            AttributeType::Datetime,
            &json!({"time_format": "24", "hide_time": true}),
        );
        let dt = settings.as_datetime().unwrap();
        assert_eq!(dt.time_format, TimeFormat::TwentyFourHour);
        assert!(dt.hide_time);
        assert_eq!(dt.date_format, "DD-MM-YYYY");
        assert_eq!(settings.to_json()["time_format"], json!("24"));
    }

    #[test]
    fn none_serializes_as_empty_object() {
        assert_eq!(ExtraSettings::None.to_json(), json!({}));
    }
}
