//! Per-type mapping between UI values and wire tuples.
//!
//! | type              | UI value                 | wire                       |
//! |-------------------|--------------------------|----------------------------|
//! | checkbox          | `bool`                   | `["true"]` / `["false"]`   |
//! | datetime          | `Option<DateTime<Utc>>`  | `[iso8601]`                |
//! | number            | `Option<i64>`            | `[decimal]`                |
//! | text, email, url  | `Option<String>`         | `[s]`                      |
//! | select, relation  | `Option<String>` (id)    | `[id]`                     |
//! | files             | `Option<String>` (url)   | `[url]`                    |
//! | multi_select      | `Vec<String>` (ids)      | one tuple per id           |
//!
//! An empty non-multi value encodes to [`Encoded::Delete`]: "no value" and
//! "empty string" are different states and only the former is stored.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use thiserror::Error;

use crate::types::AttributeType;
use crate::value::PropValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("{0} attributes do not hold record values")]
    NotAValueType(AttributeType),

    #[error("value of kind {input} cannot be stored in a {expected} attribute")]
    TypeMismatch {
        expected: AttributeType,
        input: &'static str,
    },

    #[error("invalid datetime {0:?}")]
    InvalidDatetime(String),

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("invalid boolean {0:?}")]
    InvalidBoolean(String),
}

/// Decoded, typed UI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeInput {
    Checkbox(bool),
    Datetime(Option<DateTime<Utc>>),
    Number(Option<i64>),
    /// Text, email and url attributes.
    Text(Option<String>),
    Select(Option<String>),
    MultiSelect(Vec<String>),
    Relation(Option<String>),
    File(Option<String>),
}

impl AttributeInput {
    /// The value a record has when nothing is stored for the attribute.
    pub fn neutral(ty: AttributeType) -> Result<Self, CodecError> {
        Ok(match ty {
            AttributeType::Checkbox => AttributeInput::Checkbox(false),
            AttributeType::Datetime => AttributeInput::Datetime(None),
            AttributeType::Number => AttributeInput::Number(None),
            AttributeType::Text | AttributeType::Email | AttributeType::Url => {
                AttributeInput::Text(None)
            }
            AttributeType::Select => AttributeInput::Select(None),
            AttributeType::MultiSelect => AttributeInput::MultiSelect(Vec::new()),
            AttributeType::Relation => AttributeInput::Relation(None),
            AttributeType::Files => AttributeInput::File(None),
            AttributeType::Entity | AttributeType::Option => {
                return Err(CodecError::NotAValueType(ty));
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttributeInput::Checkbox(_) => "checkbox",
            AttributeInput::Datetime(_) => "datetime",
            AttributeInput::Number(_) => "number",
            AttributeInput::Text(_) => "text",
            AttributeInput::Select(_) => "select",
            AttributeInput::MultiSelect(_) => "multi_select",
            AttributeInput::Relation(_) => "relation",
            AttributeInput::File(_) => "file",
        }
    }

    /// Whether this input may be stored in an attribute of type `ty`.
    pub fn fits(&self, ty: AttributeType) -> bool {
        matches!(
            (self, ty),
            (AttributeInput::Checkbox(_), AttributeType::Checkbox)
                | (AttributeInput::Datetime(_), AttributeType::Datetime)
                | (AttributeInput::Number(_), AttributeType::Number)
                | (
                    AttributeInput::Text(_),
                    AttributeType::Text | AttributeType::Email | AttributeType::Url
                )
                | (AttributeInput::Select(_), AttributeType::Select)
                | (AttributeInput::MultiSelect(_), AttributeType::MultiSelect)
                | (AttributeInput::Relation(_), AttributeType::Relation)
                | (AttributeInput::File(_), AttributeType::Files)
        )
    }
}

/// Result of encoding a UI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Replace the stored tuples with these.
    Write(Vec<PropValue>),
    /// Remove the stored value.
    Delete,
}

impl Encoded {
    /// Tuples a reader observes after this change is applied.
    pub fn tuples(&self) -> &[PropValue] {
        match self {
            Encoded::Write(tuples) => tuples,
            Encoded::Delete => &[],
        }
    }
}

/// An encoded edit of one attribute on one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange {
    pub attribute_id: String,
    pub encoded: Encoded,
}

impl ValueChange {
    pub fn new(attribute_id: impl Into<String>, encoded: Encoded) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            encoded,
        }
    }
}

pub fn encode(input: &AttributeInput) -> Encoded {
    match input {
        AttributeInput::Checkbox(checked) => {
            Encoded::Write(vec![PropValue::scalar(checked.to_string())])
        }
        AttributeInput::Datetime(Some(at)) => {
            Encoded::Write(vec![PropValue::scalar(format_datetime(at))])
        }
        AttributeInput::Number(Some(n)) => Encoded::Write(vec![PropValue::scalar(n.to_string())]),
        AttributeInput::Text(Some(s))
        | AttributeInput::Select(Some(s))
        | AttributeInput::Relation(Some(s))
        | AttributeInput::File(Some(s))
            if !s.is_empty() =>
        {
            Encoded::Write(vec![PropValue::scalar(s.clone())])
        }
        AttributeInput::MultiSelect(ids) => {
            Encoded::Write(ids.iter().map(PropValue::scalar).collect())
        }
        _ => Encoded::Delete,
    }
}

/// [`encode`], rejecting inputs that do not belong to `ty`.
pub fn encode_for(ty: AttributeType, input: &AttributeInput) -> Result<Encoded, CodecError> {
    if !ty.holds_value() {
        return Err(CodecError::NotAValueType(ty));
    }
    if !input.fits(ty) {
        return Err(CodecError::TypeMismatch {
            expected: ty,
            input: input.kind(),
        });
    }
    Ok(encode(input))
}

/// Decode stored tuples; `None` means the record has no entry for the id.
pub fn decode(ty: AttributeType, stored: Option<&[PropValue]>) -> Result<AttributeInput, CodecError> {
    let tuples = stored.unwrap_or_default();
    let first = tuples
        .first()
        .map(|t| t.value.as_str())
        .filter(|v| !v.is_empty());

    Ok(match ty {
        AttributeType::Checkbox => AttributeInput::Checkbox(first == Some("true")),
        AttributeType::Datetime => AttributeInput::Datetime(first.map(parse_datetime).transpose()?),
        AttributeType::Number => AttributeInput::Number(first.and_then(parse_int)),
        AttributeType::Text | AttributeType::Email | AttributeType::Url => {
            AttributeInput::Text(first.map(str::to_string))
        }
        AttributeType::Select => AttributeInput::Select(first.map(str::to_string)),
        AttributeType::MultiSelect => {
            AttributeInput::MultiSelect(tuples.iter().map(|t| t.value.clone()).collect())
        }
        AttributeType::Relation => AttributeInput::Relation(first.map(str::to_string)),
        AttributeType::Files => AttributeInput::File(first.map(str::to_string)),
        AttributeType::Entity | AttributeType::Option => {
            return Err(CodecError::NotAValueType(ty));
        }
    })
}

/// Parse a human-entered string into a UI value for `ty`.
///
/// An empty string is the type's neutral value. Multi-select ids are
/// comma-separated.
pub fn parse_input(ty: AttributeType, raw: &str) -> Result<AttributeInput, CodecError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return AttributeInput::neutral(ty);
    }
    Ok(match ty {
        AttributeType::Checkbox => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => AttributeInput::Checkbox(true),
            "false" | "no" | "0" | "off" => AttributeInput::Checkbox(false),
            _ => return Err(CodecError::InvalidBoolean(raw.to_string())),
        },
        AttributeType::Datetime => AttributeInput::Datetime(Some(parse_datetime(raw)?)),
        AttributeType::Number => match parse_int(raw) {
            Some(n) => AttributeInput::Number(Some(n)),
            None => return Err(CodecError::InvalidNumber(raw.to_string())),
        },
        AttributeType::Text | AttributeType::Email | AttributeType::Url => {
            AttributeInput::Text(Some(raw.to_string()))
        }
        AttributeType::Select => AttributeInput::Select(Some(raw.to_string())),
        AttributeType::MultiSelect => AttributeInput::MultiSelect(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        AttributeType::Relation => AttributeInput::Relation(Some(raw.to_string())),
        AttributeType::Files => AttributeInput::File(Some(raw.to_string())),
        AttributeType::Entity | AttributeType::Option => {
            return Err(CodecError::NotAValueType(ty));
        }
    })
}

/// Millisecond ISO form, widened to micro or nanoseconds when the value
/// carries them.
fn format_datetime(at: &DateTime<Utc>) -> String {
    let format = if at.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    at.to_rfc3339_opts(format, true)
}

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, CodecError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CodecError::InvalidDatetime(raw.to_string()))
}

/// Leading-integer parse: optional sign then decimal digits, trailing junk
/// ignored. `None` when there are no digits; out-of-range values saturate.
fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let sign_len = trimmed.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }
    let digits = unsigned
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(unsigned.len(), |(idx, _)| idx);
    if digits == 0 {
        return None;
    }
    let number = &trimmed[..sign_len + digits];
    Some(number.parse::<i64>().unwrap_or_else(|_| {
        tracing::warn!(raw, "number out of range, saturating");
        if number.starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn round_trip(ty: AttributeType, input: AttributeInput) {
        let encoded = encode_for(ty, &input).unwrap();
        let stored = match &encoded {
            Encoded::Write(tuples) => Some(tuples.as_slice()),
            Encoded::Delete => None,
        };
        assert_eq!(decode(ty, stored).unwrap(), input, "round trip for {ty}");
    }

    #[test]
    fn round_trips_every_value_type() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let micros = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        let cases = [
            (AttributeType::Checkbox, AttributeInput::Checkbox(true)),
            (AttributeType::Checkbox, AttributeInput::Checkbox(false)),
            (AttributeType::Datetime, AttributeInput::Datetime(Some(at))),
            (AttributeType::Datetime, AttributeInput::Datetime(Some(precise))),
            (AttributeType::Datetime, AttributeInput::Datetime(Some(micros))),
            (AttributeType::Datetime, AttributeInput::Datetime(None)),
            (AttributeType::Number, AttributeInput::Number(Some(-17))),
            (AttributeType::Number, AttributeInput::Number(None)),
            (AttributeType::Text, AttributeInput::Text(Some("hello".into()))),
            (AttributeType::Email, AttributeInput::Text(None)),
            (AttributeType::Url, AttributeInput::Text(Some("https://x.io".into()))),
            (AttributeType::Select, AttributeInput::Select(Some("opt".into()))),
            (AttributeType::Select, AttributeInput::Select(None)),
            (
                AttributeType::MultiSelect,
                AttributeInput::MultiSelect(vec!["a".into(), "b".into()]),
            ),
            (AttributeType::MultiSelect, AttributeInput::MultiSelect(vec![])),
            (AttributeType::Relation, AttributeInput::Relation(Some("cycle-1".into()))),
            (AttributeType::Files, AttributeInput::File(Some("https://cdn/x.jpg".into()))),
            (AttributeType::Files, AttributeInput::File(None)),
        ];
        for (ty, input) in cases {
            round_trip(ty, input);
        }
    }

    #[test]
    fn checkbox_without_value_is_false() {
        assert_eq!(
            decode(AttributeType::Checkbox, None).unwrap(),
            AttributeInput::Checkbox(false)
        );
    }

    #[test]
    fn empty_multi_select_writes_zero_tuples() {
        assert_eq!(
            encode(&AttributeInput::MultiSelect(vec![])),
            Encoded::Write(vec![])
        );
        assert_eq!(
            decode(AttributeType::MultiSelect, Some(&[] as &[PropValue])).unwrap(),
            AttributeInput::MultiSelect(vec![])
        );
    }

    #[test]
    fn empty_scalar_values_delete() {
        assert_eq!(encode(&AttributeInput::Text(Some(String::new()))), Encoded::Delete);
        assert_eq!(encode(&AttributeInput::Select(None)), Encoded::Delete);
        assert_eq!(encode(&AttributeInput::Number(None)), Encoded::Delete);
    }

    #[test]
    fn datetime_encodes_as_iso_with_millis() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            encode(&AttributeInput::Datetime(Some(at))),
            Encoded::Write(vec![PropValue::scalar("2024-01-02T03:04:05.000Z")])
        );
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(
            encode(&AttributeInput::Datetime(Some(precise))),
            Encoded::Write(vec![PropValue::scalar("2023-11-14T22:13:20.123456789Z")])
        );
    }

    #[test]
    fn number_decoding_follows_leading_integer_rules() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  -7px"), Some(-7));
        assert_eq!(parse_int("12.9"), Some(12));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("+-3"), None);
    }

    #[test]
    fn oversized_numbers_saturate_instead_of_failing() {
        let huge = [PropValue::scalar("99999999999999999999")];
        assert_eq!(
            decode(AttributeType::Number, Some(&huge[..])).unwrap(),
            AttributeInput::Number(Some(i64::MAX))
        );
        let tiny = [PropValue::scalar("-99999999999999999999kg")];
        assert_eq!(
            decode(AttributeType::Number, Some(&tiny[..])).unwrap(),
            AttributeInput::Number(Some(i64::MIN))
        );
    }

    #[test]
    fn mismatched_input_is_rejected() {
        let err = encode_for(AttributeType::Number, &AttributeInput::Checkbox(true)).unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                expected: AttributeType::Number,
                input: "checkbox"
            }
        );
        assert_eq!(
            decode(AttributeType::Entity, None).unwrap_err(),
            CodecError::NotAValueType(AttributeType::Entity)
        );
    }

    #[test]
    fn parse_input_handles_human_strings() {
        assert_eq!(
            parse_input(AttributeType::Checkbox, "Yes").unwrap(),
            AttributeInput::Checkbox(true)
        );
        assert_eq!(
            parse_input(AttributeType::MultiSelect, "a, b,,c").unwrap(),
            AttributeInput::MultiSelect(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(
            parse_input(AttributeType::Datetime, "2024-05-01").unwrap(),
            AttributeInput::Datetime(Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()))
        );
        assert_eq!(
            parse_input(AttributeType::Text, "   ").unwrap(),
            AttributeInput::Text(None)
        );
        assert!(parse_input(AttributeType::Number, "many").is_err());
    }

    #[test]
    fn unparseable_datetime_is_an_error() {
        let stored = [PropValue::scalar("yesterday")];
        assert!(matches!(
            decode(AttributeType::Datetime, Some(&stored[..])),
            Err(CodecError::InvalidDatetime(_))
        ));
    }
}
