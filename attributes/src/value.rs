//! Wire representation of attribute values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One scalar of a wire-encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropValue {
    /// Tuple kind tag. Values written by this crate use [`PropValue::SCALAR`].
    #[serde(rename = "type", default)]
    pub kind: i64,
    pub value: String,
}

impl PropValue {
    pub const SCALAR: i64 = 0;

    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            kind: Self::SCALAR,
            value: value.into(),
        }
    }
}

/// All tuples stored for one attribute on one record.
///
/// `id` is the id of the [`AttributeDefinition`](crate::AttributeDefinition)
/// this value instantiates. Zero tuples means unset, one is a scalar, more
/// than one is multi-valued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub id: String,
    #[serde(default)]
    pub prop_value: Vec<PropValue>,
}

impl AttributeValue {
    pub fn new(id: impl Into<String>, prop_value: Vec<PropValue>) -> Self {
        Self {
            id: id.into(),
            prop_value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prop_value.is_empty()
    }
}

/// Upsert body: attribute id to its full replacement tuples.
pub type ValuesPayload = BTreeMap<String, Vec<PropValue>>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn prop_value_uses_type_key() {
        assert_eq!(
            serde_json::to_value(PropValue::scalar("42")).unwrap(),
            json!({"type": 0, "value": "42"})
        );
        let parsed: PropValue = serde_json::from_value(json!({"value": "x"})).unwrap();
        assert_eq!(parsed.kind, PropValue::SCALAR);
    }

    #[test]
    fn attribute_value_defaults_to_empty() {
        let value: AttributeValue = serde_json::from_value(json!({"id": "a"})).unwrap();
        assert!(value.is_empty());
    }
}
