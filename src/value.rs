//! Typed parameter values
//!
//! A [`ParameterValue`] is a caller value after coercion: a [`TypedValue`]
//! (or a sequence of them) tagged with where it came from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::FieldType;

/// A single coerced value, tagged by field type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    String(String),
    Int(i64),
    Bool(bool),
    Array(Vec<String>),
    Folder(String),
    Wsid(String),
}

impl TypedValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            TypedValue::String(_) => FieldType::String,
            TypedValue::Int(_) => FieldType::Int,
            TypedValue::Bool(_) => FieldType::Bool,
            TypedValue::Array(_) => FieldType::Array,
            TypedValue::Folder(_) => FieldType::Folder,
            TypedValue::Wsid(_) => FieldType::Wsid,
        }
    }

    /// Text content for string-like values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) | TypedValue::Folder(s) | TypedValue::Wsid(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TypedValue::String(s) | TypedValue::Folder(s) | TypedValue::Wsid(s) => s.is_empty(),
            TypedValue::Array(items) => items.iter().all(String::is_empty),
            TypedValue::Int(_) | TypedValue::Bool(_) => false,
        }
    }

    /// Plain JSON rendering, without the type tag
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::String(s) | TypedValue::Folder(s) | TypedValue::Wsid(s) => {
                Value::String(s.clone())
            }
            TypedValue::Int(n) => Value::from(*n),
            TypedValue::Bool(b) => Value::Bool(*b),
            TypedValue::Array(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Scalar or sequence binding of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Single(TypedValue),
    Multiple(Vec<TypedValue>),
}

impl Bound {
    pub fn is_empty(&self) -> bool {
        match self {
            Bound::Single(v) => v.is_empty(),
            Bound::Multiple(vs) => vs.is_empty() || vs.iter().all(TypedValue::is_empty),
        }
    }

    /// Text of a single string-like value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bound::Single(v) => v.as_str(),
            Bound::Multiple(_) => None,
        }
    }

    /// Every value in the binding, in order
    pub fn values(&self) -> &[TypedValue] {
        match self {
            Bound::Single(v) => std::slice::from_ref(v),
            Bound::Multiple(vs) => vs,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Bound::Single(v) => v.to_json(),
            Bound::Multiple(vs) => Value::Array(vs.iter().map(TypedValue::to_json).collect()),
        }
    }
}

/// Where a normalized value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Present in the caller's input
    Supplied,
    /// Filled in from the schema default
    Defaulted,
}

/// A validated value bound to one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub value: Bound,
    pub provenance: Provenance,
}

impl ParameterValue {
    pub fn supplied(value: Bound) -> Self {
        Self {
            value,
            provenance: Provenance::Supplied,
        }
    }

    pub fn defaulted(value: Bound) -> Self {
        Self {
            value,
            provenance: Provenance::Defaulted,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.provenance == Provenance::Defaulted
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn to_json(&self) -> Value {
        self.value.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_value_wire_shape() {
        let v = TypedValue::Int(10);
        assert_eq!(serde_json::to_value(&v).unwrap(), json!({"type": "int", "value": 10}));

        let v: TypedValue = serde_json::from_value(json!({"type": "wsid", "value": "ws123"})).unwrap();
        assert_eq!(v, TypedValue::Wsid("ws123".to_string()));
        assert_eq!(v.field_type(), FieldType::Wsid);
    }

    #[test]
    fn test_single_array_is_distinct_from_multiple() {
        let single = Bound::Single(TypedValue::Array(vec!["CCO".to_string()]));
        let multiple = Bound::Multiple(vec![TypedValue::String("CCO".to_string())]);

        // Same plain JSON, different typed encoding
        assert_eq!(single.to_json(), multiple.to_json());
        let single_back: Bound =
            serde_json::from_value(serde_json::to_value(&single).unwrap()).unwrap();
        assert_eq!(single_back, single);
        assert_ne!(single_back, multiple);
    }

    #[test]
    fn test_emptiness() {
        assert!(Bound::Single(TypedValue::String(String::new())).is_empty());
        assert!(Bound::Multiple(vec![]).is_empty());
        assert!(Bound::Multiple(vec![TypedValue::String(String::new())]).is_empty());
        assert!(Bound::Single(TypedValue::Array(vec![String::new(), String::new()])).is_empty());
        assert!(!Bound::Single(TypedValue::Array(vec![String::new(), "CCO".to_string()])).is_empty());
        assert!(!Bound::Single(TypedValue::Bool(false)).is_empty());
        assert!(!Bound::Single(TypedValue::Int(0)).is_empty());
    }

    #[test]
    fn test_provenance() {
        let v = ParameterValue::defaulted(Bound::Single(TypedValue::Int(10)));
        assert!(v.is_defaulted());
        assert_eq!(v.to_json(), json!(10));
        assert_eq!(
            serde_json::to_value(&v).unwrap()["provenance"],
            json!("defaulted")
        );
    }
}
