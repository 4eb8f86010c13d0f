//! Raw JSON -> typed value coercion

use regex_lite::Regex;
use serde_json::Value;

use super::MultiplicityPolicy;
use crate::schema::{FieldSpec, FieldType};
use crate::value::{Bound, TypedValue};

/// Why a raw value could not be bound to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoerceError {
    TypeMismatch,
    Multiplicity,
}

/// Blank form values count as absent: `null`, `""` and `[]`.
pub(crate) fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Bind a raw value to `spec`, resolving type and multiplicity.
pub(crate) fn coerce_field(
    spec: &FieldSpec,
    raw: &Value,
    policy: MultiplicityPolicy,
    wsid_shape: Option<&Regex>,
) -> Result<Bound, CoerceError> {
    let ty = spec.field_type;

    if ty == FieldType::Array {
        return match raw {
            Value::Array(_) => coerce_scalar(ty, raw, wsid_shape)
                .map(Bound::Single)
                .ok_or(CoerceError::TypeMismatch),
            other => {
                let item = item_text(other).ok_or(CoerceError::TypeMismatch)?;
                match policy {
                    MultiplicityPolicy::Wrap => Ok(Bound::Single(TypedValue::Array(vec![item]))),
                    MultiplicityPolicy::Reject => Err(CoerceError::Multiplicity),
                }
            }
        };
    }

    if spec.is_multiple() {
        return match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_scalar(ty, item, wsid_shape))
                .collect::<Option<Vec<_>>>()
                .map(Bound::Multiple)
                .ok_or(CoerceError::TypeMismatch),
            other => {
                let value = coerce_scalar(ty, other, wsid_shape).ok_or(CoerceError::TypeMismatch)?;
                match policy {
                    MultiplicityPolicy::Wrap => Ok(Bound::Multiple(vec![value])),
                    MultiplicityPolicy::Reject => Err(CoerceError::Multiplicity),
                }
            }
        };
    }

    match raw {
        Value::Array(items) if items.len() == 1 => coerce_scalar(ty, &items[0], wsid_shape)
            .map(Bound::Single)
            .ok_or(CoerceError::TypeMismatch),
        Value::Array(_) => Err(CoerceError::Multiplicity),
        other => coerce_scalar(ty, other, wsid_shape)
            .map(Bound::Single)
            .ok_or(CoerceError::TypeMismatch),
    }
}

/// Coerce one raw value to `ty`; `None` if it has the wrong shape.
pub(crate) fn coerce_scalar(
    ty: FieldType,
    raw: &Value,
    wsid_shape: Option<&Regex>,
) -> Option<TypedValue> {
    match ty {
        FieldType::String => item_text(raw).map(TypedValue::String),
        FieldType::Int => coerce_int(raw).map(TypedValue::Int),
        FieldType::Bool => coerce_bool(raw).map(TypedValue::Bool),
        FieldType::Array => match raw {
            Value::Array(items) => items
                .iter()
                .map(item_text)
                .collect::<Option<Vec<_>>>()
                .map(TypedValue::Array),
            _ => None,
        },
        FieldType::Folder => match raw {
            Value::String(s) if is_folder_shape(s) => Some(TypedValue::Folder(s.clone())),
            _ => None,
        },
        FieldType::Wsid => match raw {
            Value::String(s) if is_wsid_shape(s, wsid_shape) => Some(TypedValue::Wsid(s.clone())),
            _ => None,
        },
    }
}

/// Strings pass through; numbers render as their decimal text.
fn item_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            let f = n.as_f64()?;
            // 10.0 is a whole number; 10.5 and 1e30 are not representable
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Some(f as i64)
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn is_folder_shape(s: &str) -> bool {
    !s.trim().is_empty() && !s.chars().any(char::is_control)
}

fn is_wsid_shape(s: &str, pattern: Option<&Regex>) -> bool {
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    pattern.map_or(true, |re| re.is_match(s))
}
