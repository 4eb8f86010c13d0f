//! Validation errors and warnings

use std::fmt;

use serde::Serialize;

use crate::schema::FieldType;

/// A problem that rejects the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("missing required parameter '{field}'")]
    MissingRequired { field: String },

    #[error("parameter '{field}' expects a value of type {expected}")]
    TypeMismatch { field: String, expected: FieldType },

    #[error("parameter '{field}' expects {}", multiplicity_text(.expects_multiple))]
    MultiplicityMismatch { field: String, expects_multiple: bool },

    #[error("parameter '{field}' has value '{value}', allowed: {}", .allowed.join(", "))]
    InvalidChoice {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("{group} '{discriminator_value}' needs exactly one non-empty member, check '{field}'")]
    ConditionalRequirement {
        group: String,
        discriminator_value: String,
        field: String,
    },

    #[error("unknown parameter '{field}'")]
    UnknownField { field: String },
}

fn multiplicity_text(expects_multiple: &bool) -> &'static str {
    if *expects_multiple {
        "a list of values"
    } else {
        "a single value"
    }
}

impl ValidationError {
    /// The parameter the error is about
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingRequired { field }
            | ValidationError::TypeMismatch { field, .. }
            | ValidationError::MultiplicityMismatch { field, .. }
            | ValidationError::InvalidChoice { field, .. }
            | ValidationError::ConditionalRequirement { field, .. }
            | ValidationError::UnknownField { field } => field,
        }
    }
}

/// A non-blocking condition reported alongside a successful validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Key not declared by the schema; ignored
    UnknownKey { field: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::UnknownKey { field } => {
                write!(f, "ignoring unknown parameter '{}'", field)
            }
        }
    }
}

/// Every error found in one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s): ", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
