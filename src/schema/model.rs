//! In-memory schema model

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::rules::ConditionalRule;
use crate::value::Bound;

/// Closed set of parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text
    String,
    /// Whole number
    Int,
    /// true / false
    Bool,
    /// Ordered list of strings
    Array,
    /// Workspace folder path
    Folder,
    /// Workspace object identifier
    Wsid,
}

impl FieldType {
    /// Wire name of the type, as written in schema documents
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Array => "array",
            FieldType::Folder => "folder",
            FieldType::Wsid => "wsid",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a type name outside the closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field type '{0}'")]
pub struct UnknownFieldType(pub String);

impl FromStr for FieldType {
    type Err = UnknownFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "int" => Ok(FieldType::Int),
            "bool" => Ok(FieldType::Bool),
            "array" => Ok(FieldType::Array),
            "folder" => Ok(FieldType::Folder),
            "wsid" => Ok(FieldType::Wsid),
            other => Err(UnknownFieldType(other.to_string())),
        }
    }
}

/// One parameter definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Unique key within the schema
    pub id: String,
    /// Display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Unconditionally required
    pub required: bool,
    /// Accepts a sequence of the base type
    pub allow_multiple: bool,
    /// Default, already coerced to the field's type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Bound>,
    /// Allowed values for string fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// Internal fields are filled in by the platform rather than by users.
    pub fn is_internal(&self) -> bool {
        self.id.starts_with('_')
    }

    /// Whether the normalized value is a sequence of the base type.
    ///
    /// `array` fields are already list-valued, so `allow_multiple` does not
    /// nest them further.
    pub fn is_multiple(&self) -> bool {
        self.allow_multiple && self.field_type != FieldType::Array
    }

    /// Check a string value against the `enum` list, if one is declared.
    pub fn allows(&self, value: &str) -> bool {
        match &self.allowed {
            Some(allowed) => allowed.iter().any(|a| a == value),
            None => true,
        }
    }
}

/// Descriptive metadata carried at the top of a schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaMeta {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub default_memory: Option<String>,
    pub script: Option<String>,
}

/// Immutable, fully-checked parameter schema
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaModel {
    meta: SchemaMeta,
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
    rules: Vec<ConditionalRule>,
}

impl SchemaModel {
    /// Assemble a model from parts the loader has already checked.
    pub(crate) fn from_parts(
        meta: SchemaMeta,
        fields: Vec<FieldSpec>,
        rules: Vec<ConditionalRule>,
    ) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.clone(), i))
            .collect();
        Self {
            meta,
            fields,
            index,
            rules,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn label(&self) -> Option<&str> {
        self.meta.label.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    /// Memory hint forwarded to the backend with each job
    pub fn default_memory(&self) -> Option<&str> {
        self.meta.default_memory.as_deref()
    }

    pub fn script(&self) -> Option<&str> {
        self.meta.script.as_deref()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.index.get(id).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Conditional-requirement rule table
    pub fn rules(&self) -> &[ConditionalRule] {
        &self.rules
    }
}
