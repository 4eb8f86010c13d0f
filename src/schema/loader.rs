//! Schema document parsing
//!
//! Turns the JSON schema document into a checked [`SchemaModel`]. Keys the
//! loader does not use are ignored, so documents written for other tooling
//! load unchanged.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::model::{FieldSpec, FieldType, SchemaMeta, SchemaModel, UnknownFieldType};
use super::rules::ConditionalRule;
use crate::validate::{coerce_field, is_blank, MultiplicityPolicy};

/// Errors raised while loading a schema document
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cannot read schema document: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("schema declares a parameter with an empty id")]
    EmptyFieldId,

    #[error("schema declares parameter '{0}' more than once")]
    DuplicateField(String),

    #[error("parameter '{field}' has unknown type '{type_name}'")]
    UnknownType { field: String, type_name: String },

    #[error("default of parameter '{field}' is not a valid {expected}")]
    BadDefault { field: String, expected: FieldType },

    #[error("conditional rule '{rule}' is malformed: {reason}")]
    BadRule { rule: String, reason: String },
}

/// Top-level document shape
#[derive(Debug, Deserialize)]
struct SchemaDocument {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default_memory: Option<String>,
    #[serde(default)]
    script: Option<String>,
    #[serde(default)]
    parameters: Vec<FieldDocument>,
    #[serde(default)]
    conditional_requirements: Vec<RuleDocument>,
}

#[derive(Debug, Deserialize)]
struct FieldDocument {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    required: Flag,
    #[serde(default)]
    allow_multiple: Flag,
    #[serde(default)]
    default: Value,
    #[serde(default, rename = "enum")]
    allowed: Option<Vec<String>>,
    #[serde(default, alias = "desc")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    id: String,
    discriminator: String,
    #[serde(default)]
    cases: IndexMap<String, String>,
}

/// Boolean flags appear as `true`, `1` or `"1"` depending on the author
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
    #[default]
    Unset,
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(n) => *n != 0,
            Flag::Text(s) => matches!(s.trim(), "1" | "true" | "yes"),
            Flag::Unset => false,
        }
    }
}

/// Parse a schema document from JSON text.
pub fn load(text: &str) -> Result<SchemaModel, SchemaError> {
    let doc: SchemaDocument = serde_json::from_str(text)?;
    build(doc)
}

/// Build a schema from an already-parsed JSON value.
pub fn load_value(value: Value) -> Result<SchemaModel, SchemaError> {
    let doc: SchemaDocument = serde_json::from_value(value)?;
    build(doc)
}

/// Read and parse a schema document from disk.
pub fn load_file(path: &Path) -> Result<SchemaModel, SchemaError> {
    let text = fs::read_to_string(path)?;
    let model = load(&text)?;
    log::info!(
        "loaded schema '{}' ({} parameters) from {}",
        model.id(),
        model.len(),
        path.display()
    );
    Ok(model)
}

fn build(doc: SchemaDocument) -> Result<SchemaModel, SchemaError> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(doc.parameters.len());

    for field in doc.parameters {
        let id = field.id.trim().to_string();
        if id.is_empty() {
            return Err(SchemaError::EmptyFieldId);
        }
        if !seen.insert(id.clone()) {
            return Err(SchemaError::DuplicateField(id));
        }
        fields.push(build_field(id, field)?);
    }

    let meta = SchemaMeta {
        id: doc.id,
        label: doc.label,
        description: doc.description,
        default_memory: doc.default_memory,
        script: doc.script,
    };

    let rules = doc
        .conditional_requirements
        .into_iter()
        .map(|rule| ConditionalRule {
            id: rule.id,
            discriminator: rule.discriminator,
            cases: rule.cases,
        })
        .collect::<Vec<_>>();
    check_rules(&fields, &rules)?;

    Ok(SchemaModel::from_parts(meta, fields, rules))
}

fn build_field(id: String, doc: FieldDocument) -> Result<FieldSpec, SchemaError> {
    let field_type: FieldType =
        doc.type_name
            .parse()
            .map_err(|UnknownFieldType(type_name)| SchemaError::UnknownType {
                field: id.clone(),
                type_name,
            })?;

    let mut spec = FieldSpec {
        id,
        label: doc.label,
        field_type,
        required: doc.required.is_set(),
        allow_multiple: doc.allow_multiple.is_set(),
        default: None,
        allowed: doc.allowed.filter(|values| !values.is_empty()),
        description: doc.description,
    };

    if !is_blank(&doc.default) {
        let bad_default = || SchemaError::BadDefault {
            field: spec.id.clone(),
            expected: field_type,
        };
        let bound = coerce_field(&spec, &doc.default, MultiplicityPolicy::Wrap, None)
            .map_err(|_| bad_default())?;
        if spec.allowed.is_some()
            && bound
                .values()
                .iter()
                .filter_map(|v| v.as_str())
                .any(|text| !spec.allows(text))
        {
            return Err(bad_default());
        }
        spec.default = Some(bound);
    }

    Ok(spec)
}

fn check_rules(fields: &[FieldSpec], rules: &[ConditionalRule]) -> Result<(), SchemaError> {
    let field = |id: &str| fields.iter().find(|f| f.id == id);
    let mut ids = HashSet::new();

    for rule in rules {
        let bad = |reason: String| SchemaError::BadRule {
            rule: rule.id.clone(),
            reason,
        };

        if !ids.insert(rule.id.as_str()) {
            return Err(bad("duplicate rule id".to_string()));
        }
        if rule.cases.is_empty() {
            return Err(bad("no cases declared".to_string()));
        }
        let discriminator = field(&rule.discriminator).ok_or_else(|| {
            bad(format!("discriminator '{}' is not a declared parameter", rule.discriminator))
        })?;
        let text_like = matches!(
            discriminator.field_type,
            FieldType::String | FieldType::Wsid | FieldType::Folder
        );
        if !text_like || discriminator.is_multiple() {
            return Err(bad(format!(
                "discriminator '{}' must be a single-valued string, wsid or folder",
                rule.discriminator
            )));
        }

        for (case, target) in &rule.cases {
            if field(target).is_none() {
                return Err(bad(format!("target '{target}' is not a declared parameter")));
            }
            if target == &rule.discriminator {
                return Err(bad(format!("target '{target}' is the discriminator itself")));
            }
            if discriminator.allowed.is_some() && !discriminator.allows(case) {
                return Err(bad(format!(
                    "case '{case}' is not an allowed value of '{}'",
                    rule.discriminator
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Bound, TypedValue};
    use serde_json::json;

    #[test]
    fn test_docking_schema_loads() {
        let schema = crate::schema::docking_schema().unwrap();
        assert_eq!(schema.id(), "Docking");
        assert_eq!(schema.default_memory(), Some("64G"));
        assert_eq!(schema.len(), 11);

        let input = schema.field("input_pdb").unwrap();
        assert!(input.required);
        assert!(input.allow_multiple);

        let batch = schema.field("batch_size").unwrap();
        assert_eq!(batch.default, Some(Bound::Single(TypedValue::Int(10))));
        assert!(schema.field("top_n").unwrap().default.is_none());

        assert_eq!(schema.rules().len(), 1);
        assert_eq!(schema.rules()[0].required_for("ws_file"), Some("ligand_ws_file"));
    }

    #[test]
    fn test_flags_accept_several_spellings() {
        let schema = load_value(json!({"id": "S", "parameters": [
            {"id": "a", "type": "string", "required": true},
            {"id": "b", "type": "string", "required": "1"},
            {"id": "c", "type": "string", "required": 0},
            {"id": "d", "type": "string"}
        ]}))
        .unwrap();

        let required: Vec<bool> = schema.fields().iter().map(|f| f.required).collect();
        assert_eq!(required, vec![true, true, false, false]);
    }

    #[test]
    fn test_extra_keys_ignored() {
        let schema = load_value(json!({
            "id": "S",
            "ui_hints": {"tabs": 2},
            "parameters": [{"id": "a", "type": "int", "widget": "spinner"}]
        }))
        .unwrap();
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = load_value(json!({"id": "S", "parameters": [
            {"id": "a", "type": "int"},
            {"id": "a", "type": "string"}
        ]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField(id) if id == "a"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = load_value(json!({"id": "S", "parameters": [
            {"id": "a", "type": "float"}
        ]}))
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownType { field, type_name } if field == "a" && type_name == "float"
        ));
    }

    #[test]
    fn test_bad_default_rejected() {
        let err = load_value(json!({"id": "S", "parameters": [
            {"id": "n", "type": "int", "default": "ten"}
        ]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::BadDefault { field, .. } if field == "n"));

        let err = load_value(json!({"id": "S", "parameters": [
            {"id": "mode", "type": "string", "enum": ["a", "b"], "default": "c"}
        ]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::BadDefault { field, .. } if field == "mode"));
    }

    #[test]
    fn test_rule_with_missing_target_rejected() {
        let err = load_value(json!({
            "id": "S",
            "parameters": [{"id": "kind", "type": "string", "enum": ["x"]}],
            "conditional_requirements": [
                {"id": "g", "discriminator": "kind", "cases": {"x": "x_value"}}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::BadRule { rule, .. } if rule == "g"));
    }

    #[test]
    fn test_rule_case_outside_enum_rejected() {
        let err = load_value(json!({
            "id": "S",
            "parameters": [
                {"id": "kind", "type": "string", "enum": ["x"]},
                {"id": "y_value", "type": "string"}
            ],
            "conditional_requirements": [
                {"id": "g", "discriminator": "kind", "cases": {"y": "y_value"}}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::BadRule { .. }));
    }

    #[test]
    fn test_rule_discriminator_must_be_single_text() {
        for discriminator in [
            json!({"id": "mode", "type": "int"}),
            json!({"id": "mode", "type": "bool"}),
            json!({"id": "mode", "type": "array"}),
            json!({"id": "mode", "type": "string", "allow_multiple": 1}),
        ] {
            let err = load_value(json!({
                "id": "S",
                "parameters": [discriminator, {"id": "x", "type": "string"}],
                "conditional_requirements": [
                    {"id": "g", "discriminator": "mode", "cases": {"1": "x"}}
                ]
            }))
            .unwrap_err();
            assert!(
                matches!(&err, SchemaError::BadRule { rule, reason } if rule == "g" && reason.contains("single-valued")),
                "{err}"
            );
        }

        let schema = load_value(json!({
            "id": "S",
            "parameters": [{"id": "mode", "type": "wsid"}, {"id": "x", "type": "string"}],
            "conditional_requirements": [
                {"id": "g", "discriminator": "mode", "cases": {"ws1": "x"}}
            ]
        }))
        .unwrap();
        assert_eq!(schema.rules().len(), 1);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(load("{not json"), Err(SchemaError::Parse(_))));
    }
}
