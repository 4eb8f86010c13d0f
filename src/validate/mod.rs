//! Parameter validation
//!
//! Validates an untrusted raw parameter set against a [`SchemaModel`]:
//! defaults are applied, values are coerced to their declared types,
//! multiplicity is resolved, and conditional-requirement rules are checked.
//!
//! Validation is exhaustive. Every field is visited and every problem is
//! collected, so a caller sees the whole list in one round trip.

mod coerce;
mod errors;

use indexmap::IndexMap;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{FieldSpec, FieldType, SchemaModel};
use crate::value::{Bound, ParameterValue};

pub(crate) use coerce::{coerce_field, is_blank, CoerceError};
pub use errors::{ValidationError, ValidationErrors, ValidationWarning};

/// Raw caller input: field id -> untyped JSON value
pub type RawParameters = Map<String, Value>;

/// What to do with keys the schema does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeyPolicy {
    /// Report as warnings and drop (default)
    #[default]
    Warn,
    /// Report as `UnknownField` errors (strict mode)
    Reject,
}

/// What to do with a scalar given to an `allow_multiple` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiplicityPolicy {
    /// Wrap into a one-element sequence (default)
    #[default]
    Wrap,
    /// Report `MultiplicityMismatch`
    Reject,
}

/// Validator settings
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    pub unknown_keys: UnknownKeyPolicy,
    pub multiplicity: MultiplicityPolicy,
    /// Extra pattern `wsid` values must match, on top of the built-in shape
    pub wsid_pattern: Option<Regex>,
}

impl ValidationOptions {
    /// Strict mode: unknown keys are errors
    pub fn strict() -> Self {
        Self {
            unknown_keys: UnknownKeyPolicy::Reject,
            ..Self::default()
        }
    }

    pub fn with_multiplicity(mut self, policy: MultiplicityPolicy) -> Self {
        self.multiplicity = policy;
        self
    }

    pub fn with_unknown_keys(mut self, policy: UnknownKeyPolicy) -> Self {
        self.unknown_keys = policy;
        self
    }

    pub fn with_wsid_pattern(mut self, pattern: Regex) -> Self {
        self.wsid_pattern = Some(pattern);
        self
    }
}

/// Caller input after defaulting, coercion and multiplicity resolution
///
/// Holds one entry per schema field in declaration order; `None` marks an
/// optional field that was neither supplied nor defaulted, or a field whose
/// value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedParameters {
    schema_id: String,
    values: IndexMap<String, Option<ParameterValue>>,
}

impl NormalizedParameters {
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// Value for a field, if it has one
    pub fn get(&self, id: &str) -> Option<&ParameterValue> {
        self.values.get(id).and_then(Option::as_ref)
    }

    /// Whether the field has a non-empty value
    pub fn is_present(&self, id: &str) -> bool {
        self.get(id).is_some_and(|v| !v.value.is_empty())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&ParameterValue>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Supplied values as plain JSON.
    ///
    /// Defaulted values are left out so that validating the result again
    /// re-applies them with the same provenance.
    pub fn to_raw(&self) -> RawParameters {
        self.values
            .iter()
            .filter_map(|(k, v)| {
                v.as_ref()
                    .filter(|pv| !pv.is_defaulted())
                    .map(|pv| (k.clone(), pv.to_json()))
            })
            .collect()
    }

    /// Every field as plain JSON, `null` for absent ones
    pub fn to_plain(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.as_ref().map_or(Value::Null, ParameterValue::to_json)))
            .collect()
    }
}

/// Outcome of one validation pass
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Normalized values; partial when `errors` is non-empty
    pub normalized: NormalizedParameters,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A parameter set that passed validation
#[derive(Debug, Clone)]
pub struct Validated {
    pub parameters: NormalizedParameters,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<Validated, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(Validated {
                parameters: self.normalized,
                warnings: self.warnings,
            })
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

/// Schema-driven validator
#[derive(Debug, Clone, Default)]
pub struct ParameterValidator {
    options: ValidationOptions,
}

impl ParameterValidator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validate `raw` against `schema`.
    pub fn validate(&self, schema: &SchemaModel, raw: &RawParameters) -> ValidationReport {
        let mut values = IndexMap::with_capacity(schema.len());
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for field in schema.fields() {
            let entry = match self.bind_field(field, raw.get(&field.id)) {
                Ok(value) => value,
                Err(err) => {
                    errors.push(err);
                    None
                }
            };
            values.insert(field.id.clone(), entry);
        }

        let normalized = NormalizedParameters {
            schema_id: schema.id().to_string(),
            values,
        };

        self.check_rules(schema, &normalized, &mut errors);

        for key in raw.keys().filter(|k| !schema.contains(k)) {
            match self.options.unknown_keys {
                UnknownKeyPolicy::Warn => {
                    warnings.push(ValidationWarning::UnknownKey { field: key.clone() })
                }
                UnknownKeyPolicy::Reject => {
                    errors.push(ValidationError::UnknownField { field: key.clone() })
                }
            }
        }

        log::debug!(
            "validated {} parameter(s) against schema '{}': {} error(s), {} warning(s)",
            raw.len(),
            schema.id(),
            errors.len(),
            warnings.len()
        );

        ValidationReport {
            normalized,
            errors,
            warnings,
        }
    }

    /// Resolve one field: default, requiredness, coercion, allowed values.
    fn bind_field(
        &self,
        field: &FieldSpec,
        raw: Option<&Value>,
    ) -> Result<Option<ParameterValue>, ValidationError> {
        let bound = match raw.filter(|v| !coerce::is_blank(v)) {
            Some(raw) => Some(self.coerce(field, raw)?),
            None => None,
        };

        // `[""]` is as blank as `""`
        match bound.filter(|b| !b.is_empty()) {
            Some(bound) => {
                check_allowed(field, &bound)?;
                Ok(Some(ParameterValue::supplied(bound)))
            }
            None => match &field.default {
                Some(default) => Ok(Some(ParameterValue::defaulted(default.clone()))),
                None if field.required => Err(ValidationError::MissingRequired {
                    field: field.id.clone(),
                }),
                None => Ok(None),
            },
        }
    }

    fn coerce(&self, field: &FieldSpec, raw: &Value) -> Result<Bound, ValidationError> {
        coerce_field(
            field,
            raw,
            self.options.multiplicity,
            self.options.wsid_pattern.as_ref(),
        )
        .map_err(|err| match err {
            CoerceError::TypeMismatch => ValidationError::TypeMismatch {
                field: field.id.clone(),
                expected: field.field_type,
            },
            CoerceError::Multiplicity => ValidationError::MultiplicityMismatch {
                field: field.id.clone(),
                expects_multiple: field.is_multiple() || field.field_type == FieldType::Array,
            },
        })
    }

    /// Exactly one member of each group may be set: the one the
    /// discriminator selects.
    fn check_rules(
        &self,
        schema: &SchemaModel,
        normalized: &NormalizedParameters,
        errors: &mut Vec<ValidationError>,
    ) {
        for rule in schema.rules() {
            let Some(selector) = normalized.get(&rule.discriminator).and_then(|v| v.as_str())
            else {
                continue;
            };
            let Some(required) = rule.required_for(selector) else {
                continue;
            };
            let violation = |field: &str| ValidationError::ConditionalRequirement {
                group: rule.id.clone(),
                discriminator_value: selector.to_string(),
                field: field.to_string(),
            };

            // A member that already failed coercion has its own error
            let already_reported = errors.iter().any(|e| e.field() == required);
            if !normalized.is_present(required) && !already_reported {
                errors.push(violation(required));
            }

            // Schema defaults on other members are not the caller's choice
            for member in rule.members().filter(|m| *m != required) {
                if normalized.get(member).is_some_and(|v| !v.is_defaulted() && !v.value.is_empty()) {
                    errors.push(violation(member));
                }
            }
        }
    }
}

fn check_allowed(field: &FieldSpec, bound: &Bound) -> Result<(), ValidationError> {
    let Some(allowed) = &field.allowed else {
        return Ok(());
    };
    for value in bound.values() {
        if let Some(text) = value.as_str() {
            if !field.allows(text) {
                return Err(ValidationError::InvalidChoice {
                    field: field.id.clone(),
                    value: text.to_string(),
                    allowed: allowed.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Validate with default options.
pub fn validate(schema: &SchemaModel, raw: &RawParameters) -> ValidationReport {
    ParameterValidator::default().validate(schema, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{docking_schema, load};
    use crate::value::{Provenance, TypedValue};
    use serde_json::json;

    fn raw(value: Value) -> RawParameters {
        match value {
            Value::Object(map) => map,
            _ => panic!("test input must be an object"),
        }
    }

    fn valid_docking_input() -> RawParameters {
        raw(json!({
            "input_pdb": ["1ABC"],
            "ligand_library_type": "smiles_list",
            "ligand_smiles_list": ["CCO"],
            "output_path": "/out",
            "output_file": "run1"
        }))
    }

    #[test]
    fn test_defaults_applied_to_empty_input() {
        let schema = load(r#"{"id": "S", "parameters": [
            {"id": "batch_size", "type": "int", "required": 0, "default": 10}
        ]}"#)
        .unwrap();

        let report = validate(&schema, &RawParameters::new());
        assert!(report.is_valid());
        let value = report.normalized.get("batch_size").unwrap();
        assert_eq!(value.provenance, Provenance::Defaulted);
        assert_eq!(value.value, Bound::Single(TypedValue::Int(10)));
    }

    #[test]
    fn test_all_errors_collected() {
        let schema = docking_schema().unwrap();
        let report = validate(&schema, &raw(json!({"top_n": "many", "batch_size": 5})));

        let fields: Vec<&str> = report.errors.iter().map(|e| e.field()).collect();
        assert!(fields.contains(&"input_pdb"));
        assert!(fields.contains(&"ligand_library_type"));
        assert!(fields.contains(&"output_path"));
        assert!(fields.contains(&"output_file"));
        assert!(fields.contains(&"top_n"));

        // Valid fields are still normalized
        assert_eq!(
            report.normalized.get("batch_size").unwrap().to_json(),
            json!(5)
        );
    }

    #[test]
    fn test_invalid_choice() {
        let schema = docking_schema().unwrap();
        let mut input = valid_docking_input();
        input.insert("ligand_library_type".to_string(), json!("pubchem"));

        let report = validate(&schema, &input);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            &report.errors[0],
            ValidationError::InvalidChoice { field, value, .. }
                if field == "ligand_library_type" && value == "pubchem"
        ));
    }

    #[test]
    fn test_conditional_target_with_bad_type_reports_once() {
        let schema = docking_schema().unwrap();
        let mut input = valid_docking_input();
        input.insert("ligand_library_type".to_string(), json!("ws_file"));
        input.insert("ligand_ws_file".to_string(), json!("has space"));

        let report = validate(&schema, &input);
        let for_target: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.field() == "ligand_ws_file")
            .collect();
        assert_eq!(for_target.len(), 1);
        assert!(matches!(for_target[0], ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_non_selected_member_is_rejected() {
        let schema = docking_schema().unwrap();
        let mut input = valid_docking_input();
        input.insert("ligand_named_library".to_string(), json!("fda_approved"));

        let report = validate(&schema, &input);
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.errors,
            vec![ValidationError::ConditionalRequirement {
                group: "ligand_source".to_string(),
                discriminator_value: "smiles_list".to_string(),
                field: "ligand_named_library".to_string(),
            }]
        );
    }

    #[test]
    fn test_blank_list_items_are_absent() {
        let schema = docking_schema().unwrap();
        let mut input = valid_docking_input();
        input.insert("input_pdb".to_string(), json!([""]));
        input.insert("ligand_smiles_list".to_string(), json!(["", ""]));

        let report = validate(&schema, &input);
        assert_eq!(
            report.errors,
            vec![
                ValidationError::MissingRequired { field: "input_pdb".to_string() },
                ValidationError::ConditionalRequirement {
                    group: "ligand_source".to_string(),
                    discriminator_value: "smiles_list".to_string(),
                    field: "ligand_smiles_list".to_string(),
                },
            ]
        );
        assert!(report.normalized.get("input_pdb").is_none());
        assert!(report.normalized.get("ligand_smiles_list").is_none());
    }

    #[test]
    fn test_blank_list_falls_back_to_default() {
        let schema = load(r#"{"id": "S", "parameters": [
            {"id": "tags", "type": "string", "allow_multiple": 1, "default": "all"}
        ]}"#)
        .unwrap();

        let report = validate(&schema, &raw(json!({"tags": [""]})));
        assert!(report.is_valid());
        assert!(report.normalized.get("tags").unwrap().is_defaulted());
    }

    #[test]
    fn test_unknown_keys_warn_or_reject() {
        let schema = docking_schema().unwrap();
        let mut input = valid_docking_input();
        input.insert("gpu_count".to_string(), json!(2));

        let lenient = validate(&schema, &input);
        assert!(lenient.is_valid());
        assert_eq!(
            lenient.warnings,
            vec![ValidationWarning::UnknownKey { field: "gpu_count".to_string() }]
        );
        assert!(!lenient.normalized.to_plain().contains_key("gpu_count"));

        let strict = ParameterValidator::new(ValidationOptions::strict()).validate(&schema, &input);
        assert_eq!(
            strict.errors,
            vec![ValidationError::UnknownField { field: "gpu_count".to_string() }]
        );
    }

    #[test]
    fn test_blank_string_is_absent() {
        let schema = docking_schema().unwrap();
        let mut input = valid_docking_input();
        input.insert("ligand_ws_file".to_string(), json!(""));
        input.insert("top_n".to_string(), Value::Null);

        let report = validate(&schema, &input);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.normalized.get("ligand_ws_file").is_none());
        assert!(report.normalized.get("top_n").is_none());
    }

    #[test]
    fn test_to_raw_skips_defaults() {
        let schema = docking_schema().unwrap();
        let report = validate(&schema, &valid_docking_input());
        let again = report.normalized.to_raw();

        assert!(!again.contains_key("batch_size"));
        assert_eq!(again["input_pdb"], json!(["1ABC"]));
        assert_eq!(report.normalized.to_plain()["batch_size"], json!(10));
        assert_eq!(report.normalized.to_plain()["top_n"], Value::Null);
    }
}
