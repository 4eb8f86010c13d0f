//! Schema document loading

mod fixtures;

use docking_submit::schema::{docking_schema, load, load_file, load_value, DOCKING_SCHEMA};
use docking_submit::{FieldType, SchemaError};
use fixtures::schema_path;
use serde_json::json;

// =============================================================================
// Built-in docking schema
// =============================================================================

#[test]
fn test_docking_schema_fields_in_order() {
    let schema = docking_schema().unwrap();
    let ids: Vec<&str> = schema.fields().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "input_pdb",
            "ligand_library_type",
            "ligand_named_library",
            "ligand_smiles_list",
            "ligand_ws_file",
            "top_n",
            "batch_size",
            "enable_debug",
            "output_path",
            "output_file",
            "_tmpdir",
        ]
    );
    assert_eq!(schema.id(), "Docking");
    assert_eq!(schema.default_memory(), Some("64G"));
}

#[test]
fn test_docking_schema_field_details() {
    let schema = docking_schema().unwrap();

    let pdb = schema.field("input_pdb").unwrap();
    assert!(pdb.required);
    assert!(pdb.is_multiple());
    assert_eq!(pdb.field_type, FieldType::String);

    let library = schema.field("ligand_library_type").unwrap();
    assert!(library.allows("smiles_list"));
    assert!(!library.allows("sdf"));

    assert_eq!(schema.field("ligand_ws_file").unwrap().field_type, FieldType::Wsid);
    assert_eq!(schema.field("output_path").unwrap().field_type, FieldType::Folder);
    assert!(schema.field("_tmpdir").unwrap().is_internal());
    assert!(!schema.field("batch_size").unwrap().required);
    assert_eq!(
        schema.field("batch_size").unwrap().default.as_ref().map(|d| d.to_json()),
        Some(json!(10))
    );
}

#[test]
fn test_docking_schema_ligand_rule() {
    let schema = docking_schema().unwrap();
    assert_eq!(schema.rules().len(), 1);

    let rule = &schema.rules()[0];
    assert_eq!(rule.discriminator, "ligand_library_type");
    assert_eq!(rule.required_for("ws_file"), Some("ligand_ws_file"));
    assert_eq!(rule.required_for("named_library"), Some("ligand_named_library"));
    assert_eq!(rule.required_for("smiles_list"), Some("ligand_smiles_list"));
    assert_eq!(rule.required_for("pdbqt"), None);
}

#[test]
fn test_loading_is_deterministic() {
    let a = load(DOCKING_SCHEMA).unwrap();
    let b = load(DOCKING_SCHEMA).unwrap();
    assert_eq!(a, b);
}

// =============================================================================
// Schema files
// =============================================================================

#[test]
fn test_load_minimal_file() {
    let schema = load_file(&schema_path("minimal.json")).unwrap();
    assert_eq!(schema.id(), "Minimal");
    assert_eq!(schema.len(), 1);
    assert!(schema.rules().is_empty());
    assert!(schema.default_memory().is_none());
}

#[test]
fn test_duplicate_field_file_rejected() {
    let err = load_file(&schema_path("duplicate.json")).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateField(ref id) if id == "count"), "{err}");
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_file(&schema_path("does-not-exist.json")).unwrap_err();
    assert!(matches!(err, SchemaError::Io(_)));
}

// =============================================================================
// Malformed documents
// =============================================================================

#[test]
fn test_unknown_type_rejected() {
    let err = load_value(json!({
        "id": "Bad",
        "parameters": [{"id": "x", "type": "float"}]
    }))
    .unwrap_err();
    assert!(matches!(err, SchemaError::UnknownType { ref type_name, .. } if type_name == "float"));
}

#[test]
fn test_rule_with_undeclared_target_rejected() {
    let err = load_value(json!({
        "id": "Bad",
        "parameters": [
            {"id": "mode", "type": "string", "enum": ["a", "b"]},
            {"id": "a_file", "type": "wsid"}
        ],
        "conditional_requirements": [
            {"id": "mode_inputs", "discriminator": "mode", "cases": {"a": "a_file", "b": "b_file"}}
        ]
    }))
    .unwrap_err();
    assert!(matches!(err, SchemaError::BadRule { ref rule, .. } if rule == "mode_inputs"));
}

#[test]
fn test_default_outside_enum_rejected() {
    let err = load_value(json!({
        "id": "Bad",
        "parameters": [{"id": "mode", "type": "string", "enum": ["a"], "default": "z"}]
    }))
    .unwrap_err();
    assert!(matches!(err, SchemaError::BadDefault { ref field, .. } if field == "mode"));
}

#[test]
fn test_not_json_is_parse_error() {
    assert!(matches!(load("parameters: ["), Err(SchemaError::Parse(_))));
}
