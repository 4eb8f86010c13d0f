//! Shared fixtures for integration tests
//!
//! Parameter files live under `tests/fixtures/params`, extra schema
//! documents under `tests/fixtures/schemas`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docking_submit::schema::docking_schema;
use docking_submit::{
    Engine, MockBackend, ParameterValidator, RawParameters, SchemaHandle, SubmissionGateway,
};
use serde_json::{json, Value};

/// Path to a parameter fixture
pub fn params_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/params")
        .join(name)
}

/// Path to a schema fixture
pub fn schema_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/schemas")
        .join(name)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// JSON object literal -> raw parameters
pub fn raw(value: Value) -> RawParameters {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be a JSON object, got {other}"),
    }
}

/// The reference docking request
pub fn scenario() -> RawParameters {
    raw(json!({
        "input_pdb": ["1ABC"],
        "ligand_library_type": "smiles_list",
        "ligand_smiles_list": ["CCO"],
        "batch_size": 10,
        "output_path": "/out",
        "output_file": "run1"
    }))
}

/// Engine over the built-in schema and the given mock backend
pub fn engine_with(backend: &MockBackend) -> Engine {
    engine_with_validator(backend, ParameterValidator::default())
}

pub fn engine_with_validator(backend: &MockBackend, validator: ParameterValidator) -> Engine {
    let schema = docking_schema().expect("built-in schema loads");
    Engine::new(
        SchemaHandle::new(schema),
        validator,
        SubmissionGateway::new(Arc::new(backend.clone())),
    )
}
