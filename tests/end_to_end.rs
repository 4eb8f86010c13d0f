//! End-to-end request tests
//!
//! Raw parameters go through validation, descriptor building and submission
//! to the in-process mock backend.

mod fixtures;

use docking_submit::input::read_parameters;
use docking_submit::job::SCHEMA_VERSION;
use docking_submit::{CancellationToken, JobDescriptor, MockBackend, Provenance};
use docking_protocol::JobState;
use fixtures::{engine_with, init_logging, params_path, scenario};
use serde_json::{json, Value};

// =============================================================================
// Reference scenario
// =============================================================================

#[test]
fn test_reference_scenario_validates_cleanly() {
    init_logging();
    let backend = MockBackend::new();
    let engine = engine_with(&backend);

    let report = engine.validate(&scenario());
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert!(report.warnings.is_empty());

    let plain = report.normalized.to_plain();
    assert_eq!(plain.len(), 11);
    assert_eq!(plain["input_pdb"], json!(["1ABC"]));
    assert_eq!(plain["ligand_library_type"], json!("smiles_list"));
    assert_eq!(plain["ligand_smiles_list"], json!(["CCO"]));
    assert_eq!(plain["batch_size"], json!(10));
    assert_eq!(plain["output_path"], json!("/out"));
    assert_eq!(plain["output_file"], json!("run1"));
    assert_eq!(plain["top_n"], Value::Null);
    assert_eq!(plain["enable_debug"], Value::Null);
    assert_eq!(plain["_tmpdir"], Value::Null);
}

#[test]
fn test_reference_scenario_descriptor() {
    init_logging();
    let backend = MockBackend::new();
    let prepared = engine_with(&backend).prepare(&scenario()).unwrap();
    let descriptor = &prepared.descriptor;

    assert_eq!(descriptor.schema_version(), SCHEMA_VERSION);
    assert_eq!(descriptor.schema_id(), "Docking");
    assert_eq!(descriptor.default_memory(), Some("64G"));
    assert_eq!(descriptor.parameters().count(), 11);
    for id in ["top_n", "enable_debug", "_tmpdir", "ligand_ws_file", "ligand_named_library"] {
        assert!(descriptor.declares(id), "{id} should be declared");
        assert!(descriptor.parameter(id).is_none(), "{id} should be absent");
    }
    assert_eq!(
        descriptor.parameter("batch_size").map(|v| v.provenance),
        Some(Provenance::Supplied)
    );
    assert_eq!(descriptor.job_key().unwrap().len(), 64);
}

#[test]
fn test_reference_scenario_submits_one_job() {
    init_logging();
    let backend = MockBackend::new();
    let submitted = engine_with(&backend)
        .run(&scenario(), &CancellationToken::new())
        .unwrap();

    assert_eq!(backend.job_count(), 1);
    assert_eq!(submitted.handle.job_id, submitted.descriptor.job_id());
    assert_eq!(submitted.handle.state, JobState::Queued);
    assert!(!submitted.handle.existing);

    let received = backend
        .submitted_descriptor(&submitted.handle.job_id)
        .expect("backend keeps the descriptor");
    assert_eq!(received, submitted.descriptor);
}

// =============================================================================
// Defaults and parameter files
// =============================================================================

#[test]
fn test_default_batch_size_is_marked_defaulted() {
    let backend = MockBackend::new();
    let mut input = scenario();
    input.remove("batch_size");

    let prepared = engine_with(&backend).prepare(&input).unwrap();
    let batch = prepared.descriptor.parameter("batch_size").unwrap();
    assert_eq!(batch.to_json(), json!(10));
    assert_eq!(batch.provenance, Provenance::Defaulted);
}

#[test]
fn test_json_and_yaml_files_build_the_same_parameters() {
    let backend = MockBackend::new();
    let engine = engine_with(&backend);

    let from_json = read_parameters(&params_path("scenario.json")).unwrap();
    let from_yaml = read_parameters(&params_path("scenario.yaml")).unwrap();
    assert_eq!(from_json, scenario());

    let a = engine.prepare(&from_json).unwrap().descriptor;
    let b = engine.prepare(&from_yaml).unwrap().descriptor;
    assert_ne!(a.job_id(), b.job_id());
    assert_eq!(a.plain_parameters(), b.plain_parameters());
    assert_eq!(a.job_key().unwrap(), b.job_key().unwrap());
}

#[test]
fn test_descriptor_file_round_trip() {
    let backend = MockBackend::new();
    let descriptor = engine_with(&backend).prepare(&scenario()).unwrap().descriptor;
    let dir = tempfile::tempdir().unwrap();

    for name in ["job.json", "job.yaml"] {
        let path = dir.path().join(name);
        descriptor.write_to_file(&path).unwrap();
        let loaded = JobDescriptor::from_file(&path).unwrap();
        assert_eq!(loaded, descriptor, "round trip through {name}");
    }
}

#[test]
fn test_invalid_file_reports_conditional_requirement() {
    let backend = MockBackend::new();
    let raw = read_parameters(&params_path("ws_file_missing.json")).unwrap();

    let report = engine_with(&backend).validate(&raw);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].field(), "ligand_ws_file");
    assert_eq!(backend.job_count(), 0);
}
