//! Schema reload while requests are in flight
//!
//! Every request validates against one schema snapshot; a reload only
//! affects requests that start after it.

mod fixtures;

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use docking_submit::schema::DOCKING_SCHEMA;
use docking_submit::validate::validate;
use docking_submit::{CancellationToken, MockBackend, ValidationError};
use fixtures::{engine_with, init_logging, scenario, schema_path};
use serde_json::{json, Value};

/// Docking schema with `top_n` made required
fn stricter_schema() -> String {
    let mut doc: Value = serde_json::from_str(DOCKING_SCHEMA).unwrap();
    for param in doc["parameters"].as_array_mut().unwrap() {
        if param["id"] == "top_n" {
            param["required"] = json!(1);
        }
    }
    doc["id"] = json!("DockingStrict");
    serde_json::to_string_pretty(&doc).unwrap()
}

#[test]
fn test_reload_applies_to_later_requests() {
    init_logging();
    let backend = MockBackend::new();
    let engine = engine_with(&backend);
    let snapshot = engine.schema();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docking.json");
    fs::write(&path, stricter_schema()).unwrap();

    let previous = engine.reload_schema(&path).unwrap();
    assert_eq!(previous.id(), "Docking");
    assert_eq!(engine.schema().id(), "DockingStrict");

    // The old snapshot is untouched
    assert!(!snapshot.field("top_n").unwrap().required);

    let report = engine.validate(&scenario());
    assert_eq!(
        report.errors,
        vec![ValidationError::MissingRequired {
            field: "top_n".into()
        }]
    );
}

#[test]
fn test_failed_reload_keeps_current_schema() {
    let backend = MockBackend::new();
    let engine = engine_with(&backend);

    assert!(engine.reload_schema(&schema_path("duplicate.json")).is_err());
    assert_eq!(engine.schema().id(), "Docking");
    assert!(engine.validate(&scenario()).is_valid());
}

#[test]
fn test_reload_during_concurrent_requests() {
    init_logging();
    let backend = MockBackend::new();
    let engine = engine_with(&backend);

    let dir = tempfile::tempdir().unwrap();
    let strict_path = dir.path().join("strict.json");
    let plain_path = dir.path().join("plain.json");
    fs::write(&strict_path, stricter_schema()).unwrap();
    fs::write(&plain_path, DOCKING_SCHEMA).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let reloader = {
        let engine = engine.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut flips = 0;
            loop {
                let path = if flips % 2 == 0 { &strict_path } else { &plain_path };
                engine.reload_schema(path).unwrap();
                flips += 1;
                if stop.load(Ordering::Relaxed) {
                    return flips;
                }
            }
        })
    };

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut accepted = 0;
                for _ in 0..25 {
                    // Outcome must match whichever snapshot the request saw
                    let schema = engine.schema();
                    let valid = validate(&schema, &scenario()).is_valid();
                    let strict = schema.field("top_n").unwrap().required;
                    assert_eq!(valid, !strict, "schema '{}'", schema.id());
                    if engine.run(&scenario(), &CancellationToken::new()).is_ok() {
                        accepted += 1;
                    }
                }
                accepted
            })
        })
        .collect();

    let accepted: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
    stop.store(true, Ordering::Relaxed);
    let flips = reloader.join().unwrap();

    assert!(flips > 0);
    assert_eq!(backend.job_count(), accepted);
}
