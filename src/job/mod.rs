//! Job descriptor builder and job_key computation
//!
//! A [`JobDescriptor`] is the immutable, backend-ready record of one docking
//! job: the schema it was validated against, a job id, and every declared
//! parameter in declaration order. The job_key is computed with the RFC 8785
//! JSON Canonicalization Scheme (JCS) so equal parameter sets hash equally.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::schema::SchemaModel;
use crate::validate::NormalizedParameters;
use crate::value::ParameterValue;

/// Schema version for the descriptor format
pub const SCHEMA_VERSION: u32 = 1;

/// Immutable description of one job ready for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    schema_version: u32,
    schema_id: String,
    job_id: String,
    parameters: IndexMap<String, Option<ParameterValue>>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_memory: Option<String>,
}

impl JobDescriptor {
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Memory request carried over from the schema
    pub fn default_memory(&self) -> Option<&str> {
        self.default_memory.as_deref()
    }

    /// Value of one parameter; `None` when absent or undeclared
    pub fn parameter(&self, id: &str) -> Option<&ParameterValue> {
        self.parameters.get(id).and_then(Option::as_ref)
    }

    /// Whether the schema declared this parameter
    pub fn declares(&self, id: &str) -> bool {
        self.parameters.contains_key(id)
    }

    /// Every declared parameter in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = (&str, Option<&ParameterValue>)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Parameters as plain JSON with provenance dropped
    pub fn plain_parameters(&self) -> Map<String, Value> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.as_ref().map_or(Value::Null, ParameterValue::to_json)))
            .collect()
    }

    /// Compute the job_key
    ///
    /// job_key = SHA-256 hex digest of JCS({schema_id, parameters})
    pub fn job_key(&self) -> Result<String, JobError> {
        let inputs = json!({
            "schema_id": self.schema_id,
            "parameters": self.plain_parameters(),
        });
        let jcs_bytes =
            serde_json_canonicalizer::to_vec(&inputs).map_err(|e| JobError::Jcs(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Serialize to JSON (pretty printed)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Write to file; `.yaml`/`.yml` paths get YAML, everything else JSON
    pub fn write_to_file(&self, path: &Path) -> Result<(), JobError> {
        let text = if is_yaml_path(path) {
            self.to_yaml()?
        } else {
            self.to_json()?
        };
        fs::write(path, text)?;
        Ok(())
    }

    /// Load from file
    pub fn from_file(path: &Path) -> Result<Self, JobError> {
        let text = fs::read_to_string(path)?;
        if is_yaml_path(path) {
            Ok(serde_yaml::from_str(&text)?)
        } else {
            Ok(Self::from_json(&text)?)
        }
    }
}

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Builds a [`JobDescriptor`] from validated parameters
pub struct JobDescriptorBuilder<'a> {
    schema: &'a SchemaModel,
    job_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl<'a> JobDescriptorBuilder<'a> {
    pub fn new(schema: &'a SchemaModel) -> Self {
        Self {
            schema,
            job_id: None,
            created_at: None,
        }
    }

    /// Use a fixed job id instead of generating one
    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Assemble the descriptor.
    ///
    /// Carries exactly the schema's declared fields, in declaration order,
    /// with `None` for fields that have no value.
    pub fn build(self, normalized: &NormalizedParameters) -> JobDescriptor {
        let parameters = self
            .schema
            .fields()
            .iter()
            .map(|field| (field.id.clone(), normalized.get(&field.id).cloned()))
            .collect();

        let descriptor = JobDescriptor {
            schema_version: SCHEMA_VERSION,
            schema_id: self.schema.id().to_string(),
            job_id: self.job_id.unwrap_or_else(generate_job_id),
            parameters,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            default_memory: self.schema.default_memory().map(str::to_string),
        };
        log::debug!(
            "built descriptor {} for schema '{}'",
            descriptor.job_id,
            descriptor.schema_id
        );
        descriptor
    }
}

/// Build a descriptor with a fresh job id.
pub fn build(schema: &SchemaModel, normalized: &NormalizedParameters) -> JobDescriptor {
    JobDescriptorBuilder::new(schema).build(normalized)
}

/// Generate a new job_id (UUID v4)
pub fn generate_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a new request_id using ULID
pub fn generate_request_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// Errors for descriptor operations
#[derive(Debug, Error)]
pub enum JobError {
    #[error("JCS canonicalization error: {0}")]
    Jcs(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
