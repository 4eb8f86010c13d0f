//! Effective engine configuration with provenance
//!
//! Layers are merged as JSON, then the merged object is decoded into typed
//! sections and checked.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex_lite::Regex;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::gateway::{Backend, CommandBackend};
use crate::mock::MockBackend;
use crate::schema::{docking_schema, load_file, SchemaError, SchemaModel};
use crate::validate::{MultiplicityPolicy, UnknownKeyPolicy, ValidationOptions};

/// Upper bound for `submission.timeout_seconds`
const MAX_TIMEOUT_SECONDS: u64 = 3600;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// `[schema]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSection {
    /// Schema document; the built-in docking schema when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `[validation]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSection {
    pub unknown_keys: UnknownKeyPolicy,
    pub multiplicity: MultiplicityPolicy,
    /// Extra pattern workspace ids must match
    #[serde(default)]
    pub wsid_pattern: Option<String>,
}

/// Which backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process mock
    Mock,
    /// External command speaking JSON on stdin/stdout
    Command,
}

/// `[backend]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    pub kind: BackendKind,
    #[serde(default)]
    pub command: Vec<String>,
}

/// `[submission]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionSection {
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Sections {
    #[serde(default)]
    schema: SchemaSection,
    validation: ValidationSection,
    backend: BackendSection,
    submission: SubmissionSection,
}

/// Merged engine configuration
#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    pub schema: SchemaSection,
    pub validation: ValidationSection,
    pub backend: BackendSection,
    pub submission: SubmissionSection,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// The merged configuration object
    #[serde(skip)]
    raw: Value,
}

impl EngineConfig {
    /// Built-in defaults only
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::build(None, None)
    }

    /// Build from layers: defaults, optional TOML file, optional CLI overrides
    pub fn build(config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = config_path {
            let (value, digest) = Self::load_toml_file(path)?;
            log::info!("using config file {} (sha256 {})", path.display(), digest);
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let sections: Sections = serde_json::from_value(merged.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let config = Self {
            schema: sections.schema,
            validation: sections.validation,
            backend: sections.backend,
            submission: sections.submission,
            sources,
            raw: merged,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Parse(format!("invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let timeout = self.submission.timeout_seconds;
        if timeout == 0 || timeout > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "submission.timeout_seconds must be in (0, {MAX_TIMEOUT_SECONDS}], got {timeout}"
            )));
        }

        if self.backend.kind == BackendKind::Command && self.backend.command.is_empty() {
            return Err(ConfigError::Invalid(
                "backend.command must be set when backend.kind is \"command\"".to_string(),
            ));
        }

        self.wsid_pattern()?;
        Ok(())
    }

    fn wsid_pattern(&self) -> Result<Option<Regex>, ConfigError> {
        self.validation
            .wsid_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Invalid(format!("validation.wsid_pattern: {}", e))
                })
            })
            .transpose()
    }

    /// Validator settings from `[validation]`
    pub fn validation_options(&self) -> Result<ValidationOptions, ConfigError> {
        Ok(ValidationOptions {
            unknown_keys: self.validation.unknown_keys,
            multiplicity: self.validation.multiplicity,
            wsid_pattern: self.wsid_pattern()?,
        })
    }

    /// Load the configured schema, or the built-in one
    pub fn load_schema(&self) -> Result<SchemaModel, SchemaError> {
        match &self.schema.path {
            Some(path) => load_file(path),
            None => docking_schema(),
        }
    }

    /// Instantiate the configured backend
    pub fn build_backend(&self) -> Result<Arc<dyn Backend>, ConfigError> {
        match self.backend.kind {
            BackendKind::Mock => Ok(Arc::new(MockBackend::new())),
            BackendKind::Command => CommandBackend::from_argv(&self.backend.command)
                .map(|backend| Arc::new(backend) as Arc<dyn Backend>)
                .ok_or_else(|| ConfigError::Invalid("backend.command is empty".to_string())),
        }
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submission.timeout_seconds)
    }

    /// Get a merged value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.raw;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
