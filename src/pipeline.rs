//! Request pipeline
//!
//! One request runs: schema snapshot -> validate -> build descriptor ->
//! submit. Requests share nothing but the [`SchemaHandle`] and the gateway,
//! so an [`Engine`] can be cloned across threads.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::gateway::{CancellationToken, JobHandle, SubmissionError, SubmissionGateway};
use crate::job::{JobDescriptor, JobDescriptorBuilder};
use crate::schema::{SchemaError, SchemaHandle, SchemaModel};
use crate::validate::{
    ParameterValidator, RawParameters, ValidationErrors, ValidationReport, ValidationWarning,
};

/// Exit code for usage and configuration errors
pub const EXIT_CODE_USAGE: i32 = 1;

/// Exit code for parameter validation failures
pub const EXIT_CODE_INVALID: i32 = 2;

/// Errors setting up an engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Why a request did not produce a job
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Submission(#[from] SubmissionError),
}

impl RequestError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            RequestError::Validation(_) => EXIT_CODE_INVALID,
            RequestError::Submission(e) => e.exit_code(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Submission(SubmissionError::Cancelled { .. }))
    }
}

/// A descriptor ready for submission plus the warnings raised on the way
#[derive(Debug, Clone)]
pub struct Prepared {
    pub descriptor: JobDescriptor,
    pub warnings: Vec<ValidationWarning>,
}

/// Outcome of a full request
#[derive(Debug, Clone)]
pub struct Submitted {
    pub handle: JobHandle,
    pub descriptor: JobDescriptor,
    pub warnings: Vec<ValidationWarning>,
}

/// Validation and submission engine
#[derive(Clone)]
pub struct Engine {
    schema: SchemaHandle,
    validator: ParameterValidator,
    gateway: SubmissionGateway,
    submit_timeout: Option<Duration>,
}

impl Engine {
    pub fn new(schema: SchemaHandle, validator: ParameterValidator, gateway: SubmissionGateway) -> Self {
        Self {
            schema,
            validator,
            gateway,
            submit_timeout: None,
        }
    }

    /// Bound every submission by `timeout`
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }

    /// Wire up schema, validator and backend from configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let schema = config.load_schema()?;
        log::info!(
            "schema '{}' ready with {} parameters, backend {:?}",
            schema.id(),
            schema.len(),
            config.backend.kind
        );
        let validator = ParameterValidator::new(config.validation_options()?);
        let gateway = SubmissionGateway::new(config.build_backend()?);
        Ok(Self::new(SchemaHandle::new(schema), validator, gateway)
            .with_submit_timeout(config.submit_timeout()))
    }

    pub fn schema(&self) -> Arc<SchemaModel> {
        self.schema.current()
    }

    pub fn schema_handle(&self) -> &SchemaHandle {
        &self.schema
    }

    pub fn gateway(&self) -> &SubmissionGateway {
        &self.gateway
    }

    /// Swap in a schema loaded from `path`; in-flight requests keep theirs
    pub fn reload_schema(&self, path: &Path) -> Result<Arc<SchemaModel>, SchemaError> {
        self.schema.reload_from(path)
    }

    /// Validate against the current schema
    pub fn validate(&self, raw: &RawParameters) -> ValidationReport {
        let schema = self.schema.current();
        self.validator.validate(&schema, raw)
    }

    /// Validate and build a descriptor
    pub fn prepare(&self, raw: &RawParameters) -> Result<Prepared, ValidationErrors> {
        let schema = self.schema.current();
        let validated = self.validator.validate(&schema, raw).into_result()?;
        for warning in &validated.warnings {
            log::warn!("{warning}");
        }

        let descriptor = JobDescriptorBuilder::new(&schema).build(&validated.parameters);
        log::info!(
            "prepared job {} for schema '{}'",
            descriptor.job_id(),
            schema.id()
        );
        Ok(Prepared {
            descriptor,
            warnings: validated.warnings,
        })
    }

    /// Submit a prepared descriptor, honouring the configured timeout
    pub fn submit(
        &self,
        descriptor: &JobDescriptor,
        token: &CancellationToken,
    ) -> Result<JobHandle, SubmissionError> {
        match self.submit_timeout {
            Some(timeout) => self
                .gateway
                .submit_until(descriptor, &token.with_timeout(timeout)),
            None => self.gateway.submit_until(descriptor, token),
        }
    }

    /// Validate, build and submit in one go
    pub fn run(&self, raw: &RawParameters, token: &CancellationToken) -> Result<Submitted, RequestError> {
        let prepared = self.prepare(raw)?;
        let handle = self.submit(&prepared.descriptor, token)?;
        Ok(Submitted {
            handle,
            descriptor: prepared.descriptor,
            warnings: prepared.warnings,
        })
    }
}
