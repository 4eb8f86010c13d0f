//! Docking job submission
//!
//! Validates caller parameters for a molecular-docking job against a
//! declarative parameter schema, builds an immutable job descriptor, and
//! submits it to a compute backend.

pub mod config;
pub mod gateway;
pub mod input;
pub mod job;
pub mod mock;
pub mod pipeline;
pub mod schema;
pub mod validate;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use gateway::{
    Backend, CancelReason, CancellationToken, CommandBackend, JobHandle, SubmissionError,
    SubmissionGateway,
};
pub use job::{JobDescriptor, JobDescriptorBuilder};
pub use mock::MockBackend;
pub use pipeline::{Engine, EngineError, RequestError};
pub use schema::{FieldSpec, FieldType, SchemaError, SchemaHandle, SchemaModel};
pub use validate::{
    NormalizedParameters, ParameterValidator, RawParameters, ValidationError, ValidationOptions,
    ValidationReport, ValidationWarning,
};
pub use value::{Bound, ParameterValue, Provenance, TypedValue};
