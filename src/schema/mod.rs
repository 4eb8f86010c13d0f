//! Parameter schema
//!
//! A schema document declares the parameters a docking job accepts. It is
//! parsed once into an immutable [`SchemaModel`] and shared through a
//! [`SchemaHandle`], which can swap in a reloaded model without disturbing
//! in-flight validations.

mod handle;
mod loader;
mod model;
mod rules;

pub use handle::SchemaHandle;
pub use loader::{load, load_file, load_value, SchemaError};
pub use model::{FieldSpec, FieldType, SchemaModel};
pub use rules::ConditionalRule;

/// The docking schema compiled into the binary.
pub const DOCKING_SCHEMA: &str = include_str!("../../schemas/docking.json");

/// Load the built-in docking schema.
pub fn docking_schema() -> Result<SchemaModel, SchemaError> {
    load(DOCKING_SCHEMA)
}
