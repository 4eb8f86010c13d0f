//! Engine configuration
//!
//! Three layers, merged in order:
//! 1. Built-in defaults
//! 2. TOML config file (`--config`, or `docking-submit.toml` when present)
//! 3. CLI overrides (`--set key.path=value`)

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, DEFAULT_CONFIG_FILE};
pub use effective::{
    BackendKind, BackendSection, ConfigError, ConfigOrigin, ConfigSource, EngineConfig,
    SchemaSection, SubmissionSection, ValidationSection,
};
pub use merge::{deep_merge, merge_layers, override_from_pair};
