//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "docking-submit.toml";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Unknown parameter keys: "warn" or "reject"
    pub unknown_keys: String,

    /// Scalars given to multi-valued fields: "wrap" or "reject"
    pub multiplicity: String,

    /// Backend kind (default: "mock")
    pub backend_kind: String,

    /// Submission timeout in seconds (default: 60)
    pub timeout_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            unknown_keys: "warn".to_string(),
            multiplicity: "wrap".to_string(),
            backend_kind: "mock".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "schema": {},
            "validation": {
                "unknown_keys": self.unknown_keys,
                "multiplicity": self.multiplicity
            },
            "backend": {
                "kind": self.backend_kind,
                "command": []
            },
            "submission": {
                "timeout_seconds": self.timeout_seconds
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["validation"]["unknown_keys"], "warn");
        assert_eq!(value["validation"]["multiplicity"], "wrap");
        assert_eq!(value["backend"]["kind"], "mock");
        assert_eq!(value["submission"]["timeout_seconds"], 60);
        assert!(value["schema"].get("path").is_none());
    }
}
