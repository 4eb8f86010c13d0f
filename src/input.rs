//! Raw parameter files
//!
//! The CLI takes caller parameters as a JSON or YAML object, from a file or
//! from stdin (`-`).

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::validate::RawParameters;

/// Errors reading a parameter file
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not valid JSON or YAML: {message}")]
    Parse { path: String, message: String },

    #[error("{path} must contain a mapping of parameter ids to values")]
    NotAnObject { path: String },
}

/// Read a parameter file; `-` reads stdin
pub fn read_parameters(path: &Path) -> Result<RawParameters, InputError> {
    let label = path.display().to_string();
    let text = if label == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| InputError::Io {
                path: label.clone(),
                source,
            })?;
        buf
    } else {
        fs::read_to_string(path).map_err(|source| InputError::Io {
            path: label.clone(),
            source,
        })?
    };
    parse_parameters(&text, &label)
}

/// Parse parameter text. JSON is tried first; YAML is a superset for our purposes.
pub fn parse_parameters(text: &str, label: &str) -> Result<RawParameters, InputError> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_str(text).map_err(|e| InputError::Parse {
            path: label.to_string(),
            message: e.to_string(),
        })?,
    };

    match value {
        Value::Object(map) => Ok(map),
        // An empty YAML document
        Value::Null => Ok(RawParameters::new()),
        _ => Err(InputError::NotAnObject {
            path: label.to_string(),
        }),
    }
}
