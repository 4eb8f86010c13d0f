//! Operation-specific types.

pub mod status;
pub mod submit;

pub use status::{StatusRequest, StatusResponse};
pub use submit::{JobState, SubmitRequest, SubmitResponse};

/// Known operation names.
pub mod names {
    pub const SUBMIT: &str = "submit";
    pub const STATUS: &str = "status";
}
