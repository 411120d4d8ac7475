//! Flow error types
//!
//! Re-exports counterpoint-error and adds flow-specific conveniences.

pub use counterpoint_error::{Error, ErrorKind, ErrorStatus, Result};

/// Create an InvalidArgument error for a bad request field
pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Error {
    Error::invalid_argument(reason).with_context("field", field)
}

/// Create a SerializationFailed error for flow input that does not decode
pub fn bad_flow_input(flow: &str, err: serde_json::Error) -> Error {
    Error::serialization_failed(format!("invalid input for flow '{}': {}", flow, err))
        .with_operation("registry::invoke")
        .with_context("flow", flow)
        .set_source(err)
}
