//! Error kinds for counterpoint operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to tell a terminal flow failure apart from
/// a misconfiguration or a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration or parameters
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Backend errors
    // =========================================================================
    /// The generation backend reported a failure
    BackendFailed,

    /// Network error talking to the backend
    NetworkFailed,

    /// Rate limit exceeded
    RateLimited,

    /// The backend rejected our credentials
    AuthenticationFailed,

    /// Failed to parse a backend reply
    ParseFailed,

    // =========================================================================
    // Flow errors
    // =========================================================================
    /// The backend answered but the output contract was not satisfied
    IncompleteOutput,

    /// Every attempt of a retry sequence failed
    RetryExhausted,

    /// The caller cancelled the operation
    Cancelled,

    /// No flow registered under the requested name
    FlowNotFound,

    /// Serialization/deserialization of flow input or output failed
    SerializationFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Backend
            ErrorKind::BackendFailed => "BackendFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::ParseFailed => "ParseFailed",

            // Flow
            ErrorKind::IncompleteOutput => "IncompleteOutput",
            ErrorKind::RetryExhausted => "RetryExhausted",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::FlowNotFound => "FlowNotFound",
            ErrorKind::SerializationFailed => "SerializationFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::BackendFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ParseFailed
                | ErrorKind::IncompleteOutput
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::IncompleteOutput.to_string(), "IncompleteOutput");
        assert_eq!(ErrorKind::RetryExhausted.to_string(), "RetryExhausted");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::IncompleteOutput.is_retryable());
        assert!(!ErrorKind::RetryExhausted.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
        assert!(!ErrorKind::AuthenticationFailed.is_retryable());
    }
}
