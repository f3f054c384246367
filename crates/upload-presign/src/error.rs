//! Error types for presigned URL generation.
//!
//! Every failure is deterministic: signing performs no I/O, so none of these
//! variants is retryable without changing the input.

/// Errors that can occur while producing a presigned upload URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    /// A required request field (`bucket` or `key`) is empty.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A request field is present but outside the accepted range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the offending field.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The store configuration is malformed (bad endpoint, empty region or
    /// credential fields).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Convenience result type for signing operations.
pub type SignResult<T> = Result<T, SignError>;
