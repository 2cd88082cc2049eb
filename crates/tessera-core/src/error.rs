//! Error types surfaced to handlers.
//!
//! Per-request failures never unwind through the pipeline; they come back to
//! the handler as one of these values and the handler picks the response.

use thiserror::Error;

/// Errors returned by [`Context`](crate::Context) accessors.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A form, query or path key was not present.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// `bind_json` was called on a request without a body.
    #[error("request body is empty")]
    EmptyBody,

    /// The request body is not valid JSON for the target type.
    #[error("invalid JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The URL-encoded form body could not be parsed.
    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    /// The query string holds a malformed escape or invalid UTF-8.
    #[error("malformed query string: {0}")]
    Query(String),

    /// A response value could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ContextError {
    /// Returns true for a missing form, query or path key.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}

/// Errors from writing to the response sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The underlying connection is gone.
    #[error("response sink is closed")]
    Closed,
}
