//! Error types for RenderKit

use thiserror::Error;

/// Errors that can occur while compiling, sending or normalizing a request
#[derive(Debug, Error)]
pub enum RenderError {
    /// An option is missing or malformed; raised before any network call
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// A textual response body is not valid JSON
    #[error("Failed to parse response as JSON")]
    Parse(#[source] serde_json::Error),

    /// The response payload could not be wrapped as a binary artifact
    #[error(
        "Error processing binary data: {message}. ResponseData type: {payload_type}, Keys: {payload_keys}"
    )]
    BinaryProcessing {
        message: String,
        payload_type: String,
        payload_keys: String,
    },

    /// Account ID or API token is missing
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),
}

impl RenderError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RenderError::Timeout
        } else if err.is_connect() {
            RenderError::ConnectError(err)
        } else {
            RenderError::RequestError(err.to_string())
        }
    }

    /// Shorthand for a validation error
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        RenderError::Validation(message.into())
    }

    /// True for errors raised before any request was attempted
    pub fn is_validation(&self) -> bool {
        matches!(self, RenderError::Validation(_))
    }
}
