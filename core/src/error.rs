//! Error types for the HubSpot client.
//!
//! # Design
//! `NotFound` gets its own variant because callers routinely tell "the
//! object does not exist" apart from "the API refused the call". Every other
//! non-2xx response lands in `RequestFailed`. Both carry the full response.

use thiserror::Error;

use crate::http::HttpResponse;

/// Errors returned by the connection layer and the resource wrappers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required configuration field is not set.
    #[error("configuration error: `{0}` is not configured")]
    Configuration(&'static str),

    /// A configuration value is present but unusable.
    #[error("configuration error: invalid `{field}` value {value:?}")]
    InvalidConfig { field: &'static str, value: String },

    /// The path template still holds a `:placeholder` after substitution.
    #[error("interpolation not resolved in path {path:?}")]
    MissingInterpolation { path: String },

    /// A query parameter value does not fit the rule selected by its key.
    #[error("invalid value for parameter `{key}`: {reason}")]
    InvalidParam { key: String, reason: &'static str },

    /// The API answered 404.
    #[error("HubSpot resource not found: {}", .0.body)]
    NotFound(Box<HttpResponse>),

    /// The API answered with a non-2xx status other than 404.
    #[error("HubSpot request failed with status {}: {}", .0.status, .0.body)]
    RequestFailed(Box<HttpResponse>),

    /// The round trip itself failed (DNS, connect, timeout, I/O).
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The request payload could not be serialized.
    #[error("request body could not be serialized: {0}")]
    Serialization(String),

    /// The response body is not valid JSON.
    #[error("response body is not valid JSON: {source}")]
    Deserialization {
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl ApiError {
    /// The response attached to a `NotFound` or `RequestFailed` error.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::NotFound(response) | ApiError::RequestFailed(response) => Some(response),
            _ => None,
        }
    }

    /// True for both `NotFound` and `RequestFailed`: the API answered, but not with 2xx.
    pub fn is_request_error(&self) -> bool {
        self.response().is_some()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for ApiError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
