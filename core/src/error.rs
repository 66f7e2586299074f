//! Error types for the subset API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the subset does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `HttpError` with the raw
//! status code and body for debugging. Operations that hand back the raw
//! `HttpResponse` never produce either of those; for them only transport and
//! serialization failures are errors.

use thiserror::Error;

/// Errors returned by `SubsetClient` parse methods and `SubsetManager`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404 for a response that had to be interpreted.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// No response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A request that never produced an HTTP response.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Invalid or missing client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
