//! Error types shared across the workspace.

use crate::wire::WireFormat;

/// Errors surfaced by schema definition, loading, conversion, and actions.
///
/// None of these are retried internally; transport-level transient failures
/// are the transport collaborator's concern.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unknown keyword, missing required parameter, or a malformed
    /// declaration. Always surfaced immediately.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The server reported the resource does not exist.
    #[error("server returned 404 Not Found for the URL {url}")]
    NotFound { url: String },

    /// Any other unexpected HTTP status. Carries the raw response body for
    /// caller inspection.
    #[error("unexpected response from server: {status} ({reason})")]
    Http {
        status: u16,
        reason: String,
        body: String,
    },

    /// A required field was absent from a server response (strict mode).
    #[error("response from {url} is missing required field '{field}'")]
    MissingField { field: String, url: String },

    /// A wire value cannot convert through a field descriptor.
    #[error("field '{field}': {message}")]
    Conversion { field: String, message: String },

    /// A reference cycle was detected while converting a host object graph
    /// back to wire form.
    #[error("reference cycle detected during serialization")]
    SerializationCycle,

    /// Access of a name that is neither a declared field nor present after
    /// population.
    #[error("'{resource}' has no attribute '{attribute}'")]
    AttributeNotFound { resource: String, attribute: String },

    /// A serializer strategy failed to parse wire text.
    #[error("decode error ({format}): {message}")]
    Decode { format: WireFormat, message: String },

    /// A serializer strategy failed to produce wire text.
    #[error("encode error ({format}): {message}")]
    Encode { format: WireFormat, message: String },

    /// URL parse failure.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The transport collaborator failed. Unrecoverable for that call.
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl Error {
    /// Shorthand for an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for a decode error.
    pub fn decode(format: WireFormat, message: impl Into<String>) -> Self {
        Error::Decode {
            format,
            message: message.into(),
        }
    }

    /// Shorthand for an encode error.
    pub fn encode(format: WireFormat, message: impl Into<String>) -> Self {
        Error::Encode {
            format,
            message: message.into(),
        }
    }
}

/// Workspace result alias.
pub type Result<T> = std::result::Result<T, Error>;
