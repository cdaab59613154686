use thiserror::Error;

use std::io;

pub type Result<T> = std::result::Result<T, MappedJsonError>;
pub type SerializationResult<T> = std::result::Result<T, SerializationError>;
pub type DeserializationResult<T> = std::result::Result<T, DeserializationError>;

/// Errors raised while building or rendering a document.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The sink call sequence violated the start/attribute/value/end contract.
    #[error("Invalid writer state at `{path}`: {message}")]
    InvalidState { path: String, message: String },

    /// The node cannot be rendered losslessly as JSON under the active policy.
    #[error("Node `{path}` cannot be rendered as JSON: {message}")]
    Encoding { path: String, message: String },

    #[error("An I/O error has occurred while writing the document: {0}")]
    Io(#[from] io::Error),
}

impl SerializationError {
    pub(crate) fn invalid_state(path: impl ToString, message: impl Into<String>) -> Self {
        SerializationError::InvalidState {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn encoding(path: impl ToString, message: impl Into<String>) -> Self {
        SerializationError::Encoding {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while reading mapped JSON back into a document.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("`serde_json` failed with error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected JSON shape at `{path}`: {message}")]
    UnexpectedShape { path: String, message: String },

    #[error("Failed to decode input as `{encoding}`: {message}")]
    Decode { encoding: String, message: String },

    #[error("An I/O error has occurred while reading the document: {0}")]
    Io(#[from] io::Error),
}

impl DeserializationError {
    pub(crate) fn unexpected_shape(path: impl ToString, message: impl Into<String>) -> Self {
        DeserializationError::UnexpectedShape {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MappedJsonError {
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    #[error("`{label}` is not a supported text encoding")]
    UnsupportedEncoding { label: String },

    #[error("Invalid writer settings: {message}")]
    InvalidSettings { message: String },

    /// Errors from the XML bridge; quick-xml keeps the element stack for us,
    /// so structural and I/O failures both land here.
    #[error("XML failed at position {position}: {message}")]
    Xml { position: u64, message: String },
}

impl From<io::Error> for MappedJsonError {
    fn from(err: io::Error) -> Self {
        MappedJsonError::Serialization(SerializationError::Io(err))
    }
}
