//! Error types for the resource model and codec.

use thiserror::Error;

/// Errors raised while walking or transforming a resource document.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The document violates the FHIR schema (unknown element, wrong JSON
    /// kind, missing `resourceType`). Maps to HTTP 400 / `structure`.
    #[error("FHIR schema error at {path}: {message}")]
    Schema {
        /// Dotted path to the offending element.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// A reference string could not be decomposed into type and id.
    #[error("invalid reference: {reference}")]
    InvalidReference {
        /// The reference text as received.
        reference: String,
    },

    /// A date, dateTime or instant literal failed to parse.
    #[error("invalid {kind} literal at {path}: {value}")]
    InvalidDate {
        /// `date`, `dateTime` or `instant`.
        kind: &'static str,
        path: String,
        value: String,
    },

    /// A number literal failed to parse or had an unexpected shape.
    #[error("invalid number at {path}: {value}")]
    InvalidNumber { path: String, value: String },

    /// Round-trip of a stored document produced malformed output.
    #[error("malformed stored document: {0}")]
    MalformedDocument(String),

    /// Patient-details encryption or decryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),
}

impl ModelError {
    pub(crate) fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::Schema {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type ModelResult<T> = Result<T, ModelError>;
