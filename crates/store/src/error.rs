//! Storage engine error taxonomy.

use thiserror::Error;

use meridian_search::SearchError;

/// Errors surfaced by the data-access layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No current resource with this id.
    #[error("resource not found")]
    NotFound,

    /// The resource existed but was deleted (a tombstone is present).
    #[error("resource deleted")]
    Deleted,

    /// Optimistic concurrency failure.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// A conditional operation matched more than one resource.
    #[error("multiple matches: {message}")]
    MultipleMatches { message: String },

    /// The requested database name is not allowed.
    #[error("invalid database name: {name}")]
    InvalidDatabase { name: String },

    /// Search parsing/compilation/execution failure.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Codec failure.
    #[error(transparent)]
    Model(#[from] meridian_model::ModelError),

    /// Driver-level failure.
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// An operation was attempted in an unsupported configuration.
    #[error("{0}")]
    InvalidState(String),
}

impl StoreError {
    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict {
            message: message.into(),
        }
    }

    pub fn multiple_matches(message: impl Into<String>) -> Self {
        StoreError::MultipleMatches {
            message: message.into(),
        }
    }

    /// HTTP status this error maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            StoreError::NotFound => 404,
            StoreError::Deleted => 410,
            StoreError::Conflict { .. } => 409,
            StoreError::MultipleMatches { .. } => 412,
            StoreError::InvalidDatabase { .. } => 400,
            StoreError::Search(e) => e.http_status(),
            StoreError::Model(_) => 400,
            StoreError::Database(_) | StoreError::InvalidState(_) => 500,
        }
    }

    /// OperationOutcome issue code for this error (when a body is wanted).
    pub fn outcome_code(&self) -> &'static str {
        match self {
            StoreError::NotFound => "not-found",
            StoreError::Deleted => "deleted",
            StoreError::Conflict { .. } => "conflict",
            StoreError::MultipleMatches { .. } => "duplicate",
            StoreError::InvalidDatabase { .. } => "value",
            StoreError::Search(e) => e.outcome_code(),
            StoreError::Model(_) => "structure",
            StoreError::Database(_) | StoreError::InvalidState(_) => "exception",
        }
    }

    /// True when the error is a transaction write conflict that the bundle
    /// processor should retry.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            StoreError::Database(err) => is_driver_write_conflict(err),
            StoreError::Search(SearchError::Storage(err)) => is_driver_write_conflict(err),
            _ => false,
        }
    }
}

/// True for the driver-level write-conflict / transient-transaction errors
/// that merit a bundle retry.
pub fn is_driver_write_conflict(err: &mongodb::error::Error) -> bool {
    use mongodb::error::ErrorKind;
    if err.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR) {
        return true;
    }
    match &*err.kind {
        ErrorKind::Command(command) => {
            command.code == 112 || command.code_name == "WriteConflict"
        }
        _ => false,
    }
}

/// True for a duplicate-key write failure (insert of an existing `_id` or a
/// racing archive upsert).
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == 11000,
        ErrorKind::Command(command) => command.code == 11000,
        _ => err.to_string().contains("duplicate key"),
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
