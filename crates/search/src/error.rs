//! Search error taxonomy.

use thiserror::Error;

/// Errors produced while parsing, compiling or executing a search.
#[derive(Error, Debug)]
pub enum SearchError {
    /// No processable parameter with this name exists for the resource.
    #[error("no processable search found for {resource} search parameters \"{name}\"")]
    UnknownParameter { resource: String, name: String },

    /// The parameter exists but its value violates the grammar.
    #[error("parameter \"{name}\" content is invalid")]
    InvalidValue { name: String },

    /// The modifier is not supported for this parameter.
    #[error("parameter \"{name}\" modifier is invalid")]
    InvalidModifier { name: String, modifier: String },

    /// A recognised but unsupported feature (e.g. `_contained`, `_text`).
    #[error("parameter \"{name}\" not understood")]
    Unsupported { name: String },

    /// Underlying database failure.
    #[error("search storage error: {0}")]
    Storage(#[from] mongodb::error::Error),

    /// Codec failure while materialising results.
    #[error(transparent)]
    Model(#[from] meridian_model::ModelError),
}

impl SearchError {
    /// HTTP status this error maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            SearchError::UnknownParameter { .. }
            | SearchError::InvalidValue { .. }
            | SearchError::InvalidModifier { .. }
            | SearchError::Unsupported { .. } => 400,
            SearchError::Storage(_) | SearchError::Model(_) => 500,
        }
    }

    /// OperationOutcome issue code for this error.
    pub fn outcome_code(&self) -> &'static str {
        match self {
            SearchError::UnknownParameter { .. }
            | SearchError::InvalidValue { .. }
            | SearchError::InvalidModifier { .. }
            | SearchError::Unsupported { .. } => "value",
            SearchError::Storage(_) | SearchError::Model(_) => "exception",
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
