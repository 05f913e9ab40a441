//! REST error type and OperationOutcome rendering.
//!
//! Storage and search errors map onto HTTP statuses and FHIR issue codes:
//!
//! | Condition | Status | Issue code |
//! |---|---|---|
//! | structural error / wrong resourceType | 400 | structure |
//! | unknown parameter or bad value | 400 | value |
//! | version conflict | 409 | conflict |
//! | multiple conditional matches | 412 | duplicate |
//! | not found | 404 | - |
//! | deleted | 410 | - |
//! | read-only rejection | 405 | - |
//! | anything else | 500 | exception |

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;

use meridian_model::outcome::fatal_outcome;
use meridian_model::ModelError;
use meridian_search::SearchError;
use meridian_store::StoreError;

pub const FHIR_JSON_CONTENT_TYPE: &str = "application/fhir+json; charset=utf-8";

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum RestError {
    /// Malformed body, wrong resourceType, schema violation (400).
    #[error("{0}")]
    Structure(String),

    /// Valid document, invalid content (400).
    #[error("{0}")]
    Value(String),

    /// Bundle-level rule violation (400).
    #[error("{0}")]
    Invariant(String),

    /// Conditional reference with no match (400/404-class).
    #[error("{0}")]
    NotFoundMessage(String),

    /// Conditional operation matched several resources (412).
    #[error("{0}")]
    MultipleMatches(String),

    /// XML requested while disabled (406).
    #[error("XML support is not enabled")]
    NotAcceptable,

    /// Write attempted in read-only mode (405).
    #[error("method not allowed in read-only mode")]
    ReadOnly,

    /// Feature recognised but not implemented (501).
    #[error("{0}")]
    NotImplemented(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// Anything else (500).
    #[error("{0}")]
    Internal(String),
}

impl RestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::Structure(_) | RestError::Value(_) | RestError::Invariant(_) => {
                StatusCode::BAD_REQUEST
            }
            RestError::NotFoundMessage(_) => StatusCode::BAD_REQUEST,
            RestError::MultipleMatches(_) => StatusCode::PRECONDITION_FAILED,
            RestError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            RestError::ReadOnly => StatusCode::METHOD_NOT_ALLOWED,
            RestError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            RestError::Store(e) => {
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RestError::Search(e) => {
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RestError::Model(_) => StatusCode::BAD_REQUEST,
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The OperationOutcome body, when this error carries one. 404 and 410
    /// responses are body-less.
    pub fn outcome(&self) -> Option<Value> {
        let (code, diagnostics) = match self {
            RestError::Structure(m) => ("structure", m.clone()),
            RestError::Value(m) => ("value", m.clone()),
            RestError::Invariant(m) => ("invariant", m.clone()),
            RestError::NotFoundMessage(m) => ("not-found", m.clone()),
            RestError::MultipleMatches(m) => ("multiple-matches", m.clone()),
            RestError::NotAcceptable | RestError::ReadOnly => return None,
            RestError::NotImplemented(m) => ("not-supported", m.clone()),
            RestError::Store(StoreError::NotFound) | RestError::Store(StoreError::Deleted) => {
                return None;
            }
            RestError::Store(e) => (e.outcome_code(), e.to_string()),
            RestError::Search(e) => (e.outcome_code(), e.to_string()),
            RestError::Model(e) => ("structure", e.to_string()),
            RestError::Internal(m) => ("exception", m.clone()),
        };
        Some(fatal_outcome(code, &diagnostics))
    }

    /// True when the bundle processor should retry the whole bundle.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            RestError::Store(e) => e.is_write_conflict(),
            RestError::Search(SearchError::Storage(e)) => {
                meridian_store::error::is_driver_write_conflict(e)
            }
            _ => false,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        match self.outcome() {
            Some(outcome) => (
                status,
                [(header::CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE)],
                outcome.to_string(),
            )
                .into_response(),
            None => status.into_response(),
        }
    }
}

pub type RestResult<T> = Result<T, RestError>;
