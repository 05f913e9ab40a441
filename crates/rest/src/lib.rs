//! HTTP surface for the Meridian FHIR server.
//!
//! Routes the per-type REST interactions to the storage engine, maps errors
//! to OperationOutcome responses, and processes transaction/batch bundles
//! with temporary-id resolution and write-conflict retries.

pub mod bind;
pub mod bundle_ctrl;
pub mod config;
pub mod controller;
pub mod error;
pub mod mutex;
pub mod router;
pub mod state;

pub use config::RestConfig;
pub use error::{RestError, RestResult};
pub use router::build_router;
pub use state::AppState;
