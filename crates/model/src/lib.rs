//! Resource model and canonical codec for the Meridian FHIR server.
//!
//! This crate owns the faithful round trip between externally-authoritative
//! FHIR JSON and the internal MongoDB document form:
//!
//! - [`registry`] - the static path-to-type table consulted on every descent
//! - [`walk`] - visitor-driven traversal classifying each leaf
//! - [`ingest`] / [`egress`] - the two codec directions
//! - [`resource`] - the envelope carried through storage, search and REST
//! - [`bundle`] - shallow bundle scaffolding for transactions and searches
//! - [`crypt`] - optional AES-GCM encryption of Patient details
//!
//! Round trip is lossless for every FHIR primitive, including
//! arbitrary-precision decimals and partial-precision dates.

pub mod bundle;
pub mod crypt;
pub mod egress;
pub mod error;
pub mod ingest;
pub mod literal;
pub mod outcome;
pub mod position;
pub mod registry;
pub mod resource;
pub mod walk;

pub use bundle::{BundleLink, EntryRequest, EntryResponse, EntrySearch, ShallowBundle, ShallowBundleEntry};
pub use crypt::WhatToEncrypt;
pub use error::{ModelError, ModelResult};
pub use ingest::ReferenceMap;
pub use resource::Resource;
