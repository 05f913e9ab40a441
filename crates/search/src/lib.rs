//! FHIR search compiler and executor for the Meridian FHIR server.
//!
//! Translates the FHIR search grammar (typed parameters, modifiers,
//! chained and reverse-chained joins, prefix-based range operators,
//! includes) into MongoDB filter documents or aggregation pipelines, and
//! runs them over a session.

pub mod compiler;
pub mod error;
pub mod executor;
pub mod params;
pub mod query;

pub use compiler::{BsonQuery, CompilerConfig, QueryCompiler};
pub use error::{SearchError, SearchResult};
pub use executor::{flush_count_cache, MongoSearcher, SearchConfig, COUNT_CACHE_COLLECTION};
pub use query::{IncludeDirective, ParamInstance, ParsedQuery, Query, QueryOptions, QueryParams, SortDirective};
