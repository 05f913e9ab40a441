//! Versioned MongoDB resource storage for the Meridian FHIR server.
//!
//! Each resource type is stored in two collections: a current collection
//! keyed by resource id and a previous collection keyed vermongo-style by
//! `{_id, _version}`. Updates archive the replaced version; deletes leave a
//! tombstone. All operations run on a per-request [`session::Session`]
//! carrying causal consistency and majority read/write concerns.

pub mod error;
pub mod interceptor;
pub mod ops;
pub mod paging;
pub mod session;

pub use error::{is_duplicate_key, StoreError, StoreResult};
pub use interceptor::{Interceptor, InterceptorHandler, InterceptorRegistry, Op};
pub use ops::{new_resource_id, ConditionalPostResult};
pub use session::{DataAccess, Session, StoreConfig};
