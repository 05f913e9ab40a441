//! Shared application state.

use std::sync::Arc;

use axum::http::HeaderMap;
use url::Url;

use meridian_store::DataAccess;

use crate::config::RestConfig;
use crate::mutex::MutexBroker;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    dal: DataAccess,
    config: Arc<RestConfig>,
    mutexes: MutexBroker,
}

impl AppState {
    pub fn new(dal: DataAccess, config: RestConfig) -> Self {
        AppState {
            dal,
            config: Arc::new(config),
            mutexes: MutexBroker::spawn(),
        }
    }

    pub fn dal(&self) -> &DataAccess {
        &self.dal
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    pub fn mutexes(&self) -> &MutexBroker {
        &self.mutexes
    }

    /// Root for building response URLs, derived from the request when no
    /// server URL is configured.
    pub fn request_base(&self, headers: &HeaderMap) -> String {
        let scheme = headers
            .get("X-Forwarded-Proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        let host = headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        format!("{scheme}://{host}")
    }

    /// Absolute URL under the server root.
    pub fn response_url(&self, headers: &HeaderMap, db: &str, paths: &[&str]) -> Url {
        self.config
            .response_url(&self.request_base(headers), db, paths)
    }
}
