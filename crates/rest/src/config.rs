//! Server configuration.

use url::Url;

use meridian_store::StoreConfig;

/// Configuration for the REST layer, threaded through handlers via the
/// application state.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Full URL for the root of the server; used to build Location headers
    /// and paging links. When empty, URLs are derived from the request's
    /// Host header.
    pub server_url: String,

    /// Default database name.
    pub default_db_name: String,

    /// Allow the `Db` header to select a database.
    pub enable_multi_db: bool,

    /// Required suffix for selected database names.
    pub db_suffix: String,

    /// Count total search results (a performance hit on large data sets).
    pub count_total_results: bool,

    /// Case-insensitive regex matching for string and token searches.
    pub enable_ci_searches: bool,

    /// Exact matching for token parameters.
    pub token_parameters_case_sensitive: bool,

    /// Store previous versions and tombstones.
    pub enable_history: bool,

    /// Concurrent workers for batch bundle execution.
    pub batch_concurrency: usize,

    /// Reject every verb other than GET, HEAD and OPTIONS.
    pub read_only: bool,

    /// Encrypt Patient demographic fields at rest.
    pub encrypt_patient_details: bool,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            server_url: String::new(),
            default_db_name: "fhir".to_string(),
            enable_multi_db: false,
            db_suffix: "_fhir".to_string(),
            count_total_results: true,
            enable_ci_searches: true,
            token_parameters_case_sensitive: false,
            enable_history: true,
            batch_concurrency: 1,
            read_only: false,
            encrypt_patient_details: false,
        }
    }
}

impl RestConfig {
    /// The matching storage-engine configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            default_db_name: self.default_db_name.clone(),
            enable_multi_db: self.enable_multi_db,
            db_suffix: self.db_suffix.clone(),
            count_total_results: self.count_total_results,
            enable_ci_searches: self.enable_ci_searches,
            token_parameters_case_sensitive: self.token_parameters_case_sensitive,
            enable_history: self.enable_history,
            read_only: self.read_only,
        }
    }

    /// Builds an absolute URL under the server root for the given path
    /// segments, carrying the multi-database prefix when one is selected.
    pub fn response_url(&self, request_base: &str, db_header: &str, paths: &[&str]) -> Url {
        let root = if !self.server_url.is_empty() {
            self.server_url.trim_end_matches('/').to_string()
        } else {
            request_base.trim_end_matches('/').to_string()
        };
        let db_prefix = if db_header.is_empty() {
            String::new()
        } else {
            format!("/db/{db_header}")
        };
        let joined = paths.join("/");
        let text = if joined.is_empty() {
            format!("{root}{db_prefix}")
        } else {
            format!("{root}{db_prefix}/{joined}")
        };
        Url::parse(&text)
            .unwrap_or_else(|_| Url::parse("http://localhost/").expect("fallback URL parses"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_url_prefers_configured_root() {
        let config = RestConfig {
            server_url: "https://fhir.example.com/".to_string(),
            ..Default::default()
        };
        let url = config.response_url("http://ignored", "", &["Patient", "42"]);
        assert_eq!(url.as_str(), "https://fhir.example.com/Patient/42");
    }

    #[test]
    fn response_url_carries_db_prefix() {
        let config = RestConfig::default();
        let url = config.response_url("http://localhost:3001", "test4_fhir", &["Patient"]);
        assert_eq!(url.as_str(), "http://localhost:3001/db/test4_fhir/Patient");
    }
}
