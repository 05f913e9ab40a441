//! Data-access layer: sessions and transactions.
//!
//! [`DataAccess`] owns the client and configuration; every request borrows
//! a [`Session`] from it. A session carries causal consistency and majority
//! read/write concerns, and may hold one open transaction. Sessions are
//! never shared between tasks; batch workers each start their own.

use std::sync::Arc;

use mongodb::options::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern};
use mongodb::{Client, ClientSession, Database};

use crate::error::{StoreError, StoreResult};
use crate::interceptor::InterceptorRegistry;

/// Storage engine configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Default database name when the request does not select one.
    pub default_db_name: String,
    /// Allow requests to select a database via the `Db` header.
    pub enable_multi_db: bool,
    /// Required suffix for selected database names.
    pub db_suffix: String,
    /// Count total results on searches.
    pub count_total_results: bool,
    /// Case-insensitive regex matching for strings and tokens.
    pub enable_ci_searches: bool,
    /// Exact matching for token parameters.
    pub token_parameters_case_sensitive: bool,
    /// Keep previous versions and tombstones.
    pub enable_history: bool,
    /// Read-only mode (enables the count cache).
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            default_db_name: "fhir".to_string(),
            enable_multi_db: false,
            db_suffix: "_fhir".to_string(),
            count_total_results: true,
            enable_ci_searches: true,
            token_parameters_case_sensitive: false,
            enable_history: true,
            read_only: false,
        }
    }
}

/// The storage engine handle shared across requests.
#[derive(Clone)]
pub struct DataAccess {
    client: Client,
    config: Arc<StoreConfig>,
    interceptors: Arc<InterceptorRegistry>,
}

impl DataAccess {
    pub fn new(client: Client, config: StoreConfig, interceptors: InterceptorRegistry) -> Self {
        DataAccess {
            client,
            config: Arc::new(config),
            interceptors: Arc::new(interceptors),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Resolves the database for a request, honouring the multi-database
    /// header when enabled.
    pub fn database(&self, custom_db_name: &str) -> StoreResult<Database> {
        let name = if self.config.enable_multi_db && !custom_db_name.is_empty() {
            if !self.config.db_suffix.is_empty() && !custom_db_name.ends_with(&self.config.db_suffix)
            {
                return Err(StoreError::InvalidDatabase {
                    name: custom_db_name.to_string(),
                });
            }
            custom_db_name
        } else {
            &self.config.default_db_name
        };
        Ok(self.client.database(name))
    }

    /// Starts a session with causal consistency and majority concerns.
    pub async fn start_session(&self, custom_db_name: &str) -> StoreResult<Session> {
        let db = self.database(custom_db_name)?;

        let transaction_options = TransactionOptions::builder()
            .read_concern(ReadConcern::majority())
            .write_concern(
                WriteConcern::builder()
                    .w(Acknowledgment::Majority)
                    .journal(true)
                    .build(),
            )
            .build();

        let session = self
            .client
            .start_session()
            .causal_consistency(true)
            .default_transaction_options(transaction_options)
            .await?;

        Ok(Session {
            session,
            db,
            in_transaction: false,
            config: self.config.clone(),
            interceptors: self.interceptors.clone(),
        })
    }
}

/// One request's database session, possibly holding a transaction.
pub struct Session {
    pub(crate) session: ClientSession,
    pub(crate) db: Database,
    pub(crate) in_transaction: bool,
    pub(crate) config: Arc<StoreConfig>,
    pub(crate) interceptors: Arc<InterceptorRegistry>,
}

impl Session {
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Begins a transaction; succeeds silently when one is already open.
    pub async fn start_transaction(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            return Ok(());
        }
        self.session.start_transaction().await?;
        tracing::debug!("transaction started");
        self.in_transaction = true;
        Ok(())
    }

    /// Commits the open transaction, if any.
    pub async fn commit_if_transaction(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            tracing::debug!("committing transaction");
            self.session.commit_transaction().await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Ends the session, aborting any transaction still open. An abort that
    /// reports `NoSuchTransaction` is benign: after any error inside a
    /// transaction the server has already aborted it.
    pub async fn finish(mut self) {
        if self.in_transaction {
            match self.session.abort_transaction().await {
                Ok(()) => {
                    tracing::warn!("open transaction aborted by Session::finish");
                }
                Err(err) if is_benign_abort_failure(&err) => {
                    tracing::debug!(error = %err, "ignoring abort failure in Session::finish");
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to abort transaction in Session::finish");
                }
            }
        }
        // the driver returns the session to its pool on drop
    }
}

fn is_benign_abort_failure(err: &mongodb::error::Error) -> bool {
    use mongodb::error::ErrorKind;
    match &*err.kind {
        ErrorKind::Command(command) => {
            command.code_name == "NoSuchTransaction"
                || command.code_name == "OperationNotSupportedInTransaction"
        }
        _ => false,
    }
}
