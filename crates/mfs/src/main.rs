//! Meridian FHIR Server (MFS)
//!
//! A FHIR STU3 REST server over MongoDB.

use bson::doc;
use clap::Parser;
use mongodb::{Client, Database};
use tracing::info;

use meridian_model::registry::{collection_name, previous_collection_name, RESOURCE_TYPES};
use meridian_rest::{build_router, AppState, RestConfig};
use meridian_store::{DataAccess, InterceptorRegistry};

/// Command-line and environment configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "mfs", about = "Meridian FHIR server", version)]
struct ServerConfig {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0", env = "MFS_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3001, env = "MFS_PORT")]
    port: u16,

    /// MongoDB connection string. Transactions require a replica set.
    #[arg(
        long,
        default_value = "mongodb://localhost:27017/?replicaSet=rs0",
        env = "MFS_MONGODB_URI"
    )]
    mongodb_uri: String,

    /// Default database name.
    #[arg(long, default_value = "fhir", env = "MFS_DATABASE_NAME")]
    database_name: String,

    /// Full URL of the server root, used in Location headers and paging
    /// links. Derived from the request when empty.
    #[arg(long, default_value = "", env = "MFS_SERVER_URL")]
    server_url: String,

    /// Allow the Db header to select a database.
    #[arg(long, env = "MFS_ENABLE_MULTI_DB")]
    enable_multi_db: bool,

    /// Required suffix for selected database names.
    #[arg(long, default_value = "_fhir", env = "MFS_DATABASE_SUFFIX")]
    database_suffix: String,

    /// Disable total counts on searches.
    #[arg(long)]
    disable_total_counts: bool,

    /// Disable case-insensitive regex searches.
    #[arg(long)]
    disable_ci_searches: bool,

    /// Case-sensitive matching for token search parameters.
    #[arg(long)]
    token_parameters_case_sensitive: bool,

    /// Disable previous-version history and tombstones.
    #[arg(long)]
    disable_history: bool,

    /// Concurrent workers for batch bundles.
    #[arg(long, default_value_t = 1, env = "MFS_BATCH_CONCURRENCY")]
    batch_concurrency: usize,

    /// Reject every verb other than GET, HEAD and OPTIONS.
    #[arg(long, env = "MFS_READ_ONLY")]
    read_only: bool,

    /// Encrypt Patient demographic fields at rest (requires
    /// ENCRYPTION_KEY_BASE64 and ENCRYPTION_KEY_ID).
    #[arg(long, env = "MFS_ENCRYPT_PATIENT_DETAILS")]
    encrypt_patient_details: bool,

    /// Log filter, e.g. "info" or "meridian=debug".
    #[arg(long, default_value = "info", env = "MFS_LOG")]
    log: String,
}

impl ServerConfig {
    fn rest_config(&self) -> RestConfig {
        RestConfig {
            server_url: self.server_url.clone(),
            default_db_name: self.database_name.clone(),
            enable_multi_db: self.enable_multi_db,
            db_suffix: self.database_suffix.clone(),
            count_total_results: !self.disable_total_counts,
            enable_ci_searches: !self.disable_ci_searches,
            token_parameters_case_sensitive: self.token_parameters_case_sensitive,
            enable_history: !self.disable_history,
            batch_concurrency: self.batch_concurrency.max(1),
            read_only: self.read_only,
            encrypt_patient_details: self.encrypt_patient_details,
        }
    }
}

fn init_logging(filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

/// Pre-creates the current and previous collections for every supported
/// resource type (multi-document transactions cannot create collections),
/// plus the count cache.
async fn precreate_collections(db: &Database) -> anyhow::Result<()> {
    let existing: Vec<String> = db.list_collection_names().await?;

    let mut wanted: Vec<String> = Vec::with_capacity(RESOURCE_TYPES.len() * 2 + 1);
    for resource_type in RESOURCE_TYPES {
        wanted.push(collection_name(resource_type));
        wanted.push(previous_collection_name(resource_type));
    }
    wanted.push(meridian_search::COUNT_CACHE_COLLECTION.to_string());

    for name in wanted {
        if existing.iter().any(|c| *c == name) {
            continue;
        }
        info!(collection = %name, "pre-creating collection");
        if let Err(err) = db.run_command(doc! {"create": name.as_str()}).await {
            if !err.to_string().contains("already exists") {
                return Err(err.into());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log);

    info!(
        host = %config.host,
        port = config.port,
        database = %config.database_name,
        read_only = config.read_only,
        history = !config.disable_history,
        "starting Meridian FHIR server"
    );

    let client = Client::with_uri_str(&config.mongodb_uri).await?;
    let db = client.database(&config.database_name);

    precreate_collections(&db).await?;

    if !config.read_only {
        // cached totals may be stale after offline writes
        meridian_search::flush_count_cache(&db).await?;
        info!("count cache flushed");
    }

    let rest_config = config.rest_config();
    let dal = DataAccess::new(client, rest_config.store_config(), InterceptorRegistry::new());
    let app = build_router(AppState::new(dal, rest_config));

    let addr = format!("{}:{}", config.host, config.port);
    info!(address = %addr, "server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
