//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Where products are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL at `DATABASE_URL`.
    Postgres { database_url: String },
    /// JSON catalog fixtures loaded into memory.
    Fixtures(PathBuf),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Product store backend. `CATALOG_FIXTURES` takes precedence over
    /// `DATABASE_URL`.
    pub store: StoreBackend,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Filter schema YAML; the bundled schemas are used when unset.
    pub filter_schema_path: Option<PathBuf>,

    /// Per-call store time budget (default: 5000 ms).
    pub query_timeout: Duration,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let store = match (env::var("CATALOG_FIXTURES"), env::var("DATABASE_URL")) {
            (Ok(path), _) if !path.trim().is_empty() => StoreBackend::Fixtures(PathBuf::from(path)),
            (_, Ok(database_url)) => StoreBackend::Postgres { database_url },
            _ => bail!("DATABASE_URL environment variable is required unless CATALOG_FIXTURES is set"),
        };

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let filter_schema_path = env::var("FILTER_SCHEMA_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let query_timeout_ms: u64 = env::var("QUERY_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("QUERY_TIMEOUT_MS must be a valid u64")?;
        if query_timeout_ms == 0 {
            bail!("QUERY_TIMEOUT_MS must be greater than zero");
        }

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            store,
            database_max_connections,
            filter_schema_path,
            query_timeout: Duration::from_millis(query_timeout_ms),
            cors_allowed_origins,
        })
    }
}
