//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::{
    CatalogService, MemoryProductStore, PgProductStore, ProductStore, ReadPolicy, SchemaRegistry,
};
use crate::config::{Config, StoreBackend};
use crate::db;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Product listing service.
    catalog: CatalogService,
}

impl AppState {
    /// Create application state from configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let schemas = match &config.filter_schema_path {
            Some(path) => SchemaRegistry::load(path)?,
            None => {
                let registry = SchemaRegistry::builtin()?;
                info!(categories = registry.len(), "using built-in filter schemas");
                registry
            }
        };

        let store: Arc<dyn ProductStore> = match &config.store {
            StoreBackend::Postgres { database_url } => {
                let pool = db::create_pool(database_url, config.database_max_connections)
                    .await
                    .context("failed to create database pool")?;
                info!("connected to PostgreSQL");
                Arc::new(PgProductStore::new(pool, config.query_timeout))
            }
            StoreBackend::Fixtures(path) => Arc::new(MemoryProductStore::from_fixture_file(path)?),
        };

        let catalog = CatalogService::new(
            Arc::new(schemas),
            store,
            ReadPolicy::with_timeout(config.query_timeout),
        );

        Ok(Self::from_catalog(catalog))
    }

    /// Wrap an already-built catalog service.
    pub fn from_catalog(catalog: CatalogService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { catalog }),
        }
    }

    /// Get the catalog service.
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Check if the product store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.inner.catalog.store_healthy().await
    }
}
