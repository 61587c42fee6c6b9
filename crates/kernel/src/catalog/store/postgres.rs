//! PostgreSQL product store.
//!
//! Renders compiled queries with [`ProductQueryBuilder`] and runs them inside
//! a read transaction with a statement timeout. Category and brand lookups go
//! through a short-lived cache since every listing request resolves slugs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use super::ProductStore;
use crate::catalog::error::CatalogError;
use crate::catalog::pager::PageRequest;
use crate::catalog::query_builder::ProductQueryBuilder;
use crate::catalog::schema::PriceRange;
use crate::catalog::types::{CompiledQuery, FacetValue, OrderSpec};
use crate::models::{Brand, Category, Product};

/// Slug lookup cache TTL (60 seconds).
const LOOKUP_TTL_SECS: u64 = 60;

/// Maximum cached slug lookups per kind.
const LOOKUP_MAX_CAPACITY: u64 = 10_000;

/// Product store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgProductStore {
    inner: Arc<PgProductStoreInner>,
}

struct PgProductStoreInner {
    pool: PgPool,

    /// Server-side limit applied to each query transaction.
    statement_timeout: Duration,

    /// Active category by slug; `None` caches a miss.
    categories: Cache<String, Option<Category>>,

    /// Active brand by slug; `None` caches a miss.
    brands: Cache<String, Option<Brand>>,
}

impl PgProductStore {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        let categories = Cache::builder()
            .max_capacity(LOOKUP_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(LOOKUP_TTL_SECS))
            .build();
        let brands = Cache::builder()
            .max_capacity(LOOKUP_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(LOOKUP_TTL_SECS))
            .build();

        Self {
            inner: Arc::new(PgProductStoreInner {
                pool,
                statement_timeout,
                categories,
                brands,
            }),
        }
    }

    /// Begin a read transaction with `SET LOCAL statement_timeout`.
    async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Postgres>, CatalogError> {
        let mut tx = self.inner.pool.begin().await?;

        // SET does not take bind parameters; the value is a plain integer.
        let millis = self.inner.statement_timeout.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL statement_timeout = {millis}"))
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_category(&self, slug: &str) -> Result<Option<Category>, CatalogError> {
        if let Some(cached) = self.inner.categories.get(slug).await {
            debug!(slug = %slug, "category lookup cache hit");
            return Ok(cached);
        }

        let category = Category::find_active_by_slug(&self.inner.pool, slug)
            .await
            .map_err(CatalogError::from_store)?;
        self.inner
            .categories
            .insert(slug.to_string(), category.clone())
            .await;
        Ok(category)
    }

    async fn find_brands(&self, slugs: &[String]) -> Result<Vec<Brand>, CatalogError> {
        let mut found = Vec::with_capacity(slugs.len());
        let mut missing = Vec::new();
        for slug in slugs {
            match self.inner.brands.get(slug).await {
                Some(Some(brand)) => found.push(brand),
                Some(None) => {}
                None => missing.push(slug.clone()),
            }
        }
        if missing.is_empty() {
            return Ok(found);
        }

        let fetched = Brand::find_active_by_slugs(&self.inner.pool, &missing)
            .await
            .map_err(CatalogError::from_store)?;
        for slug in missing {
            let brand = fetched.iter().find(|b| b.slug == slug).cloned();
            self.inner.brands.insert(slug, brand).await;
        }
        found.extend(fetched);
        Ok(found)
    }

    async fn count_products(&self, query: &CompiledQuery) -> Result<u64, CatalogError> {
        let sql = ProductQueryBuilder::new(query).build_count();
        let mut tx = self.begin().await?;
        let total: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn fetch_products(
        &self,
        query: &CompiledQuery,
        order: &OrderSpec,
        page: PageRequest,
    ) -> Result<Vec<Product>, CatalogError> {
        let sql = ProductQueryBuilder::new(query).build(order, page);
        let mut tx = self.begin().await?;
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(&sql).fetch_all(&mut *tx).await?;
        tx.commit().await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| CatalogError::Internal(anyhow::anyhow!("malformed product row: {e}")))
            })
            .collect()
    }

    async fn brand_facets(&self, query: &CompiledQuery) -> Result<Vec<FacetValue>, CatalogError> {
        let sql = ProductQueryBuilder::new(query).build_brand_facets();
        let mut tx = self.begin().await?;
        let rows: Vec<(String, String, i64)> = sqlx::query_as(&sql).fetch_all(&mut *tx).await?;
        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|(slug, name, count)| FacetValue {
                value: slug,
                label: name,
                count: u64::try_from(count).ok(),
            })
            .collect())
    }

    async fn price_bounds(&self, query: &CompiledQuery) -> Result<Option<PriceRange>, CatalogError> {
        let sql = ProductQueryBuilder::new(query).build_price_bounds();
        let mut tx = self.begin().await?;
        let (min, max): (Option<f64>, Option<f64>) =
            sqlx::query_as(&sql).fetch_one(&mut *tx).await?;
        tx.commit().await?;

        Ok(min.zip(max).map(|(min, max)| PriceRange { min, max }))
    }

    async fn specification_values(
        &self,
        query: &CompiledQuery,
        spec: &str,
    ) -> Result<Vec<FacetValue>, CatalogError> {
        let sql = ProductQueryBuilder::new(query).build_spec_values(spec);
        let mut tx = self.begin().await?;
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&mut *tx).await?;
        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|(value, count)| FacetValue {
                label: value.clone(),
                value,
                count: u64::try_from(count).ok(),
            })
            .collect())
    }

    async fn health(&self) -> bool {
        crate::db::check_health(&self.inner.pool).await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
