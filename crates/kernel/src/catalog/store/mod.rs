//! Product store backends.
//!
//! Provides the read-only persistence trait the catalog service runs
//! compiled queries against, plus the timeout/retry policy applied to
//! every call.

mod memory;
mod postgres;

pub use memory::{CatalogFixtures, MemoryProductStore};
pub use postgres::PgProductStore;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::error::CatalogError;
use super::pager::PageRequest;
use super::schema::PriceRange;
use super::types::{CompiledQuery, FacetValue, OrderSpec};
use crate::models::{Brand, Category, Product};

/// Read-only product persistence.
///
/// Queries passed in have their category and brand references resolved.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Active category by slug.
    async fn find_category(&self, slug: &str) -> Result<Option<Category>, CatalogError>;

    /// Active brands among `slugs`. Unknown slugs are simply absent.
    async fn find_brands(&self, slugs: &[String]) -> Result<Vec<Brand>, CatalogError>;

    /// Number of products matching `query`.
    async fn count_products(&self, query: &CompiledQuery) -> Result<u64, CatalogError>;

    /// One page of matching products in `order`.
    async fn fetch_products(
        &self,
        query: &CompiledQuery,
        order: &OrderSpec,
        page: PageRequest,
    ) -> Result<Vec<Product>, CatalogError>;

    /// Active brands among matching products, with product counts.
    async fn brand_facets(&self, query: &CompiledQuery) -> Result<Vec<FacetValue>, CatalogError>;

    /// Lowest and highest price among matching products, `None` if none match.
    async fn price_bounds(&self, query: &CompiledQuery) -> Result<Option<PriceRange>, CatalogError>;

    /// Distinct values of specification `spec` among matching products.
    async fn specification_values(
        &self,
        query: &CompiledQuery,
        spec: &str,
    ) -> Result<Vec<FacetValue>, CatalogError>;

    /// Whether the backend is reachable.
    async fn health(&self) -> bool;

    /// Backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}

/// Default per-call time budget.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Time budget and retry policy for idempotent store reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub timeout: Duration,
    /// Extra attempts after a retryable failure.
    pub retries: u32,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_QUERY_TIMEOUT,
            retries: 1,
        }
    }
}

impl ReadPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Run `call` under the time budget.
    ///
    /// A timeout fails immediately with [`CatalogError::PersistenceTimeout`].
    /// Retryable errors are retried up to `retries` times.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let mut attempt = 0;
        loop {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(operation, attempt, error = %e, "catalog read failed, retrying");
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        operation,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "catalog read timed out"
                    );
                    return Err(CatalogError::PersistenceTimeout);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> CatalogError {
        CatalogError::PersistenceUnavailable(anyhow::anyhow!("connection refused"))
    }

    #[tokio::test]
    async fn retries_unavailable_once() {
        let calls = AtomicU32::new(0);
        let result = ReadPolicy::default()
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(unavailable())
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_one_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = ReadPolicy::default()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;
        assert!(matches!(result, Err(CatalogError::PersistenceUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn internal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = ReadPolicy::default()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CatalogError::Internal(anyhow::anyhow!("bad row")))
            })
            .await;
        assert!(matches!(result, Err(CatalogError::Internal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = ReadPolicy::with_timeout(Duration::from_millis(50))
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(CatalogError::PersistenceTimeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
