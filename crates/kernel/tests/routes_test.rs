#![allow(clippy::unwrap_used, clippy::expect_used)]
//! HTTP integration tests for the storefront listing routes.
//!
//! Drives the real router with `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{TestApp, solar_catalog};
use voltcart_kernel::catalog::{
    CatalogError, CompiledQuery, PageRequest, ProductStore, ReadPolicy,
};
use voltcart_kernel::catalog::schema::PriceRange;
use voltcart_kernel::catalog::types::{FacetValue, OrderSpec};
use voltcart_kernel::models::{Brand, Category, Product};
use voltcart_test_utils::{assert, catalog_fixtures, test_product};

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn category_listing_with_filters() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app
        .get("/api/categories/solar-panels/products?wattage_min=300&sort=price_asc&page=1&limit=2")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(assert::prices(&body), vec![200.0, 300.0]);
    assert::pagination(&body, 4, 2, true, false);
    assert_eq!(body["category"]["slug"], "solar-panels");
    assert_eq!(body["category"]["name"], "Solar Panels");
}

#[tokio::test]
async fn category_listing_returns_filter_panel() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app.get("/api/categories/solar-panels/products?brand=jinko").await;

    assert_eq!(status, StatusCode::OK);
    assert::has_key(&body, "filters");

    let schema = &body["filters"]["schema"];
    assert_eq!(schema["filters"][0]["key"], "wattage");
    assert_eq!(schema["price_range"]["max"], 2000.0);

    let facets = &body["filters"]["facets"];
    assert_eq!(facets["brands"][0]["value"], "jinko");
    assert_eq!(facets["brands"][0]["count"], 3);
    assert_eq!(facets["brands"][1]["value"], "longi");
    assert_eq!(facets["brands"][1]["count"], 2);
    assert_eq!(facets["priceRange"]["min"], 100.0);
    assert_eq!(facets["priceRange"]["max"], 500.0);
}

#[tokio::test]
async fn product_summaries_use_camel_case() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (_, body) = app.get("/api/products?isFeatured=true").await;

    let product = &body["products"][0];
    assert_eq!(product["slug"], "longi-hi-mo-400w-panel");
    assert_eq!(product["isFeatured"], true);
    assert_eq!(product["inStock"], true);
    assert_eq!(product["discountPercentage"], 0);
    assert!(product.get("originalPrice").is_none());
}

#[tokio::test]
async fn plain_listing_has_no_filter_panel() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app.get("/api/products").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("filters").is_none());
    assert!(body.get("category").is_none());
    assert::pagination(&body, 6, 1, false, false);
}

#[tokio::test]
async fn brand_listing_scopes_by_path() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app.get("/api/brands/growatt/products?brand=jinko").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(assert::slugs(&body), vec!["growatt-sph-5000"]);
    assert_eq!(body["brand"]["slug"], "growatt");
    assert_eq!(body["brand"]["name"], "Growatt");
    assert_eq!(body["brand"]["logo"], "/images/brands/growatt.png");
    assert!(body.get("category").is_none());
}

#[tokio::test]
async fn category_listing_has_no_brand_header() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (_, body) = app.get("/api/categories/solar-panels/products?brand=jinko").await;
    assert!(body.get("brand").is_none());
}

#[tokio::test]
async fn repeated_and_bracketed_brand_keys() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (_, body) = app
        .get("/api/products?brand%5B%5D=growatt&brand%5B%5D=longi&sort=price_asc")
        .await;

    assert_eq!(assert::prices(&body), vec![200.0, 400.0, 900.0]);
}

#[tokio::test]
async fn unknown_category_is_an_empty_page() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app.get("/api/categories/wind-turbines/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(assert::slugs(&body).is_empty());
    assert::pagination(&body, 0, 0, false, false);
    assert!(body.get("category").is_none());
    assert_eq!(body["filters"]["facets"]["priceRange"]["max"], 100000.0);
}

#[tokio::test]
async fn empty_parameters_are_no_ops() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app
        .get("/api/products?brand=&price_min=&rating_min=&search=&sort=")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 6);
}

#[tokio::test]
async fn limit_is_capped_and_bad_page_defaults() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (_, body) = app.get("/api/products?limit=500&page=zero").await;

    assert_eq!(body["pagination"]["limit"], 100);
    assert_eq!(body["pagination"]["page"], 1);
}

#[tokio::test]
async fn ties_break_on_id_across_pages() {
    let products: Vec<_> = (0..5)
        .map(|i| test_product(&format!("Same Price {i}"), 99.0))
        .collect();
    let mut expected: Vec<String> = products.iter().map(|p| p.id.to_string()).collect();
    expected.sort();

    let app = TestApp::with_fixtures(catalog_fixtures(vec![], vec![], &products));

    let mut seen = Vec::new();
    for page in 1..=3 {
        let (_, body) = app
            .get(&format!("/api/products?sort=price_asc&limit=2&page={page}"))
            .await;
        for product in body["products"].as_array().unwrap() {
            seen.push(product["id"].as_str().unwrap().to_string());
        }
    }

    assert_eq!(seen, expected);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn invalid_number_is_bad_request() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app.get("/api/products?price_min=cheap").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "invalid_filter_value");
    assert!(body["message"].as_str().unwrap().contains("price_min"));
}

/// Store whose every read fails or stalls.
struct BrokenStore {
    calls: AtomicU32,
    stall: bool,
}

impl BrokenStore {
    fn unavailable() -> Self {
        Self {
            calls: AtomicU32::new(0),
            stall: false,
        }
    }

    fn stalled() -> Self {
        Self {
            calls: AtomicU32::new(0),
            stall: true,
        }
    }

    async fn fail<T>(&self) -> Result<T, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Err(CatalogError::PersistenceUnavailable(anyhow::anyhow!(
            "connection refused"
        )))
    }
}

#[async_trait]
impl ProductStore for BrokenStore {
    async fn find_category(&self, _slug: &str) -> Result<Option<Category>, CatalogError> {
        self.fail().await
    }

    async fn find_brands(&self, _slugs: &[String]) -> Result<Vec<Brand>, CatalogError> {
        self.fail().await
    }

    async fn count_products(&self, _query: &CompiledQuery) -> Result<u64, CatalogError> {
        self.fail().await
    }

    async fn fetch_products(
        &self,
        _query: &CompiledQuery,
        _order: &OrderSpec,
        _page: PageRequest,
    ) -> Result<Vec<Product>, CatalogError> {
        self.fail().await
    }

    async fn brand_facets(&self, _query: &CompiledQuery) -> Result<Vec<FacetValue>, CatalogError> {
        self.fail().await
    }

    async fn price_bounds(
        &self,
        _query: &CompiledQuery,
    ) -> Result<Option<PriceRange>, CatalogError> {
        self.fail().await
    }

    async fn specification_values(
        &self,
        _query: &CompiledQuery,
        _spec: &str,
    ) -> Result<Vec<FacetValue>, CatalogError> {
        self.fail().await
    }

    async fn health(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn unavailable_store_is_service_unavailable() {
    let store = Arc::new(BrokenStore::unavailable());
    let app = TestApp::with_store(store.clone(), ReadPolicy::default());

    let (status, body) = app.get("/api/products?search=panel").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "persistence_unavailable");
    assert_eq!(body["message"], "the catalog is temporarily unavailable");
    // The failing read was retried once before giving up.
    assert!(store.calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_store_times_out() {
    let store = Arc::new(BrokenStore::stalled());
    let policy = ReadPolicy::with_timeout(Duration::from_millis(50));
    let app = TestApp::with_store(store.clone(), policy);

    let (status, body) = app.get("/api/products").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "persistence_timeout");
}

#[tokio::test]
async fn malformed_filters_never_reach_the_store() {
    let store = Arc::new(BrokenStore::unavailable());
    let app = TestApp::with_store(store.clone(), ReadPolicy::default());

    let (status, _) = app.get("/api/products?rating_max=high").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_memory_store() {
    let app = TestApp::with_fixtures(solar_catalog().fixtures);
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["store_healthy"], true);
    assert_eq!(body["filter_schemas"], 3);
}

#[tokio::test]
async fn health_reports_unreachable_store() {
    let app = TestApp::with_store(Arc::new(BrokenStore::unavailable()), ReadPolicy::default());
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["store"], "broken");
}
