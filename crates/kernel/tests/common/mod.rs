//! Shared test infrastructure for kernel integration tests.
//!
//! Builds a small solar catalog in memory and wraps the real kernel router,
//! so the tests run without PostgreSQL.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
use voltcart_kernel::catalog::{
    CatalogFixtures, CatalogService, MemoryProductStore, ProductStore, ReadPolicy, SchemaRegistry,
};
use voltcart_kernel::routes;
use voltcart_kernel::state::AppState;
use voltcart_test_utils::{catalog_fixtures, test_brand, test_category, test_product};

/// Ids of the seeded catalog entities.
pub struct SolarCatalog {
    pub solar_panels: Uuid,
    pub inverters: Uuid,
    pub jinko: Uuid,
    pub longi: Uuid,
    pub growatt: Uuid,
    pub fixtures: Value,
}

/// Five panels (250 W to 500 W, priced 100 to 500) and one inverter.
///
/// | wattage | price | brand | cell type       | created |
/// |---------|-------|-------|-----------------|---------|
/// | 250     | 100   | jinko | Polycrystalline | 1       |
/// | 300     | 200   | longi | Monocrystalline | 2       |
/// | 350     | 300   | jinko | Monocrystalline | 3       |
/// | 400     | 400   | longi | Monocrystalline | 4       |
/// | 500     | 500   | jinko | Monocrystalline | 5       |
pub fn solar_catalog() -> SolarCatalog {
    let solar_panels = Uuid::now_v7();
    let inverters = Uuid::now_v7();
    let jinko = Uuid::now_v7();
    let longi = Uuid::now_v7();
    let growatt = Uuid::now_v7();

    let panel = |name: &str, price: f64, watts: i64, brand: Uuid, cell: &str, created: i64| {
        test_product(name, price)
            .in_category(solar_panels)
            .with_brand(brand)
            .created_at(created)
            .with_tag("solar")
            .with_spec_unit("Wattage", json!(watts), "W")
            .with_spec("Cell Type", json!(cell))
    };

    let products = vec![
        panel("Jinko Cheetah 250W Panel", 100.0, 250, jinko, "Polycrystalline", 1).with_rating(4.0),
        panel("LONGi Hi-MO 300W Panel", 200.0, 300, longi, "Monocrystalline", 2)
            .with_rating(4.5)
            .with_tag("PERC"),
        panel("Jinko Tiger 350W Panel", 300.0, 350, jinko, "Monocrystalline", 3).with_rating(3.5),
        panel("LONGi Hi-MO 400W Panel", 400.0, 400, longi, "Monocrystalline", 4)
            .with_rating(5.0)
            .featured(),
        panel("Jinko Tiger Neo 500W Panel", 500.0, 500, jinko, "Monocrystalline", 5)
            .with_rating(4.8),
        test_product("Growatt SPH 5000", 900.0)
            .in_category(inverters)
            .with_brand(growatt)
            .created_at(6)
            .with_tag("Hybrid")
            .with_spec_unit("Rated Power", json!(5), "kW")
            .with_spec("Inverter Type", json!("Hybrid")),
    ];

    let fixtures = catalog_fixtures(
        vec![
            test_category(solar_panels, "solar-panels", "Solar Panels"),
            test_category(inverters, "inverters", "Inverters"),
        ],
        vec![
            test_brand(jinko, "jinko", "Jinko Solar"),
            test_brand(longi, "longi", "LONGi Solar"),
            growatt_brand(growatt),
        ],
        &products,
    );

    SolarCatalog {
        solar_panels,
        inverters,
        jinko,
        longi,
        growatt,
        fixtures,
    }
}

fn growatt_brand(id: Uuid) -> Value {
    let mut brand = test_brand(id, "growatt", "Growatt");
    brand["logo"] = json!("/images/brands/growatt.png");
    brand
}

/// In-memory store over a fixture document.
pub fn memory_store(fixtures: Value) -> MemoryProductStore {
    let fixtures: CatalogFixtures =
        serde_json::from_value(fixtures).expect("fixture document must deserialize");
    MemoryProductStore::new(fixtures)
}

/// Catalog service over `store` with the built-in filter schemas.
pub fn catalog_service(store: Arc<dyn ProductStore>, policy: ReadPolicy) -> CatalogService {
    let schemas = SchemaRegistry::builtin().expect("built-in schemas must parse");
    CatalogService::new(Arc::new(schemas), store, policy)
}

/// Test application wrapping the real kernel routes.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    /// App over the given fixture document.
    pub fn with_fixtures(fixtures: Value) -> Self {
        Self::with_store(Arc::new(memory_store(fixtures)), ReadPolicy::default())
    }

    /// App over an arbitrary store.
    pub fn with_store(store: Arc<dyn ProductStore>, policy: ReadPolicy) -> Self {
        let state = AppState::from_catalog(catalog_service(store, policy));
        Self {
            router: routes::router(state),
        }
    }

    /// Send a GET request and decode the JSON body.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri)
            .body(Body::empty())
            .expect("request must build");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("failed to send request");

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(&body);
            panic!("failed to parse JSON: {text}");
        });
        (status, json)
    }
}
