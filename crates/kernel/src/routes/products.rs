//! Product listing routes.
//!
//! Storefront listing endpoints. All of them accept the same filter
//! parameters; the category and brand pages also return the filter panel.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;

use crate::catalog::{ListProductsResponse, ListRequest, ListScope, RawParams};
use crate::error::AppResult;
use crate::state::AppState;

/// Create the product listing router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/categories/{slug}/products", get(category_products))
        .route("/api/brands/{slug}/products", get(brand_products))
}

/// Build raw params from query pairs, accepting `key[]=v` for repeated keys.
fn raw_params(pairs: Vec<(String, String)>) -> RawParams {
    RawParams::from_pairs(pairs.into_iter().map(|(key, value)| {
        let key = key.strip_suffix("[]").map(str::to_string).unwrap_or(key);
        (key, value)
    }))
}

async fn list_products(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<ListProductsResponse>> {
    let response = state
        .catalog()
        .list_products(ListRequest {
            scope: ListScope::All,
            params: raw_params(pairs),
            include_facets: false,
        })
        .await?;
    Ok(Json(response))
}

async fn category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<ListProductsResponse>> {
    let response = state
        .catalog()
        .list_products(ListRequest {
            scope: ListScope::Category(slug),
            params: raw_params(pairs),
            include_facets: true,
        })
        .await?;
    Ok(Json(response))
}

async fn brand_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<ListProductsResponse>> {
    let response = state
        .catalog()
        .list_products(ListRequest {
            scope: ListScope::Brand(slug),
            params: raw_params(pairs),
            include_facets: true,
        })
        .await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_keys_merge() {
        let params = raw_params(vec![
            ("brand[]".to_string(), "jinko".to_string()),
            ("brand".to_string(), "longi".to_string()),
        ]);
        assert_eq!(params.values("brand"), vec!["jinko", "longi"]);
    }
}
