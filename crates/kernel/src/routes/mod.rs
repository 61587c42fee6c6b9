//! HTTP route handlers.

pub mod health;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// All routes, without middleware layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .with_state(state)
}
