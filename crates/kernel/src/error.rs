//! Application error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    kind: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Catalog(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.kind()),
            AppError::Catalog(
                e @ (CatalogError::PersistenceTimeout | CatalogError::PersistenceUnavailable(_)),
            ) => (StatusCode::SERVICE_UNAVAILABLE, e.kind()),
            AppError::Catalog(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind()),
        };

        // Client errors name the field; server errors stay generic.
        let message = if status.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error = ?self, kind, "catalog request failed");
            "the catalog is temporarily unavailable".to_string()
        };

        let body = ErrorBody {
            success: false,
            kind,
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
