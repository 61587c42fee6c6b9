//! Catalog query errors.

use thiserror::Error;

/// Errors produced while compiling or executing a catalog query.
///
/// An unknown category and a missing filter schema are deliberately absent:
/// both degrade to an empty result or the default schema.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A numeric filter received a value that is not a number.
    #[error("invalid value '{value}' for filter '{field}': expected a number")]
    InvalidFilterValue { field: String, value: String },

    /// A persistence call exceeded its time budget.
    #[error("catalog query timed out")]
    PersistenceTimeout,

    /// The persistence layer could not be reached.
    #[error("catalog store unavailable")]
    PersistenceUnavailable(#[source] anyhow::Error),

    /// Any other failure inside the store.
    #[error("internal catalog error")]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    /// Whether the caller supplied bad input (a 4xx rather than a 5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, CatalogError::InvalidFilterValue { .. })
    }

    /// Whether an idempotent read may be retried after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::PersistenceUnavailable(_))
    }

    /// Stable machine-readable error kind for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::InvalidFilterValue { .. } => "invalid_filter_value",
            CatalogError::PersistenceTimeout => "persistence_timeout",
            CatalogError::PersistenceUnavailable(_) => "persistence_unavailable",
            CatalogError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            CatalogError::PersistenceUnavailable(anyhow::Error::new(err))
        } else {
            CatalogError::Internal(anyhow::Error::new(err))
        }
    }
}

impl CatalogError {
    /// Classify a store error that may wrap a `sqlx::Error` under context.
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast_ref::<sqlx::Error>() {
            Some(inner) if is_connection_error(inner) => CatalogError::PersistenceUnavailable(err),
            _ => CatalogError::Internal(err),
        }
    }
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_client_error() {
        let err = CatalogError::InvalidFilterValue {
            field: "wattage_min".to_string(),
            value: "lots".to_string(),
        };
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "invalid_filter_value");
        assert!(err.to_string().contains("wattage_min"));
    }

    #[test]
    fn unavailable_is_retryable() {
        let err = CatalogError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
        assert!(!err.is_client_error());

        assert!(!CatalogError::PersistenceTimeout.is_retryable());
    }

    #[test]
    fn context_keeps_classification() {
        use anyhow::Context;

        let wrapped = Err::<(), _>(sqlx::Error::PoolClosed)
            .context("failed to fetch category")
            .unwrap_err();
        assert!(CatalogError::from_store(wrapped).is_retryable());

        let plain = anyhow::anyhow!("bad fixture");
        assert_eq!(CatalogError::from_store(plain).kind(), "internal");
    }

    #[test]
    fn row_errors_are_internal() {
        let err = CatalogError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), "internal");
    }
}
