//! Catalog query engine.
//!
//! Turns storefront query parameters into validated product queries:
//! - per-category filter schemas
//! - parameter compilation into a predicate tree
//! - sorting, pagination and drop-one-dimension facets
//! - execution against PostgreSQL or an in-memory catalog

pub mod compiler;
pub mod error;
pub mod facets;
pub mod pager;
pub mod query_builder;
pub mod schema;
pub mod service;
pub mod sort;
pub mod store;
pub mod types;

pub use compiler::QueryCompiler;
pub use error::CatalogError;
pub use facets::FacetAggregator;
pub use pager::{PageRequest, Pagination};
pub use schema::{FilterSchema, SchemaRegistry};
pub use service::{
    BrandSummary, CatalogService, CategorySummary, ListProductsResponse, ListRequest, ListScope,
    ProductSummary,
};
pub use sort::{SortResolver, SortToken};
pub use store::{CatalogFixtures, MemoryProductStore, PgProductStore, ProductStore, ReadPolicy};
pub use types::{CompiledQuery, FacetDimension, Facets, Predicate, RawParams};
