//! Catalog query service.
//!
//! Orchestrates a listing request: schema lookup, compilation, reference
//! resolution, the concurrent count and page fetch, and optional facets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::compiler::QueryCompiler;
use super::error::CatalogError;
use super::facets::FacetAggregator;
use super::pager::{PageRequest, Pagination};
use super::schema::SchemaRegistry;
use super::sort::SortResolver;
use super::store::{ProductStore, ReadPolicy};
use super::types::{CompiledQuery, Field, FilterPanel, RawParams};
use crate::models::{Brand, Category, Product};

/// Which products a listing is restricted to by its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// `/api/products`
    All,
    /// `/api/categories/{slug}/products`
    Category(String),
    /// `/api/brands/{slug}/products`
    Brand(String),
}

/// A product listing request.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub scope: ListScope,
    pub params: RawParams,
    pub include_facets: bool,
}

/// Product card data returned in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    pub discount_percentage: u8,
    pub images: Vec<String>,
    pub rating: f64,
    pub review_count: i64,
    pub in_stock: bool,
    pub is_featured: bool,
    pub is_best_seller: bool,
    pub is_new_arrival: bool,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            slug: product.slug,
            price: product.price,
            original_price: product.original_price,
            discount_percentage: product.discount_percentage,
            images: product.images,
            rating: product.rating,
            review_count: product.review_count,
            in_stock: product.stock > 0,
            is_featured: product.is_featured,
            is_best_seller: product.is_best_seller,
            is_new_arrival: product.is_new_arrival,
        }
    }
}

/// Category named by the request, echoed back for page headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub slug: String,
}

/// Brand named by the URL scope, echoed back for page headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandSummary {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl From<Brand> for BrandSummary {
    fn from(brand: Brand) -> Self {
        Self {
            name: brand.name,
            slug: brand.slug,
            logo: brand.logo,
        }
    }
}

/// Listing response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsResponse {
    pub success: bool,
    pub products: Vec<ProductSummary>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategorySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterPanel>,
}

/// Product listing service.
///
/// Holds only immutable shared state; cheap to clone.
#[derive(Clone)]
pub struct CatalogService {
    schemas: Arc<SchemaRegistry>,
    store: Arc<dyn ProductStore>,
    policy: ReadPolicy,
}

impl CatalogService {
    pub fn new(schemas: Arc<SchemaRegistry>, store: Arc<dyn ProductStore>, policy: ReadPolicy) -> Self {
        Self {
            schemas,
            store,
            policy,
        }
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Whether the backing store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.store.health().await
    }

    /// Name of the backing store.
    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// List products matching `request`.
    ///
    /// Malformed filters fail before the store is touched. An unknown
    /// category or brand yields an empty page, not an error.
    pub async fn list_products(
        &self,
        request: ListRequest,
    ) -> Result<ListProductsResponse, CatalogError> {
        let ListRequest {
            scope,
            mut params,
            include_facets,
        } = request;

        // The URL scope wins over a conflicting query parameter.
        match &scope {
            ListScope::Category(slug) => params.set("category", slug.clone()),
            ListScope::Brand(slug) => params.set("brand", slug.clone()),
            ListScope::All => {}
        }

        let category_slug = params.first("category").map(str::trim);
        let schema = self.schemas.schema_for(category_slug);

        let mut query = QueryCompiler::compile(&params, schema)?;
        let order = SortResolver::resolve(params.first("sort"), schema);
        let page = PageRequest::from_params(params.first("page"), params.first("limit"));

        let (category, brands) = self.resolve_references(&mut query).await?;
        let brand = match &scope {
            ListScope::Brand(slug) => brands
                .into_iter()
                .find(|b| b.slug == slug.trim())
                .map(BrandSummary::from),
            _ => None,
        };

        let (total, products) = if query.is_unsatisfiable() {
            debug!(scope = ?scope, "query matches nothing, skipping store");
            (0, Vec::new())
        } else {
            tokio::try_join!(
                self.policy
                    .run("count_products", || self.store.count_products(&query)),
                self.policy.run("fetch_products", || {
                    self.store.fetch_products(&query, &order, page)
                }),
            )?
        };

        let filters = if include_facets {
            let dimensions = FacetAggregator::dimensions(schema);
            let facets = FacetAggregator::new(self.store.as_ref(), self.policy)
                .facets(&query, schema, &dimensions)
                .await?;
            Some(FilterPanel {
                schema: schema.clone(),
                facets,
            })
        } else {
            None
        };

        let pagination = Pagination::new(page, total);
        debug!(
            scope = ?scope,
            total,
            page = page.page,
            limit = page.limit,
            unknown_filters = ?query.unknown_filters,
            "products listed"
        );

        Ok(ListProductsResponse {
            success: true,
            products: products.into_iter().map(ProductSummary::from).collect(),
            pagination,
            category: category.map(|c| CategorySummary {
                name: c.name,
                slug: c.slug,
            }),
            brand,
            filters,
        })
    }

    /// Replace category and brand slugs with ids.
    ///
    /// Returns the resolved category, if the query names one, and the
    /// resolved brands.
    async fn resolve_references(
        &self,
        query: &mut CompiledQuery,
    ) -> Result<(Option<Category>, Vec<Brand>), CatalogError> {
        let category_slugs = query.category_slugs();
        let brand_slugs = query.brand_slugs();

        let (categories, brands) = tokio::try_join!(
            async {
                let mut found = Vec::with_capacity(category_slugs.len());
                for slug in &category_slugs {
                    let category = self
                        .policy
                        .run("find_category", || self.store.find_category(slug))
                        .await?;
                    found.extend(category);
                }
                Ok::<_, CatalogError>(found)
            },
            async {
                if brand_slugs.is_empty() {
                    return Ok(Vec::new());
                }
                self.policy
                    .run("find_brands", || self.store.find_brands(&brand_slugs))
                    .await
            },
        )?;

        if categories.len() < category_slugs.len() {
            debug!(slugs = ?category_slugs, "category not found or inactive");
        }

        query.resolve_references(|field, slug| match field {
            Field::Category | Field::SubCategory => categories
                .iter()
                .find(|c| c.slug == slug)
                .map(|c| c.id),
            Field::Brand => brands.iter().find(|b| b.slug == slug).map(|b| b.id),
            _ => None,
        });

        Ok((categories.into_iter().next(), brands))
    }
}
