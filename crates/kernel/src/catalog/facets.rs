//! Facet aggregation.
//!
//! Each facet dimension is computed against the query with that dimension's
//! own predicates removed, so the brand list shows every brand the shopper
//! could switch to, not just the ones already selected.

use std::collections::BTreeMap;

use tracing::debug;

use super::error::CatalogError;
use super::schema::FilterSchema;
use super::store::{ProductStore, ReadPolicy};
use super::types::{CompiledQuery, FacetDimension, FacetValue, Facets};

/// Computes facet metadata for a listing.
pub struct FacetAggregator<'a> {
    store: &'a dyn ProductStore,
    policy: ReadPolicy,
}

impl<'a> FacetAggregator<'a> {
    pub fn new(store: &'a dyn ProductStore, policy: ReadPolicy) -> Self {
        Self { store, policy }
    }

    /// Dimensions offered by `schema`: brands, price, and every select filter.
    pub fn dimensions(schema: &FilterSchema) -> Vec<FacetDimension> {
        let mut dimensions = vec![FacetDimension::Brands, FacetDimension::PriceRange];
        dimensions.extend(
            schema
                .select_filters()
                .map(|f| FacetDimension::Specification(f.key.clone())),
        );
        dimensions
    }

    /// Compute `dimensions` for `query`.
    ///
    /// Brand, price and specification facets run concurrently. Any failure
    /// fails the whole computation; no partial facets are returned.
    pub async fn facets(
        &self,
        query: &CompiledQuery,
        schema: &FilterSchema,
        dimensions: &[FacetDimension],
    ) -> Result<Facets, CatalogError> {
        let wants = |d: &FacetDimension| dimensions.contains(d);
        let specs: Vec<&str> = dimensions
            .iter()
            .filter_map(|d| match d {
                FacetDimension::Specification(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();

        let (brands, price_range, specifications) = tokio::try_join!(
            async {
                if wants(&FacetDimension::Brands) {
                    self.brands(query).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if wants(&FacetDimension::PriceRange) {
                    self.price_range(query, schema).await.map(Some)
                } else {
                    Ok(None)
                }
            },
            self.specifications(query, &specs),
        )?;

        debug!(
            brands = brands.len(),
            specifications = specifications.len(),
            "facets computed"
        );

        Ok(Facets {
            brands,
            price_range,
            specifications,
        })
    }

    async fn brands(&self, query: &CompiledQuery) -> Result<Vec<FacetValue>, CatalogError> {
        let scoped = query.without(&FacetDimension::Brands);
        self.policy
            .run("brand_facets", || self.store.brand_facets(&scoped))
            .await
    }

    async fn price_range(
        &self,
        query: &CompiledQuery,
        schema: &FilterSchema,
    ) -> Result<super::schema::PriceRange, CatalogError> {
        let scoped = query.without(&FacetDimension::PriceRange);
        let bounds = self
            .policy
            .run("price_bounds", || self.store.price_bounds(&scoped))
            .await?;
        Ok(bounds.unwrap_or(schema.price_range))
    }

    async fn specifications(
        &self,
        query: &CompiledQuery,
        specs: &[&str],
    ) -> Result<BTreeMap<String, Vec<FacetValue>>, CatalogError> {
        let mut out = BTreeMap::new();
        for spec in specs {
            let scoped = query.without(&FacetDimension::Specification((*spec).to_string()));
            let values = self
                .policy
                .run("specification_values", || {
                    self.store.specification_values(&scoped, spec)
                })
                .await?;
            out.insert((*spec).to_string(), values);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::schema::{PriceRange, SchemaRegistry};
    use crate::catalog::store::{CatalogFixtures, MemoryProductStore};
    use crate::catalog::types::{Field, MembershipPredicate, Predicate, RangePredicate, Scalar};
    use crate::models::{Brand, Product};
    use uuid::Uuid;

    fn brand(slug: &str, name: &str) -> Brand {
        Brand {
            id: Uuid::now_v7(),
            slug: slug.to_string(),
            name: name.to_string(),
            logo: None,
            is_active: true,
            is_featured: false,
        }
    }

    fn product(brand: &Brand, price: f64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": Uuid::now_v7(),
            "slug": format!("{}-{price}", brand.slug),
            "name": format!("{} {price}", brand.name),
            "category_id": Uuid::nil(),
            "brand_id": brand.id,
            "price": price,
        }))
        .unwrap()
    }

    #[test]
    fn dimensions_include_select_filters() {
        let registry = SchemaRegistry::builtin().unwrap();
        let dims = FacetAggregator::dimensions(registry.schema_for(Some("solar-panels")));
        assert!(dims.contains(&FacetDimension::Brands));
        assert!(dims.contains(&FacetDimension::PriceRange));
        assert!(dims.contains(&FacetDimension::Specification("cell_type".to_string())));
        assert!(!dims.contains(&FacetDimension::Specification("wattage".to_string())));
    }

    #[tokio::test]
    async fn brand_facet_ignores_brand_selection() {
        let jinko = brand("jinko", "Jinko");
        let longi = brand("longi", "LONGi");
        let store = MemoryProductStore::new(CatalogFixtures {
            products: vec![product(&jinko, 100.0), product(&longi, 200.0), product(&longi, 900.0)],
            brands: vec![jinko.clone(), longi.clone()],
            ..Default::default()
        });

        let query = CompiledQuery {
            predicates: vec![
                Predicate::Membership(MembershipPredicate {
                    field: Field::Brand,
                    values: vec![Scalar::Id(jinko.id)],
                }),
                Predicate::Range(RangePredicate {
                    field: Field::Price,
                    min: None,
                    max: Some(500.0),
                }),
            ],
            unknown_filters: vec![],
        };

        let schema = FilterSchema::default();
        let facets = FacetAggregator::new(&store, ReadPolicy::default())
            .facets(&query, &schema, &[FacetDimension::Brands, FacetDimension::PriceRange])
            .await
            .unwrap();

        // Brand facet: price filter applies, brand selection does not.
        let slugs: Vec<&str> = facets.brands.iter().map(|b| b.value.as_str()).collect();
        assert_eq!(slugs, vec!["jinko", "longi"]);
        assert_eq!(facets.brands[1].count, Some(1));

        // Price facet: brand filter applies, price bound does not.
        assert_eq!(
            facets.price_range,
            Some(PriceRange {
                min: 100.0,
                max: 100.0
            })
        );
    }

    #[tokio::test]
    async fn empty_price_facet_uses_schema_range() {
        let store = MemoryProductStore::default();
        let schema = FilterSchema::default();
        let facets = FacetAggregator::new(&store, ReadPolicy::default())
            .facets(&CompiledQuery::default(), &schema, &[FacetDimension::PriceRange])
            .await
            .unwrap();
        assert_eq!(facets.price_range, Some(schema.price_range));
        assert!(facets.brands.is_empty());
    }
}
