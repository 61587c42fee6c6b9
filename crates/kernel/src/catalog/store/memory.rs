//! In-memory product store.
//!
//! Evaluates compiled queries directly against loaded products. Backs the
//! test suite and fixture-driven local runs (`CATALOG_FIXTURES`), and
//! follows the same matching rules as the SQL rendering in
//! [`crate::catalog::query_builder`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::ProductStore;
use crate::catalog::error::CatalogError;
use crate::catalog::pager::PageRequest;
use crate::catalog::schema::PriceRange;
use crate::catalog::types::{
    CompiledQuery, EqualityPredicate, ExistentialPredicate, FacetValue, Field,
    MembershipPredicate, OrderSpec, Predicate, RangePredicate, Scalar, SortDirection, SortField,
    SpecCondition,
};
use crate::models::product::spec_key;
use crate::models::{Brand, Category, Product};

/// Fixture document: the whole catalog in one JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFixtures {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub brands: Vec<Brand>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl CatalogFixtures {
    /// Check the category hierarchy: at most two levels, with each `level`
    /// agreeing with its parent link.
    pub fn validate(&self) -> Result<()> {
        for category in &self.categories {
            ensure!(
                category.level == category.expected_level(),
                "category '{}': level {} does not match its parent link",
                category.slug,
                category.level
            );
            if let Some(parent_id) = category.parent_id {
                let parent = self
                    .categories
                    .iter()
                    .find(|c| c.id == parent_id)
                    .with_context(|| {
                        format!("category '{}': unknown parent {parent_id}", category.slug)
                    })?;
                ensure!(
                    parent.parent_id.is_none(),
                    "category '{}': nested deeper than two levels",
                    category.slug
                );
            }
        }
        Ok(())
    }
}

/// Product store over an immutable in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryProductStore {
    categories: Vec<Category>,
    brands: Vec<Brand>,
    products: Vec<Product>,
}

impl MemoryProductStore {
    pub fn new(fixtures: CatalogFixtures) -> Self {
        Self {
            categories: fixtures.categories,
            brands: fixtures.brands,
            products: fixtures.products,
        }
    }

    /// Load a [`CatalogFixtures`] JSON file.
    pub fn from_fixture_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog fixtures from {}", path.display()))?;
        let fixtures: CatalogFixtures = serde_json::from_str(&content)
            .with_context(|| format!("invalid catalog fixtures in {}", path.display()))?;
        fixtures
            .validate()
            .with_context(|| format!("invalid category tree in {}", path.display()))?;

        info!(
            path = %path.display(),
            products = fixtures.products.len(),
            categories = fixtures.categories.len(),
            brands = fixtures.brands.len(),
            "catalog fixtures loaded"
        );
        Ok(Self::new(fixtures))
    }

    fn matching<'a>(&'a self, query: &'a CompiledQuery) -> impl Iterator<Item = &'a Product> + 'a {
        self.products
            .iter()
            .filter(move |p| query.predicates.iter().all(|pred| matches(pred, p)))
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn find_category(&self, slug: &str) -> Result<Option<Category>, CatalogError> {
        Ok(self
            .categories
            .iter()
            .find(|c| c.is_active && c.slug == slug)
            .cloned())
    }

    async fn find_brands(&self, slugs: &[String]) -> Result<Vec<Brand>, CatalogError> {
        Ok(self
            .brands
            .iter()
            .filter(|b| b.is_active && slugs.contains(&b.slug))
            .cloned()
            .collect())
    }

    async fn count_products(&self, query: &CompiledQuery) -> Result<u64, CatalogError> {
        Ok(self.matching(query).count() as u64)
    }

    async fn fetch_products(
        &self,
        query: &CompiledQuery,
        order: &OrderSpec,
        page: PageRequest,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut rows: Vec<&Product> = self.matching(query).collect();
        rows.sort_by(|a, b| compare(a, b, order));

        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn brand_facets(&self, query: &CompiledQuery) -> Result<Vec<FacetValue>, CatalogError> {
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for product in self.matching(query) {
            if let Some(brand_id) = product.brand_id {
                *counts.entry(brand_id).or_default() += 1;
            }
        }

        let mut brands: Vec<&Brand> = self
            .brands
            .iter()
            .filter(|b| b.is_active && counts.contains_key(&b.id))
            .collect();
        brands.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));

        Ok(brands
            .into_iter()
            .map(|b| FacetValue {
                value: b.slug.clone(),
                label: b.name.clone(),
                count: counts.get(&b.id).copied(),
            })
            .collect())
    }

    async fn price_bounds(&self, query: &CompiledQuery) -> Result<Option<PriceRange>, CatalogError> {
        Ok(self.matching(query).fold(None, |acc, p| match acc {
            None => Some(PriceRange {
                min: p.price,
                max: p.price,
            }),
            Some(range) => Some(PriceRange {
                min: range.min.min(p.price),
                max: range.max.max(p.price),
            }),
        }))
    }

    async fn specification_values(
        &self,
        query: &CompiledQuery,
        spec: &str,
    ) -> Result<Vec<FacetValue>, CatalogError> {
        let spec = spec_key(spec);
        // Keyed by the normalized value the filter matches on; the label is
        // the smallest spelling seen, as `min(trim(...))` picks in SQL.
        let mut counts: BTreeMap<String, (String, u64)> = BTreeMap::new();

        for product in self.matching(query) {
            let values: BTreeSet<(String, String)> = product
                .specification_items()
                .filter(|item| spec_key(&item.name) == spec)
                .map(|item| {
                    let text = item.value.as_text().trim().to_string();
                    (text.to_lowercase(), text)
                })
                .collect();
            let mut counted = BTreeSet::new();
            for (key, text) in values {
                let entry = counts.entry(key.clone()).or_insert_with(|| (text.clone(), 0));
                if text < entry.0 {
                    entry.0 = text;
                }
                if counted.insert(key) {
                    entry.1 += 1;
                }
            }
        }

        Ok(counts
            .into_values()
            .map(|(label, count)| FacetValue {
                value: label.clone(),
                label,
                count: Some(count),
            })
            .collect())
    }

    async fn health(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Whether `product` satisfies `predicate`.
pub(crate) fn matches(predicate: &Predicate, product: &Product) -> bool {
    match predicate {
        Predicate::Equality(p) => equality(p, product),
        Predicate::Range(p) => range(p, product),
        Predicate::Membership(p) => membership(p, product),
        Predicate::Text(p) => text_matches(&p.term, product),
        Predicate::Existential(p) => existential(p, product),
        Predicate::And(children) => children.iter().all(|c| matches(c, product)),
        Predicate::Or(children) => children.iter().any(|c| matches(c, product)),
        Predicate::MatchNone => false,
    }
}

fn reference(field: Field, product: &Product) -> Option<Uuid> {
    match field {
        Field::Category => Some(product.category_id),
        Field::SubCategory => product.sub_category_id,
        Field::Brand => product.brand_id,
        _ => None,
    }
}

fn flag(field: Field, product: &Product) -> Option<bool> {
    match field {
        Field::Featured => Some(product.is_featured),
        Field::BestSeller => Some(product.is_best_seller),
        Field::NewArrival => Some(product.is_new_arrival),
        _ => None,
    }
}

fn equality(p: &EqualityPredicate, product: &Product) -> bool {
    match &p.value {
        Scalar::Id(id) => reference(p.field, product) == Some(*id),
        Scalar::Bool(b) => flag(p.field, product) == Some(*b),
        // Unresolved slugs never match.
        Scalar::Slug(_) => false,
    }
}

fn range(p: &RangePredicate, product: &Product) -> bool {
    let value = match p.field {
        Field::Price => product.price,
        Field::Rating => product.rating,
        _ => return false,
    };
    p.min.is_none_or(|min| value >= min) && p.max.is_none_or(|max| value <= max)
}

fn membership(p: &MembershipPredicate, product: &Product) -> bool {
    let Some(id) = reference(p.field, product) else {
        return false;
    };
    p.values.iter().any(|v| matches!(v, Scalar::Id(candidate) if *candidate == id))
}

fn text_matches(term: &str, product: &Product) -> bool {
    let needle = term.to_lowercase();
    let hit = |haystack: &str| haystack.to_lowercase().contains(&needle);

    hit(&product.name)
        || hit(&product.slug)
        || product.description.as_deref().is_some_and(hit)
        || product.tags.iter().any(|t| hit(t))
        || product.key_features.iter().any(|f| hit(f))
        || product
            .specification_items()
            .any(|item| hit(&item.value.as_text()))
}

fn existential(p: &ExistentialPredicate, product: &Product) -> bool {
    product
        .specification_items()
        .filter(|item| spec_key(&item.name) == p.spec)
        .any(|item| match &p.condition {
            SpecCondition::AtLeast(bound) => item.value.as_number().is_some_and(|n| n >= *bound),
            SpecCondition::AtMost(bound) => item.value.as_number().is_some_and(|n| n <= *bound),
            SpecCondition::OneOf(options) => {
                let text = item.value.as_text().trim().to_lowercase();
                options.iter().any(|o| o.to_lowercase() == text)
            }
        })
}

fn compare(a: &Product, b: &Product, order: &OrderSpec) -> Ordering {
    for key in order.keys() {
        let ordering = match key.field {
            SortField::Price => a.price.total_cmp(&b.price),
            SortField::Rating => a.rating.total_cmp(&b.rating),
            SortField::Created => a.created.cmp(&b.created),
            SortField::ViewCount => a.view_count.cmp(&b.view_count),
            SortField::SoldCount => a.sold_count.cmp(&b.sold_count),
            SortField::Id => a.id.cmp(&b.id),
        };
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
