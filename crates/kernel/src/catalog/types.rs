//! Catalog query types.
//!
//! Provides the shared vocabulary of the filter engine:
//! - RawParams: loosely-typed query parameters from the storefront
//! - Predicate / CompiledQuery: the validated expression tree
//! - OrderSpec: resolved sort order
//! - FacetValue / Facets: filter metadata for the UI

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::{FilterSchema, PriceRange};
use crate::models::product::spec_key;

// -------------------------------------------------------------------------
// Raw parameters
// -------------------------------------------------------------------------

/// A single query parameter value, possibly repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

/// Query parameters keyed by name.
///
/// Empty strings mean "filter absent": they are skipped by every accessor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawParams(BTreeMap<String, ParamValue>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs. Repeated keys become multi-valued.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.append(key, value);
        }
        params
    }

    /// Add a value, turning the key multi-valued if it already exists.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let next = match self.0.remove(&key) {
            Some(ParamValue::One(existing)) => ParamValue::Many(vec![existing, value]),
            Some(ParamValue::Many(mut existing)) => {
                existing.push(value);
                ParamValue::Many(existing)
            }
            None => ParamValue::One(value),
        };
        self.0.insert(key, next);
    }

    /// Replace any existing value(s) for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), ParamValue::One(value.into()));
    }

    /// Non-empty values for `key`.
    pub fn values(&self, key: &str) -> Vec<&str> {
        match self.0.get(key) {
            Some(ParamValue::One(v)) => non_empty(std::iter::once(v.as_str())),
            Some(ParamValue::Many(vs)) => non_empty(vs.iter().map(String::as_str)),
            None => Vec::new(),
        }
    }

    /// First non-empty value for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values(key).into_iter().next()
    }

    /// All keys present (including those with only empty values).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

fn non_empty<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    values.filter(|v| !v.trim().is_empty()).collect()
}

// -------------------------------------------------------------------------
// Predicates
// -------------------------------------------------------------------------

/// Product fields the compiler can constrain directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Category,
    SubCategory,
    Brand,
    Price,
    Rating,
    Featured,
    BestSeller,
    NewArrival,
}

impl Field {
    /// Column name in the `product` table.
    pub fn column(self) -> &'static str {
        match self {
            Field::Category => "category_id",
            Field::SubCategory => "sub_category_id",
            Field::Brand => "brand_id",
            Field::Price => "price",
            Field::Rating => "rating",
            Field::Featured => "is_featured",
            Field::BestSeller => "is_best_seller",
            Field::NewArrival => "is_new_arrival",
        }
    }
}

/// Scalar operand of an equality or membership predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    /// Resolved reference id.
    Id(Uuid),
    /// Unresolved reference slug; replaced by an id before execution.
    Slug(String),
    Bool(bool),
}

/// `field == value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualityPredicate {
    pub field: Field,
    pub value: Scalar,
}

/// Inclusive numeric range; either bound may be open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangePredicate {
    pub field: Field,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// `field IN values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipPredicate {
    pub field: Field,
    pub values: Vec<Scalar>,
}

/// Case-insensitive substring search over the product's text.
///
/// Covers name, slug, description, tags, key features and
/// specification item values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPredicate {
    pub term: String,
}

/// Condition applied to a single specification item's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecCondition {
    /// Numeric value `>=` bound.
    AtLeast(f64),
    /// Numeric value `<=` bound.
    AtMost(f64),
    /// Text value equals one of these (case-insensitive).
    OneOf(Vec<String>),
}

/// "Some specification item named `spec` satisfies `condition`."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistentialPredicate {
    /// Specification name in [`spec_key`] form.
    pub spec: String,
    pub condition: SpecCondition,
}

/// Node of the compiled expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equality(EqualityPredicate),
    Range(RangePredicate),
    Membership(MembershipPredicate),
    Text(TextPredicate),
    Existential(ExistentialPredicate),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// Matches no product.
    MatchNone,
}

/// Facet dimensions that can be dropped from a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetDimension {
    Brands,
    PriceRange,
    Specification(String),
}

impl Predicate {
    /// Whether any leaf under this node constrains `dimension`.
    pub fn touches(&self, dimension: &FacetDimension) -> bool {
        match self {
            Predicate::Equality(p) => field_dimension(p.field, dimension),
            Predicate::Range(p) => field_dimension(p.field, dimension),
            Predicate::Membership(p) => field_dimension(p.field, dimension),
            Predicate::Existential(p) => match dimension {
                FacetDimension::Specification(name) => p.spec == spec_key(name),
                _ => false,
            },
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().any(|c| c.touches(dimension))
            }
            Predicate::Text(_) | Predicate::MatchNone => false,
        }
    }

    /// Whether this node can never match, without consulting the data.
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Predicate::MatchNone => true,
            Predicate::Membership(p) => p.values.is_empty(),
            Predicate::And(children) => children.iter().any(Predicate::is_unsatisfiable),
            Predicate::Or(children) => children.iter().all(Predicate::is_unsatisfiable),
            _ => false,
        }
    }
}

fn field_dimension(field: Field, dimension: &FacetDimension) -> bool {
    matches!(
        (field, dimension),
        (Field::Brand, FacetDimension::Brands) | (Field::Price, FacetDimension::PriceRange)
    )
}

/// A compiled, validated product query.
///
/// `predicates` is a conjunction: a product must satisfy every entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub predicates: Vec<Predicate>,

    /// Specification keys that the active schema does not declare.
    /// They are still compiled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_filters: Vec<String>,
}

impl CompiledQuery {
    /// The whole query as a single `And` node.
    pub fn root(&self) -> Predicate {
        Predicate::And(self.predicates.clone())
    }

    /// A copy of this query with every conjunct touching `dimension` removed.
    pub fn without(&self, dimension: &FacetDimension) -> CompiledQuery {
        CompiledQuery {
            predicates: self
                .predicates
                .iter()
                .filter(|p| !p.touches(dimension))
                .cloned()
                .collect(),
            unknown_filters: self.unknown_filters.clone(),
        }
    }

    /// Whether the query provably matches nothing.
    pub fn is_unsatisfiable(&self) -> bool {
        self.predicates.iter().any(Predicate::is_unsatisfiable)
    }

    /// Slugs referenced by unresolved category predicates.
    pub fn category_slugs(&self) -> Vec<String> {
        let mut slugs = Vec::new();
        for p in &self.predicates {
            collect_slugs(p, &[Field::Category, Field::SubCategory], &mut slugs);
        }
        slugs.dedup();
        slugs
    }

    /// Slugs referenced by unresolved brand predicates.
    pub fn brand_slugs(&self) -> Vec<String> {
        let mut slugs = Vec::new();
        for p in &self.predicates {
            collect_slugs(p, &[Field::Brand], &mut slugs);
        }
        slugs.sort();
        slugs.dedup();
        slugs
    }

    /// Replace slugs with ids using `lookup`.
    ///
    /// Equality on an unknown slug becomes `MatchNone`; unknown slugs are
    /// dropped from membership sets. An emptied set stays a membership on its
    /// field, so facets can still drop it.
    pub fn resolve_references<F>(&mut self, lookup: F)
    where
        F: Fn(Field, &str) -> Option<Uuid>,
    {
        for p in &mut self.predicates {
            resolve_predicate(p, &lookup);
        }
    }
}

fn collect_slugs(predicate: &Predicate, fields: &[Field], out: &mut Vec<String>) {
    match predicate {
        Predicate::Equality(EqualityPredicate {
            field,
            value: Scalar::Slug(slug),
        }) if fields.contains(field) => out.push(slug.clone()),
        Predicate::Membership(MembershipPredicate { field, values }) if fields.contains(field) => {
            out.extend(values.iter().filter_map(|v| match v {
                Scalar::Slug(s) => Some(s.clone()),
                _ => None,
            }));
        }
        Predicate::And(children) | Predicate::Or(children) => {
            for c in children {
                collect_slugs(c, fields, out);
            }
        }
        _ => {}
    }
}

fn resolve_predicate<F>(predicate: &mut Predicate, lookup: &F)
where
    F: Fn(Field, &str) -> Option<Uuid>,
{
    match predicate {
        Predicate::Equality(EqualityPredicate {
            field,
            value: Scalar::Slug(slug),
        }) => {
            *predicate = match lookup(*field, slug) {
                Some(id) => Predicate::Equality(EqualityPredicate {
                    field: *field,
                    value: Scalar::Id(id),
                }),
                None => Predicate::MatchNone,
            };
        }
        Predicate::Membership(MembershipPredicate { field, values }) => {
            let field = *field;
            let resolved: Vec<Scalar> = values
                .iter()
                .filter_map(|v| match v {
                    Scalar::Slug(slug) => lookup(field, slug).map(Scalar::Id),
                    other => Some(other.clone()),
                })
                .collect();
            *predicate = Predicate::Membership(MembershipPredicate {
                field,
                values: resolved,
            });
        }
        Predicate::And(children) | Predicate::Or(children) => {
            for c in children.iter_mut() {
                resolve_predicate(c, lookup);
            }
        }
        _ => {}
    }
}

// -------------------------------------------------------------------------
// Ordering
// -------------------------------------------------------------------------

/// Sortable product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Price,
    Rating,
    Created,
    ViewCount,
    SoldCount,
    Id,
}

impl SortField {
    /// Column name in the `product` table.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::Rating => "rating",
            SortField::Created => "created",
            SortField::ViewCount => "view_count",
            SortField::SoldCount => "sold_count",
            SortField::Id => "id",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Ordered list of sort keys. Always ends with a unique tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec(pub Vec<SortKey>);

impl OrderSpec {
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }
}

// -------------------------------------------------------------------------
// Facets and responses
// -------------------------------------------------------------------------

/// One selectable facet value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetValue {
    /// Value to send back as a filter parameter.
    pub value: String,
    /// Display label.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Facet metadata for a listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub brands: Vec<FacetValue>,
    pub price_range: Option<PriceRange>,
    pub specifications: BTreeMap<String, Vec<FacetValue>>,
}

/// Filter panel returned with category listings.
#[derive(Debug, Clone, Serialize)]
pub struct FilterPanel {
    pub schema: FilterSchema,
    pub facets: Facets,
}
