//! Query compiler: raw storefront parameters to a [`CompiledQuery`].
//!
//! Compilation is pure and synchronous, so malformed input is rejected
//! before any persistence call. Category and brand slugs stay unresolved
//! (`Scalar::Slug`) until the service looks them up.

use tracing::debug;
use uuid::Uuid;

use super::error::CatalogError;
use super::schema::FilterSchema;
use super::types::{
    CompiledQuery, EqualityPredicate, ExistentialPredicate, Field, MembershipPredicate,
    Predicate, RangePredicate, RawParams, Scalar, SpecCondition, TextPredicate,
};
use crate::models::product::{parse_decimal, spec_key};

/// Parameter names with fixed meaning. Everything else is a specification filter.
pub const RESERVED_PARAMS: &[&str] = &[
    "category",
    "brand",
    "price_min",
    "price_max",
    "rating_min",
    "rating_max",
    "isFeatured",
    "isBestSeller",
    "isNewArrival",
    "search",
    "sort",
    "page",
    "limit",
];

/// Whether `key` is a reserved parameter name.
pub fn is_reserved_param(key: &str) -> bool {
    RESERVED_PARAMS.contains(&key)
}

/// Compiles raw parameters into predicates.
pub struct QueryCompiler;

impl QueryCompiler {
    /// Compile `params` against the active category's `schema`.
    ///
    /// Every emitted leaf is a separate conjunct. Empty values never emit a
    /// predicate. Fails with [`CatalogError::InvalidFilterValue`] when a
    /// numeric bound is not a number.
    pub fn compile(params: &RawParams, schema: &FilterSchema) -> Result<CompiledQuery, CatalogError> {
        let mut query = CompiledQuery::default();

        Self::compile_reserved(params, &mut query.predicates)?;

        for key in params.keys().filter(|k| !is_reserved_param(k)) {
            let values = params.values(key);
            if values.is_empty() {
                continue;
            }

            let (field, condition) = match split_bound(key) {
                Some((field, Bound::Min)) => {
                    (field, SpecCondition::AtLeast(parse_number(key, &values)?))
                }
                Some((field, Bound::Max)) => {
                    (field, SpecCondition::AtMost(parse_number(key, &values)?))
                }
                None => (
                    key,
                    SpecCondition::OneOf(values.iter().map(|v| v.trim().to_lowercase()).collect()),
                ),
            };

            let spec = spec_key(field);
            if spec.is_empty() {
                debug!(param = %key, "ignoring specification filter with empty name");
                continue;
            }
            if schema.filter(&spec).is_none() && !query.unknown_filters.contains(&spec) {
                debug!(param = %key, spec = %spec, "specification filter not declared in schema");
                query.unknown_filters.push(spec.clone());
            }

            query
                .predicates
                .push(Predicate::Existential(ExistentialPredicate { spec, condition }));
        }

        Ok(query)
    }

    fn compile_reserved(params: &RawParams, out: &mut Vec<Predicate>) -> Result<(), CatalogError> {
        if let Some(slug) = params.first("category") {
            let slug = slug.trim().to_string();
            out.push(Predicate::Or(vec![
                Predicate::Equality(EqualityPredicate {
                    field: Field::Category,
                    value: Scalar::Slug(slug.clone()),
                }),
                Predicate::Equality(EqualityPredicate {
                    field: Field::SubCategory,
                    value: Scalar::Slug(slug),
                }),
            ]));
        }

        let brands = params.values("brand");
        if !brands.is_empty() {
            let mut values: Vec<Scalar> = Vec::with_capacity(brands.len());
            for raw in brands {
                let raw = raw.trim();
                let value = match Uuid::parse_str(raw) {
                    Ok(id) => Scalar::Id(id),
                    Err(_) => Scalar::Slug(raw.to_string()),
                };
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            out.push(Predicate::Membership(MembershipPredicate {
                field: Field::Brand,
                values,
            }));
        }

        for (key, field, bound) in [
            ("price_min", Field::Price, Bound::Min),
            ("price_max", Field::Price, Bound::Max),
            ("rating_min", Field::Rating, Bound::Min),
            ("rating_max", Field::Rating, Bound::Max),
        ] {
            let values = params.values(key);
            if values.is_empty() {
                continue;
            }
            let n = parse_number(key, &values)?;
            let (min, max) = match bound {
                Bound::Min => (Some(n), None),
                Bound::Max => (None, Some(n)),
            };
            out.push(Predicate::Range(RangePredicate { field, min, max }));
        }

        for (key, field) in [
            ("isFeatured", Field::Featured),
            ("isBestSeller", Field::BestSeller),
            ("isNewArrival", Field::NewArrival),
        ] {
            // Only the literal "true" filters; "false" means "don't care".
            if params.first(key) == Some("true") {
                out.push(Predicate::Equality(EqualityPredicate {
                    field,
                    value: Scalar::Bool(true),
                }));
            }
        }

        if let Some(term) = params.first("search") {
            out.push(Predicate::Text(TextPredicate {
                term: term.trim().to_string(),
            }));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
}

/// Split `<field>_min` / `<field>_max`, ignoring the suffix's case.
fn split_bound(key: &str) -> Option<(&str, Bound)> {
    let at = key.len().checked_sub(4)?;
    if !key.is_char_boundary(at) {
        return None;
    }
    let (field, suffix) = key.split_at(at);
    if suffix.eq_ignore_ascii_case("_min") {
        Some((field, Bound::Min))
    } else if suffix.eq_ignore_ascii_case("_max") {
        Some((field, Bound::Max))
    } else {
        None
    }
}

/// Parse the first value of a numeric filter.
fn parse_number(key: &str, values: &[&str]) -> Result<f64, CatalogError> {
    let raw = values.first().copied().unwrap_or_default();
    parse_decimal(raw).ok_or_else(|| CatalogError::InvalidFilterValue {
        field: key.to_string(),
        value: raw.to_string(),
    })
}
