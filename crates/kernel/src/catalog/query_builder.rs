//! Product query builder using SeaQuery.
//!
//! Renders a [`CompiledQuery`] as PostgreSQL against the `product` table:
//! - scalar predicates on columns
//! - specification predicates as `EXISTS` over the JSONB groups
//! - listing, count and facet queries sharing the same WHERE clause
//!
//! All user-supplied values are bound through SeaQuery and rendered as
//! escaped literals; raw SQL fragments only contain fixed text and
//! normalized specification keys.

use sea_query::{
    Alias, Asterisk, Cond, Expr, JoinType, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr, Value,
};

use super::pager::PageRequest;
use super::types::{
    CompiledQuery, EqualityPredicate, ExistentialPredicate, MembershipPredicate, OrderSpec,
    Predicate, RangePredicate, Scalar, SortDirection, SpecCondition, TextPredicate,
};
use crate::models::product::{DECIMAL_PATTERN, spec_key, spec_key_sql};

const PRODUCT: &str = "product";
const BRAND: &str = "brand";

/// Every specification item of `product`, one row per item as `i`.
const SPEC_ITEMS: &str = "jsonb_array_elements(product.specifications) g, \
     jsonb_array_elements(coalesce(g->'items', '[]'::jsonb)) i";

/// Query builder for catalog listings.
pub struct ProductQueryBuilder<'a> {
    query: &'a CompiledQuery,
}

impl<'a> ProductQueryBuilder<'a> {
    pub fn new(query: &'a CompiledQuery) -> Self {
        Self { query }
    }

    /// Build the listing SELECT with ordering and pagination.
    ///
    /// Each row is one product document (`row_to_json`), so the ordered
    /// statement is executed as is, without an outer wrapper.
    pub fn build(&self, order: &OrderSpec, page: PageRequest) -> String {
        let mut query = Query::select();

        query.expr_as(Expr::cust(r#"row_to_json("product".*)"#), Alias::new("doc"));
        query.from(Alias::new(PRODUCT));

        self.add_filters(&mut query);

        for key in order.keys() {
            let direction = match key.direction {
                SortDirection::Asc => Order::Asc,
                SortDirection::Desc => Order::Desc,
            };
            query.order_by(
                (Alias::new(PRODUCT), Alias::new(key.field.column())),
                direction,
            );
        }

        query.limit(u64::from(page.limit));
        query.offset(page.skip());

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query for total results.
    pub fn build_count(&self) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(PRODUCT));
        self.add_filters(&mut query);
        query.to_string(PostgresQueryBuilder)
    }

    /// Build the brand facet query: `(slug, name, count)` per active brand.
    pub fn build_brand_facets(&self) -> String {
        let mut query = Query::select();

        query.column((Alias::new(BRAND), Alias::new("slug")));
        query.column((Alias::new(BRAND), Alias::new("name")));
        query.expr_as(Expr::col(Asterisk).count(), Alias::new("count"));
        query.from(Alias::new(PRODUCT));
        query.join(
            JoinType::InnerJoin,
            Alias::new(BRAND),
            Expr::col((Alias::new(PRODUCT), Alias::new("brand_id")))
                .equals((Alias::new(BRAND), Alias::new("id"))),
        );

        self.add_filters(&mut query);
        query.and_where(Expr::col((Alias::new(BRAND), Alias::new("is_active"))).eq(true));

        query.group_by_col((Alias::new(BRAND), Alias::new("slug")));
        query.group_by_col((Alias::new(BRAND), Alias::new("name")));
        query.order_by((Alias::new(BRAND), Alias::new("name")), Order::Asc);
        query.order_by((Alias::new(BRAND), Alias::new("slug")), Order::Asc);

        query.to_string(PostgresQueryBuilder)
    }

    /// Build the price bounds query: `(MIN(price), MAX(price))`.
    pub fn build_price_bounds(&self) -> String {
        let mut query = Query::select();
        query.expr_as(
            Expr::col((Alias::new(PRODUCT), Alias::new("price"))).min(),
            Alias::new("min"),
        );
        query.expr_as(
            Expr::col((Alias::new(PRODUCT), Alias::new("price"))).max(),
            Alias::new("max"),
        );
        query.from(Alias::new(PRODUCT));
        self.add_filters(&mut query);
        query.to_string(PostgresQueryBuilder)
    }

    /// Build the value facet query for one specification: `(value, count)`.
    ///
    /// A product counts once per distinct value even if several of its
    /// items carry the same name.
    pub fn build_spec_values(&self, spec: &str) -> String {
        let mut inner = Query::select();
        inner.column((Alias::new(PRODUCT), Alias::new("id")));
        inner.column((Alias::new(PRODUCT), Alias::new("specifications")));
        inner.from(Alias::new(PRODUCT));
        self.add_filters(&mut inner);
        let inner = inner.to_string(PostgresQueryBuilder);

        // spec_key output is limited to [a-z0-9_], safe to inline.
        let spec = spec_key(spec);
        let name = spec_key_sql("i->>'name'");

        format!(
            "SELECT min(trim(i->>'value') COLLATE \"C\") AS value, COUNT(DISTINCT product.id) AS count \
             FROM ({inner}) product, {SPEC_ITEMS} \
             WHERE {name} = '{spec}' AND i->>'value' IS NOT NULL \
             GROUP BY lower(trim(i->>'value')) \
             ORDER BY lower(trim(i->>'value'))"
        )
    }

    /// Add WHERE conditions from the compiled predicates.
    fn add_filters(&self, query: &mut SelectStatement) {
        for predicate in &self.query.predicates {
            query.and_where(predicate_expr(predicate));
        }
    }
}

/// Render a predicate node.
fn predicate_expr(predicate: &Predicate) -> SimpleExpr {
    match predicate {
        Predicate::Equality(p) => equality_expr(p),
        Predicate::Range(p) => range_expr(p),
        Predicate::Membership(p) => membership_expr(p),
        Predicate::Text(p) => text_expr(p),
        Predicate::Existential(p) => existential_expr(p),
        Predicate::And(children) => {
            let mut cond = Cond::all();
            for child in children {
                cond = cond.add(predicate_expr(child));
            }
            if children.is_empty() {
                Expr::cust("TRUE")
            } else {
                cond.into()
            }
        }
        Predicate::Or(children) => {
            if children.is_empty() {
                return Expr::cust("FALSE");
            }
            let mut cond = Cond::any();
            for child in children {
                cond = cond.add(predicate_expr(child));
            }
            cond.into()
        }
        Predicate::MatchNone => Expr::cust("FALSE"),
    }
}

fn column(name: &str) -> Expr {
    Expr::col((Alias::new(PRODUCT), Alias::new(name)))
}

fn equality_expr(p: &EqualityPredicate) -> SimpleExpr {
    let col = column(p.field.column());
    match &p.value {
        Scalar::Id(id) => col.eq(*id),
        Scalar::Bool(b) => col.eq(*b),
        Scalar::Slug(slug) => {
            // Slugs are resolved before execution; restrict rather than widen.
            tracing::warn!(field = ?p.field, slug = %slug, "unresolved slug in query");
            Expr::cust("FALSE")
        }
    }
}

fn range_expr(p: &RangePredicate) -> SimpleExpr {
    let mut cond = Cond::all();
    if let Some(min) = p.min {
        cond = cond.add(column(p.field.column()).gte(min));
    }
    if let Some(max) = p.max {
        cond = cond.add(column(p.field.column()).lte(max));
    }
    if p.min.is_none() && p.max.is_none() {
        return Expr::cust("TRUE");
    }
    cond.into()
}

fn membership_expr(p: &MembershipPredicate) -> SimpleExpr {
    let ids: Vec<uuid::Uuid> = p
        .values
        .iter()
        .filter_map(|v| match v {
            Scalar::Id(id) => Some(*id),
            _ => None,
        })
        .collect();
    if ids.is_empty() {
        return Expr::cust("FALSE");
    }
    column(p.field.column()).is_in(ids)
}

fn text_expr(p: &TextPredicate) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like_wildcards(&p.term));
    Expr::cust_with_values(
        format!(
            "(product.name ILIKE $1 \
             OR product.slug ILIKE $2 \
             OR coalesce(product.description, '') ILIKE $3 \
             OR EXISTS (SELECT 1 FROM unnest(product.tags) tag WHERE tag ILIKE $4) \
             OR EXISTS (SELECT 1 FROM unnest(product.key_features) feature WHERE feature ILIKE $5) \
             OR EXISTS (SELECT 1 FROM {SPEC_ITEMS} WHERE i->>'value' ILIKE $6))"
        ),
        std::iter::repeat_n(pattern, 6),
    )
}

fn existential_expr(p: &ExistentialPredicate) -> SimpleExpr {
    let name = spec_key_sql("i->>'name'");
    let mut values: Vec<Value> = vec![p.spec.clone().into()];

    let condition = match &p.condition {
        SpecCondition::AtLeast(bound) | SpecCondition::AtMost(bound) => {
            let op = if matches!(p.condition, SpecCondition::AtLeast(_)) {
                ">="
            } else {
                "<="
            };
            values.push(DECIMAL_PATTERN.into());
            values.push((*bound).into());
            // CASE guards the cast: non-numeric values never satisfy a bound.
            format!(
                "CASE WHEN i->>'value' ~ $2 THEN (i->>'value')::numeric ELSE NULL END {op} $3"
            )
        }
        SpecCondition::OneOf(options) => {
            if options.is_empty() {
                return Expr::cust("FALSE");
            }
            let placeholders: Vec<String> = (0..options.len())
                .map(|i| format!("${}", i + 2))
                .collect();
            values.extend(options.iter().map(|o| Value::from(o.to_lowercase())));
            format!(
                "lower(trim(i->>'value')) IN ({})",
                placeholders.join(", ")
            )
        }
    };

    Expr::cust_with_values(
        format!("EXISTS (SELECT 1 FROM {SPEC_ITEMS} WHERE {name} = $1 AND {condition})"),
        values,
    )
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
