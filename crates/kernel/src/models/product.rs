//! Product model.
//!
//! Products are stored as documents: scalar columns for the fields the
//! catalog filters and sorts on, plus JSONB for specification groups and
//! variants. The catalog query engine only reads products; the derived
//! fields (slug, discount, units sold) are refreshed by the write path via
//! [`Product::refresh_derived`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUIDv7). Also the final sort tie-break.
    pub id: Uuid,

    /// Unique, URL-safe slug derived from the name.
    pub slug: String,

    /// Display name.
    pub name: String,

    /// Long description.
    #[serde(default)]
    pub description: Option<String>,

    /// Owning top-level category.
    pub category_id: Uuid,

    /// Optional second-level category.
    #[serde(default)]
    pub sub_category_id: Option<Uuid>,

    /// Optional brand.
    #[serde(default)]
    pub brand_id: Option<Uuid>,

    /// Selling price.
    pub price: f64,

    /// Price before discount, if the product is discounted.
    #[serde(default)]
    pub original_price: Option<f64>,

    /// Derived from `price` and `original_price`.
    #[serde(default)]
    pub discount_percentage: u8,

    /// Units in stock.
    #[serde(default)]
    pub stock: i64,

    /// Specification groups, e.g. "Electrical" → [Wattage = 400 W, ...].
    #[serde(default)]
    pub specifications: Vec<SpecificationGroup>,

    /// Purchasable variants.
    #[serde(default)]
    pub variants: Vec<Variant>,

    /// Sum of `variants[].sold`, kept in sync by the write path.
    #[serde(default)]
    pub sold_count: i64,

    /// Average review rating (0–5).
    #[serde(default)]
    pub rating: f64,

    /// Number of reviews.
    #[serde(default)]
    pub review_count: i64,

    /// Image URLs.
    #[serde(default)]
    pub images: Vec<String>,

    /// Short marketing bullet points.
    #[serde(default)]
    pub key_features: Vec<String>,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default)]
    pub is_best_seller: bool,

    #[serde(default)]
    pub is_new_arrival: bool,

    /// Storefront page views.
    #[serde(default)]
    pub view_count: i64,

    /// Unix timestamp when created.
    #[serde(default)]
    pub created: i64,

    /// Unix timestamp when last changed.
    #[serde(default)]
    pub changed: i64,
}

/// A named group of specification items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecificationGroup {
    pub group_name: String,
    #[serde(default)]
    pub items: Vec<SpecificationItem>,
}

/// A single specification entry such as `Wattage = 400 W`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecificationItem {
    pub name: String,
    pub value: SpecValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Specification values are loosely typed in the catalog documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SpecValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SpecValue {
    /// Numeric view of the value.
    ///
    /// Text values count as numbers when they are plain decimals
    /// (see [`parse_decimal`]); booleans never do.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SpecValue::Number(n) => Some(*n),
            SpecValue::Text(s) => parse_decimal(s),
            SpecValue::Bool(_) => None,
        }
    }

    /// Text view of the value, matching what PostgreSQL's `->>` yields.
    pub fn as_text(&self) -> String {
        match self {
            SpecValue::Bool(b) => b.to_string(),
            SpecValue::Number(n) => format_number(*n),
            SpecValue::Text(s) => s.clone(),
        }
    }
}

/// A purchasable product variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    pub label: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub price: Option<f64>,
    /// Units sold.
    #[serde(default)]
    pub sold: i64,
}

impl Product {
    /// Recompute fields derived from other fields.
    ///
    /// Called by the product write path before persisting.
    pub fn refresh_derived(&mut self) {
        self.slug = slugify(&self.name);
        self.discount_percentage = discount_percentage(self.price, self.original_price);
        self.sold_count = self.variants.iter().map(|v| v.sold).sum();
        self.changed = chrono::Utc::now().timestamp();
    }

    /// Iterate over every specification item across all groups.
    pub fn specification_items(&self) -> impl Iterator<Item = &SpecificationItem> {
        self.specifications.iter().flat_map(|g| g.items.iter())
    }
}

/// `round((original − price) / original × 100)` when discounted, else 0.
pub fn discount_percentage(price: f64, original_price: Option<f64>) -> u8 {
    match original_price {
        Some(original) if original > price && original > 0.0 => {
            (((original - price) / original) * 100.0).round().clamp(0.0, 100.0) as u8
        }
        _ => 0,
    }
}

/// Convert text into a URL-safe slug.
///
/// Lowercases, replaces anything that is not an ASCII letter or digit with a
/// hyphen, collapses runs of hyphens and trims them from both ends.
pub fn slugify(text: &str) -> String {
    normalize(text, '-')
}

/// Canonical form of a specification name: `"Cell Type"` → `"cell_type"`.
///
/// Filter keys and specification item names are compared in this form.
/// PostgreSQL applies the same rule via [`spec_key_sql`].
pub fn spec_key(name: &str) -> String {
    normalize(name, '_')
}

/// [`spec_key`] as a PostgreSQL expression over `expr`.
pub fn spec_key_sql(expr: &str) -> String {
    format!("trim(both '_' from regexp_replace(lower({expr}), '[^a-z0-9]+', '_', 'g'))")
}

fn normalize(text: &str, separator: char) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_separator = true; // skip leading separators
    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_was_separator = false;
        } else if !prev_was_separator {
            result.push(separator);
            prev_was_separator = true;
        }
    }

    while result.ends_with(separator) {
        result.pop();
    }

    result
}

/// Parse a plain decimal: optional sign, digits, optional fraction.
///
/// Surrounding whitespace is allowed. Exponents, `inf` and `NaN` are not,
/// so the same grammar can be checked in SQL with [`DECIMAL_PATTERN`].
pub fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || fraction.is_some_and(|f| !all_digits(f)) {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// PostgreSQL regex equivalent of [`parse_decimal`].
pub const DECIMAL_PATTERN: &str = r"^\s*[-+]?[0-9]+(\.[0-9]+)?\s*$";

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
