//! Filter schema registry.
//!
//! Each category may declare the specification filters its storefront page
//! offers (wattage range, cell type, ...). Schemas are loaded once at startup
//! from YAML and never change afterwards; a category without a schema gets
//! the default one.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::compiler::is_reserved_param;
use super::sort::SortToken;
use crate::models::product::spec_key;

/// Built-in schemas for the solar catalog.
const BUILTIN_SCHEMAS: &str = include_str!("../../config/filter_schemas.yml");

/// Inclusive price bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100_000.0,
        }
    }
}

/// How a filter is rendered and compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Numeric range via `<key>_min` / `<key>_max`.
    Range,
    /// Pick one or more of `options`.
    Select,
    /// Free text matched exactly.
    Text,
}

/// One declared filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    /// Parameter key; also the specification name in [`spec_key`] form.
    pub key: String,
    pub label: String,
    pub kind: FilterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Filter schema for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSchema {
    #[serde(default)]
    pub filters: Vec<FilterDescriptor>,

    #[serde(default)]
    pub price_range: PriceRange,

    #[serde(default = "SortToken::all")]
    pub sort_tokens: Vec<SortToken>,
}

impl Default for FilterSchema {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            price_range: PriceRange::default(),
            sort_tokens: SortToken::all(),
        }
    }
}

impl FilterSchema {
    /// Look up a declared filter by key (in any spelling of the name).
    pub fn filter(&self, key: &str) -> Option<&FilterDescriptor> {
        let key = spec_key(key);
        self.filters.iter().find(|f| f.key == key)
    }

    /// Whether `token` is offered by this schema.
    pub fn supports_sort(&self, token: SortToken) -> bool {
        self.sort_tokens.contains(&token)
    }

    /// Declared `select` filters, in display order.
    pub fn select_filters(&self) -> impl Iterator<Item = &FilterDescriptor> {
        self.filters.iter().filter(|f| f.kind == FilterKind::Select)
    }

    fn validate(&mut self, name: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for filter in &mut self.filters {
            let normalized = spec_key(&filter.key);
            ensure!(
                !normalized.is_empty(),
                "schema '{name}': filter key '{}' is empty after normalization",
                filter.key
            );
            ensure!(
                !is_reserved_param(&normalized),
                "schema '{name}': filter key '{normalized}' collides with a reserved parameter"
            );
            ensure!(
                !normalized.ends_with("_min") && !normalized.ends_with("_max"),
                "schema '{name}': filter key '{normalized}' must not end in _min or _max"
            );
            ensure!(
                seen.insert(normalized.clone()),
                "schema '{name}': duplicate filter key '{normalized}'"
            );
            match filter.kind {
                FilterKind::Select => ensure!(
                    !filter.options.is_empty(),
                    "schema '{name}': select filter '{normalized}' has no options"
                ),
                FilterKind::Range | FilterKind::Text => ensure!(
                    filter.options.is_empty(),
                    "schema '{name}': filter '{normalized}' does not take options"
                ),
            }
            filter.key = normalized;
        }

        ensure!(
            self.price_range.min <= self.price_range.max,
            "schema '{name}': price_range.min exceeds price_range.max"
        );
        if self.sort_tokens.is_empty() {
            bail!("schema '{name}': sort_tokens must not be empty");
        }
        if !self.sort_tokens.contains(&SortToken::Newest) {
            bail!("schema '{name}': sort_tokens must include 'newest' (the fallback order)");
        }

        Ok(())
    }
}

/// On-disk layout of the schema document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    #[serde(default)]
    default: Option<FilterSchema>,
    #[serde(default)]
    categories: HashMap<String, FilterSchema>,
}

/// Immutable registry of filter schemas keyed by category slug.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, FilterSchema>,
    default: FilterSchema,
}

impl SchemaRegistry {
    /// Registry built from the bundled solar catalog schemas.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_SCHEMAS).context("invalid built-in filter schemas")
    }

    /// Load a registry from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read filter schemas from {}", path.display()))?;
        let registry = Self::from_yaml(&content)
            .with_context(|| format!("invalid filter schemas in {}", path.display()))?;
        info!(
            path = %path.display(),
            categories = registry.len(),
            "filter schemas loaded"
        );
        Ok(registry)
    }

    /// Parse and validate a YAML schema document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let document: SchemaDocument =
            serde_yml::from_str(content).context("failed to parse filter schema YAML")?;

        let mut default = document.default.unwrap_or_default();
        default.validate("default")?;

        let mut schemas = HashMap::with_capacity(document.categories.len());
        for (slug, mut schema) in document.categories {
            schema.validate(&slug)?;
            schemas.insert(slug, schema);
        }

        Ok(Self { schemas, default })
    }

    /// Schema for a category, falling back to the default.
    pub fn schema_for(&self, category_slug: Option<&str>) -> &FilterSchema {
        match category_slug.and_then(|slug| self.schemas.get(slug)) {
            Some(schema) => schema,
            None => {
                if let Some(slug) = category_slug {
                    debug!(category = %slug, "no filter schema registered, using default");
                }
                &self.default
            }
        }
    }

    /// Number of categories with an explicit schema.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
