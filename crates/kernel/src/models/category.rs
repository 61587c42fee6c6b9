//! Category model.
//!
//! Categories form a two-level hierarchy: top-level categories (level 1)
//! and their sub-categories (level 2, with `parent_id` set).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Unique identifier.
    pub id: Uuid,

    /// Unique, URL-safe slug.
    pub slug: String,

    /// Human-readable name.
    pub name: String,

    /// Parent category for sub-categories.
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// 1 for top-level categories, 2 for sub-categories.
    #[serde(default = "default_level")]
    pub level: i16,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub is_featured: bool,
}

fn default_level() -> i16 {
    1
}

fn default_true() -> bool {
    true
}

impl Category {
    /// Find an active category by slug.
    pub async fn find_active_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>> {
        let category = sqlx::query_as::<_, Self>(
            "SELECT id, slug, name, parent_id, level, is_active, is_featured \
             FROM category WHERE slug = $1 AND is_active",
        )
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("failed to fetch category")?;

        Ok(category)
    }

    /// Hierarchy level implied by the parent link.
    pub fn expected_level(&self) -> i16 {
        if self.parent_id.is_some() { 2 } else { 1 }
    }
}
