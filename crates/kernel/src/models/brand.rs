//! Brand model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A product brand.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Brand {
    /// Unique identifier.
    pub id: Uuid,

    /// Unique, URL-safe slug.
    pub slug: String,

    /// Human-readable name.
    pub name: String,

    /// Logo image URL.
    #[serde(default)]
    pub logo: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

impl Brand {
    /// Find all active brands whose slug is in `slugs`.
    pub async fn find_active_by_slugs(pool: &PgPool, slugs: &[String]) -> Result<Vec<Self>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let brands = sqlx::query_as::<_, Self>(
            "SELECT id, slug, name, logo, is_active, is_featured \
             FROM brand WHERE slug = ANY($1) AND is_active",
        )
        .bind(slugs)
        .fetch_all(pool)
        .await
        .context("failed to fetch brands")?;

        Ok(brands)
    }
}
