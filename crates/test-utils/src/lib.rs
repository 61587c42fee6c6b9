//! Voltcart test utilities.
//!
//! Helpers for integration testing: catalog fixture builders producing the
//! JSON documents the kernel loads, and assertion utilities for listing
//! responses.

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Create a test product with default values.
pub fn test_product(name: &str, price: f64) -> TestProduct {
    TestProduct {
        id: Uuid::now_v7(),
        name: name.to_string(),
        slug: slugify(name),
        price,
        category_id: Uuid::nil(),
        sub_category_id: None,
        brand_id: None,
        rating: 0.0,
        stock: 10,
        created: 0,
        view_count: 0,
        sold_count: 0,
        tags: Vec::new(),
        flags: Vec::new(),
        specifications: Vec::new(),
    }
}

/// A test product builder for creating catalog fixtures.
#[derive(Debug, Clone)]
pub struct TestProduct {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: f64,
    pub category_id: Uuid,
    pub sub_category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub rating: f64,
    pub stock: i64,
    pub created: i64,
    pub view_count: i64,
    pub sold_count: i64,
    pub tags: Vec<String>,
    /// Marketing flags set to true, by field name (`is_featured`, ...).
    pub flags: Vec<&'static str>,
    /// `(name, value, unit)` items, all in one "Specifications" group.
    pub specifications: Vec<(String, JsonValue, Option<String>)>,
}

impl TestProduct {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set the top-level category.
    pub fn in_category(mut self, category_id: Uuid) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the sub-category.
    pub fn in_sub_category(mut self, sub_category_id: Uuid) -> Self {
        self.sub_category_id = Some(sub_category_id);
        self
    }

    /// Set the brand.
    pub fn with_brand(mut self, brand_id: Uuid) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    /// Set the creation timestamp.
    pub fn created_at(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn with_views(mut self, view_count: i64) -> Self {
        self.view_count = view_count;
        self
    }

    pub fn with_sold(mut self, sold_count: i64) -> Self {
        self.sold_count = sold_count;
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Mark as featured.
    pub fn featured(mut self) -> Self {
        self.flags.push("is_featured");
        self
    }

    /// Mark as best seller.
    pub fn best_seller(mut self) -> Self {
        self.flags.push("is_best_seller");
        self
    }

    /// Mark as new arrival.
    pub fn new_arrival(mut self) -> Self {
        self.flags.push("is_new_arrival");
        self
    }

    /// Add a specification item.
    pub fn with_spec(mut self, name: &str, value: JsonValue) -> Self {
        self.specifications.push((name.to_string(), value, None));
        self
    }

    /// Add a specification item with a unit.
    pub fn with_spec_unit(mut self, name: &str, value: JsonValue, unit: &str) -> Self {
        self.specifications
            .push((name.to_string(), value, Some(unit.to_string())));
        self
    }

    /// Render as a product document.
    pub fn to_json(&self) -> JsonValue {
        let items: Vec<JsonValue> = self
            .specifications
            .iter()
            .map(|(name, value, unit)| match unit {
                Some(unit) => json!({"name": name, "value": value, "unit": unit}),
                None => json!({"name": name, "value": value}),
            })
            .collect();

        let mut doc = json!({
            "id": self.id,
            "slug": self.slug,
            "name": self.name,
            "category_id": self.category_id,
            "sub_category_id": self.sub_category_id,
            "brand_id": self.brand_id,
            "price": self.price,
            "stock": self.stock,
            "rating": self.rating,
            "created": self.created,
            "changed": self.created,
            "view_count": self.view_count,
            "sold_count": self.sold_count,
            "tags": self.tags,
            "specifications": [{"group_name": "Specifications", "items": items}],
        });
        if let Some(obj) = doc.as_object_mut() {
            for flag in &self.flags {
                obj.insert((*flag).to_string(), JsonValue::Bool(true));
            }
        }
        doc
    }
}

/// Create a category document.
pub fn test_category(id: Uuid, slug: &str, name: &str) -> JsonValue {
    json!({"id": id, "slug": slug, "name": name, "level": 1, "is_active": true})
}

/// Create a brand document.
pub fn test_brand(id: Uuid, slug: &str, name: &str) -> JsonValue {
    json!({"id": id, "slug": slug, "name": name, "is_active": true})
}

/// Assemble a catalog fixture document.
pub fn catalog_fixtures(
    categories: Vec<JsonValue>,
    brands: Vec<JsonValue>,
    products: &[TestProduct],
) -> JsonValue {
    json!({
        "categories": categories,
        "brands": brands,
        "products": products.iter().map(TestProduct::to_json).collect::<Vec<_>>(),
    })
}

fn slugify(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Assertion helpers for listing responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Product prices in response order.
    pub fn prices(response: &Value) -> Vec<f64> {
        response["products"]
            .as_array()
            .map(|products| products.iter().filter_map(|p| p["price"].as_f64()).collect())
            .unwrap_or_default()
    }

    /// Product slugs in response order.
    pub fn slugs(response: &Value) -> Vec<String> {
        response["products"]
            .as_array()
            .map(|products| {
                products
                    .iter()
                    .filter_map(|p| p["slug"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Assert the pagination block.
    pub fn pagination(response: &Value, total: u64, pages: u64, has_next: bool, has_prev: bool) {
        let p = &response["pagination"];
        assert_eq!(p["total"], total, "total mismatch in {p}");
        assert_eq!(p["pages"], pages, "pages mismatch in {p}");
        assert_eq!(p["hasNext"], has_next, "hasNext mismatch in {p}");
        assert_eq!(p["hasPrev"], has_prev, "hasPrev mismatch in {p}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_builder() {
        let brand = Uuid::now_v7();
        let doc = test_product("Mono PERC 400W", 199.0)
            .with_brand(brand)
            .featured()
            .with_tag("panel")
            .with_spec_unit("Wattage", json!(400), "W")
            .to_json();

        assert_eq!(doc["slug"], "mono-perc-400w");
        assert_eq!(doc["brand_id"], json!(brand));
        assert_eq!(doc["is_featured"], true);
        assert_eq!(doc["specifications"][0]["items"][0]["unit"], "W");
    }

    #[test]
    fn test_fixture_document() {
        let category = Uuid::now_v7();
        let doc = catalog_fixtures(
            vec![test_category(category, "solar-panels", "Solar Panels")],
            vec![],
            &[test_product("A", 1.0).in_category(category)],
        );
        assert_eq!(doc["products"].as_array().unwrap().len(), 1);
        assert_eq!(doc["categories"][0]["slug"], "solar-panels");
    }

    #[test]
    fn test_assertions() {
        let response = json!({
            "products": [{"slug": "a", "price": 1.0}, {"slug": "b", "price": 2.0}],
            "pagination": {"total": 2, "pages": 1, "hasNext": false, "hasPrev": false}
        });
        assert::has_key(&response, "products");
        assert_eq!(assert::prices(&response), vec![1.0, 2.0]);
        assert_eq!(assert::slugs(&response), vec!["a", "b"]);
        assert::pagination(&response, 2, 1, false, false);
    }
}
