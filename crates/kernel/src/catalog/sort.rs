//! Sort token resolution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::schema::FilterSchema;
use super::types::{OrderSpec, SortDirection, SortField, SortKey};

/// Storefront sort tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortToken {
    /// Most recently created first.
    Newest,
    PriceAsc,
    PriceDesc,
    RatingDesc,
    /// Most viewed first.
    Popularity,
    /// Most variant units sold first.
    TopSelling,
}

impl SortToken {
    /// Every token, `newest` first.
    pub fn all() -> Vec<SortToken> {
        vec![
            SortToken::Newest,
            SortToken::PriceAsc,
            SortToken::PriceDesc,
            SortToken::RatingDesc,
            SortToken::Popularity,
            SortToken::TopSelling,
        ]
    }

    /// Parse a token as it appears in the `sort` parameter.
    pub fn parse(token: &str) -> Option<SortToken> {
        match token.trim() {
            "newest" => Some(SortToken::Newest),
            "price_asc" => Some(SortToken::PriceAsc),
            "price_desc" => Some(SortToken::PriceDesc),
            "rating_desc" => Some(SortToken::RatingDesc),
            "popularity" => Some(SortToken::Popularity),
            "top_selling" => Some(SortToken::TopSelling),
            _ => None,
        }
    }

    /// Primary sort key for this token.
    fn primary_key(self) -> SortKey {
        let (field, direction) = match self {
            SortToken::Newest => (SortField::Created, SortDirection::Desc),
            SortToken::PriceAsc => (SortField::Price, SortDirection::Asc),
            SortToken::PriceDesc => (SortField::Price, SortDirection::Desc),
            SortToken::RatingDesc => (SortField::Rating, SortDirection::Desc),
            SortToken::Popularity => (SortField::ViewCount, SortDirection::Desc),
            SortToken::TopSelling => (SortField::SoldCount, SortDirection::Desc),
        };
        SortKey { field, direction }
    }
}

/// Maps sort tokens to a deterministic [`OrderSpec`].
pub struct SortResolver;

impl SortResolver {
    /// Resolve `token` against `schema`.
    ///
    /// Unknown tokens, and tokens the schema does not offer, fall back to
    /// `newest`. The returned order always ends with `id ASC`, so pages are
    /// stable even when the primary key has duplicates.
    pub fn resolve(token: Option<&str>, schema: &FilterSchema) -> OrderSpec {
        let chosen = match token.map(|t| (t, SortToken::parse(t))) {
            Some((_, Some(parsed))) if schema.supports_sort(parsed) => parsed,
            Some((raw, _)) => {
                debug!(sort = %raw, "unsupported sort token, falling back to newest");
                SortToken::Newest
            }
            None => SortToken::Newest,
        };

        OrderSpec(vec![
            chosen.primary_key(),
            SortKey {
                field: SortField::Id,
                direction: SortDirection::Asc,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary(spec: &OrderSpec) -> SortKey {
        spec.keys()[0]
    }

    #[test]
    fn known_tokens() {
        let schema = FilterSchema::default();

        let spec = SortResolver::resolve(Some("price_asc"), &schema);
        assert_eq!(primary(&spec).field, SortField::Price);
        assert_eq!(primary(&spec).direction, SortDirection::Asc);

        let spec = SortResolver::resolve(Some("top_selling"), &schema);
        assert_eq!(primary(&spec).field, SortField::SoldCount);
        assert_eq!(primary(&spec).direction, SortDirection::Desc);

        let spec = SortResolver::resolve(Some("popularity"), &schema);
        assert_eq!(primary(&spec).field, SortField::ViewCount);
    }

    #[test]
    fn unknown_token_falls_back_to_newest() {
        let schema = FilterSchema::default();
        let spec = SortResolver::resolve(Some("cheapest_first"), &schema);
        assert_eq!(primary(&spec).field, SortField::Created);
        assert_eq!(primary(&spec).direction, SortDirection::Desc);

        let spec = SortResolver::resolve(None, &schema);
        assert_eq!(primary(&spec).field, SortField::Created);
    }

    #[test]
    fn token_not_offered_by_schema_falls_back() {
        let schema = FilterSchema {
            sort_tokens: vec![SortToken::Newest, SortToken::PriceAsc],
            ..Default::default()
        };
        let spec = SortResolver::resolve(Some("rating_desc"), &schema);
        assert_eq!(primary(&spec).field, SortField::Created);
    }

    #[test]
    fn every_order_ends_with_id_tie_break() {
        let schema = FilterSchema::default();
        for token in ["newest", "price_asc", "price_desc", "rating_desc", "popularity", "top_selling", "bogus"] {
            let spec = SortResolver::resolve(Some(token), &schema);
            let last = spec.keys().last().copied();
            assert_eq!(
                last,
                Some(SortKey {
                    field: SortField::Id,
                    direction: SortDirection::Asc
                }),
                "token {token} must end with id tie-break"
            );
        }
    }

    #[test]
    fn token_serialization() {
        let json = serde_json::to_string(&SortToken::TopSelling).unwrap_or_default();
        assert_eq!(json, "\"top_selling\"");
    }
}
