//! Page/limit handling.

use serde::{Deserialize, Serialize};

/// Page size used when the caller gives none (or an invalid one).
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Parse raw `page` / `limit` parameters.
    ///
    /// Anything that is not a positive integer falls back to the default;
    /// limits above [`MAX_PAGE_SIZE`] are capped.
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = parse_positive(page).unwrap_or(1);
        let limit = match parse_positive(limit) {
            Some(requested) if requested > MAX_PAGE_SIZE => {
                tracing::warn!(
                    requested = requested,
                    capped = MAX_PAGE_SIZE,
                    "limit exceeds maximum, capping"
                );
                MAX_PAGE_SIZE
            }
            Some(requested) => requested,
            None => DEFAULT_PAGE_SIZE,
        };
        Self { page, limit }
    }

    /// Rows to skip before this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v >= 1)
}

/// Pagination metadata returned with a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    /// Total number of pages.
    pub pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Compute metadata for `request` given `total` matching rows.
    pub fn new(request: PageRequest, total: u64) -> Self {
        let limit = u64::from(request.limit.max(1));
        let page = u64::from(request.page);

        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: total.div_ceil(limit),
            has_next: page * limit < total,
            has_prev: request.page > 1,
        }
    }
}
