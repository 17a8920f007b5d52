//! Page-based pagination.

use serde::{Deserialize, Serialize};

/// A validated page request.
///
/// Query strings are parsed leniently: anything that is not a positive
/// integer falls back to the default, and `limit` is capped at
/// [`PageRequest::MAX_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Builds a request from already-typed values, applying the same
    /// fallbacks as [`PageRequest::from_query`].
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: if page == 0 { Self::DEFAULT_PAGE } else { page },
            limit: match limit {
                0 => Self::DEFAULT_LIMIT,
                l => l.min(Self::MAX_LIMIT),
            },
        }
    }

    /// Builds a request from raw query-string values.
    ///
    /// ```
    /// use gadget_pulse_core::PageRequest;
    ///
    /// let req = PageRequest::from_query(Some("2"), Some("abc"));
    /// assert_eq!((req.page(), req.limit()), (2, 10));
    /// ```
    #[must_use]
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(parse_positive(page), parse_positive(limit))
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Builds the page summary for a collection of `total` records.
    #[must_use]
    pub const fn info(&self, total: u64) -> PageInfo {
        PageInfo {
            current_page: self.page,
            limit: self.limit,
            total_pages: total.div_ceil(self.limit as u64),
            total,
        }
    }
}

/// Returns the value if it parses as a positive integer, otherwise 0.
fn parse_positive(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).unwrap_or(0)
}

/// Summary of one page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub total: u64,
}
