use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::config;
use crate::filter::FilterError;

/// Paging fields accepted by every search endpoint. Flattened into the
/// search request bodies.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page: Some(page), limit: Some(limit) }
    }

    /// Resolve against the configured default and maximum page size.
    pub fn resolve(&self) -> Result<PageWindow, FilterError> {
        let pagination = &config().pagination;
        self.resolve_with(pagination.default_limit, pagination.max_limit)
    }

    pub fn resolve_with(&self, default_limit: i64, max_limit: i64) -> Result<PageWindow, FilterError> {
        let max_limit = max_limit.max(1);
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(FilterError::InvalidPage(format!("page must be at least 1, got {}", page)));
        }

        let requested = self.limit.unwrap_or(default_limit);
        if requested < 1 {
            return Err(FilterError::InvalidLimit(format!("limit must be at least 1, got {}", requested)));
        }

        let limit = if requested > max_limit {
            debug!("Capping page limit {} to {}", requested, max_limit);
            max_limit
        } else {
            requested
        };

        Ok(PageWindow { page, limit })
    }
}

/// A validated page number and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: i64,
    pub limit: i64,
    pub records: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(window: PageWindow, records: i64) -> Self {
        let pages = if records <= 0 { 0 } else { (records + window.limit - 1) / window.limit };
        Self {
            current: window.page,
            limit: window.limit,
            records,
            pages,
        }
    }
}

/// The list envelope: `{ pagination, data }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub pagination: Pagination,
    pub data: Vec<T>,
}
