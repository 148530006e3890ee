//! Offset pagination for catalog listings.

use serde::{Deserialize, Serialize};

/// Default page size for media listings.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Maximum page size a caller may request.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Offset-based pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    /// Maximum number of rows to return.
    pub limit: i64,
    /// Number of rows to skip.
    pub offset: i64,
}

impl OffsetPagination {
    /// Creates pagination parameters, clamping the limit to the allowed range.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_SIZE),
            offset: offset.max(0),
        }
    }

    /// Creates pagination for a 1-indexed page number with the default size.
    pub fn page(page: i64) -> Self {
        let page = page.max(1);
        Self::new(DEFAULT_PAGE_SIZE, (page - 1) * DEFAULT_PAGE_SIZE)
    }
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_limit_and_offset() {
        let p = OffsetPagination::new(10_000, -5);
        assert_eq!(p.limit, MAX_PAGE_SIZE);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn page_numbers_are_one_indexed() {
        assert_eq!(OffsetPagination::page(1).offset, 0);
        assert_eq!(OffsetPagination::page(3).offset, 2 * DEFAULT_PAGE_SIZE);
    }
}
