//! Page/limit query handling and the pagination envelope returned by
//! every listing endpoint.

use serde::{Deserialize, Serialize};

/// Maximum page size a client may request.
const MAX_LIMIT: i64 = 100;

/// `?page=&limit=` query parameters. Both optional.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Clamp to sane values and derive the SQL offset.
    /// Returns `(page, limit, offset)`.
    pub fn resolve(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).clamp(1, MAX_LIMIT);
        (page, limit, (page - 1) * limit)
    }
}

/// Pagination metadata attached to listing responses.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + limit - 1) / limit
        };
        Self {
            current_page: page,
            total_pages,
            total_items,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(PageQuery::default().resolve(), (1, 10, 0));

        let q = PageQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(q.resolve(), (1, MAX_LIMIT, 0));

        let q = PageQuery {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(q.resolve(), (3, 20, 40));
    }

    #[test]
    fn envelope_math() {
        let p = Pagination::new(1, 10, 35);
        assert_eq!(p.total_pages, 4);
        assert!(p.has_next_page);
        assert!(!p.has_prev_page);

        let p = Pagination::new(4, 10, 35);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);

        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
    }
}
