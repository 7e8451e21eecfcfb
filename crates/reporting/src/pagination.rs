//! Fixed-window pagination over already-ordered result sets.

use serde::Serialize;

/// Transaction history pages.
pub const TRANSACTION_PAGE_SIZE: usize = 9;
/// Invoice list pages.
pub const INVOICE_PAGE_SIZE: usize = 6;
/// Shared-account member roster pages.
pub const ROSTER_PAGE_SIZE: usize = 7;
/// How many recent transactions the dashboard shows.
pub const RECENT_TRANSACTIONS: usize = 5;

/// One page of an ordered result set, with enough shape for a pager widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based page index as requested.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
}

/// Cut `items` into pages of `page_size` and return page `page`.
///
/// `page_count` is `ceil(total / page_size)`; page `i` holds rows
/// `[i*page_size, min((i+1)*page_size, total))`. An empty set has zero
/// pages, and a page index past the end yields no rows.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    assert!(page_size > 0, "page_size must be positive");
    let total = items.len();
    let page_count = total.div_ceil(page_size);
    let items = items
        .into_iter()
        .skip(page.saturating_mul(page_size))
        .take(page_size)
        .collect();
    Page {
        items,
        page,
        page_count,
        total,
    }
}
