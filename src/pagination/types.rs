//! Pagination cursor type

use std::ops::RangeInclusive;

/// Pagination metadata read from one response
///
/// Every field is optional: servers omit headers they have nothing to say
/// about, e.g. on single-page responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Current page (`X-Page`)
    pub page: Option<u32>,
    /// Next page (`X-Next-Page`)
    pub next_page: Option<u32>,
    /// Previous page (`X-Prev-Page`)
    pub prev_page: Option<u32>,
    /// Total number of pages (`X-Total-Pages`)
    pub total_pages: Option<u32>,
    /// Items per page (`X-Per-Page`)
    pub per_page: Option<u32>,
    /// Total number of items (`X-Total`)
    pub total_items: Option<u64>,
}

impl Cursor {
    /// Check whether both the current page and the page total are known
    pub fn is_complete(&self) -> bool {
        self.page.is_some() && self.total_pages.is_some()
    }

    /// Pages that remain after the current one
    ///
    /// `limit` caps the last page number; `0` means unlimited. An incomplete
    /// cursor yields an empty range.
    pub fn remaining_pages(&self, limit: u32) -> RangeInclusive<u32> {
        match (self.page, self.total_pages) {
            (Some(page), Some(total)) => {
                let last = if limit == 0 { total } else { total.min(limit) };
                match page.checked_add(1) {
                    Some(next) => next..=last,
                    None => 1..=0,
                }
            }
            // 1..=0 is empty
            _ => 1..=0,
        }
    }

    /// Number of pages the server reports beyond `limit`
    pub fn pages_beyond(&self, limit: u32) -> u32 {
        match self.total_pages {
            Some(total) if limit > 0 && total > limit => total - limit,
            _ => 0,
        }
    }
}
