//! Pagination module
//!
//! Reads GitLab-style pagination headers (`X-Page`, `X-Next-Page`,
//! `X-Prev-Page`, `X-Total-Pages`, `X-Per-Page`, `X-Total`) into a
//! [`Cursor`].
//!
//! # Overview
//!
//! Missing headers are not an error: each absent header leaves its field
//! empty, and a cursor lacking either the current page or the page total
//! simply yields no remaining pages. Malformed or conflicting values are
//! reported as errors.

mod parser;
mod types;

pub use parser::{
    parse_cursor, HEADER_NEXT_PAGE, HEADER_PAGE, HEADER_PER_PAGE, HEADER_PREV_PAGE, HEADER_TOTAL,
    HEADER_TOTAL_PAGES,
};
pub use types::Cursor;
