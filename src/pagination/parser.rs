//! Pagination header parsing

use super::types::Cursor;
use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use std::str::FromStr;

/// Current page header
pub const HEADER_PAGE: &str = "x-page";
/// Next page header
pub const HEADER_NEXT_PAGE: &str = "x-next-page";
/// Previous page header
pub const HEADER_PREV_PAGE: &str = "x-prev-page";
/// Total pages header
pub const HEADER_TOTAL_PAGES: &str = "x-total-pages";
/// Items per page header
pub const HEADER_PER_PAGE: &str = "x-per-page";
/// Total items header
pub const HEADER_TOTAL: &str = "x-total";

/// Read a [`Cursor`] from response headers
///
/// Absent headers leave their field empty. GitLab sends `X-Next-Page`
/// and `X-Prev-Page` with an empty value on the last and first page, so an
/// empty value counts as absent too.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] when a value is not a plain run of
/// decimal digits (no sign), and [`Error::ConflictingHeader`] when a header
/// is repeated with differing values.
pub fn parse_cursor(headers: &HeaderMap) -> Result<Cursor> {
    Ok(Cursor {
        page: header_int(headers, HEADER_PAGE)?,
        next_page: header_int(headers, HEADER_NEXT_PAGE)?,
        prev_page: header_int(headers, HEADER_PREV_PAGE)?,
        total_pages: header_int(headers, HEADER_TOTAL_PAGES)?,
        per_page: header_int(headers, HEADER_PER_PAGE)?,
        total_items: header_int(headers, HEADER_TOTAL)?,
    })
}

/// Read a single-valued integer header
fn header_int<T: FromStr>(headers: &HeaderMap, name: &str) -> Result<Option<T>> {
    let mut values = Vec::new();
    for raw in headers.get_all(name) {
        let value = raw
            .to_str()
            .map_err(|_| Error::invalid_header(name, String::from_utf8_lossy(raw.as_bytes())))?
            .trim();
        if !values.iter().any(|seen: &String| seen == value) {
            values.push(value.to_string());
        }
    }

    match values.len() {
        0 => Ok(None),
        1 => {
            let value = &values[0];
            if value.is_empty() {
                return Ok(None);
            }
            if !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_header(name, value.as_str()));
            }
            value
                .parse::<T>()
                .map(Some)
                .map_err(|_| Error::invalid_header(name, value.as_str()))
        }
        _ => Err(Error::ConflictingHeader {
            name: name.to_string(),
            values,
        }),
    }
}
