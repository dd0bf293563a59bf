//! Page descriptor module
//!
//! A [`Query`] names one page of a listing endpoint: a path plus its
//! query parameters. Derived pages are produced with [`Query::with_page`],
//! which deep-copies the parameter map so a derivative never aliases its
//! parent or its siblings.

mod types;

pub use types::{PageKey, Query, QueryDefaults, PAGE_PARAM};
