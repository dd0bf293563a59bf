//! Decoder types and traits
//!
//! Defines the core decoder abstraction.

use crate::error::Result;
use crate::http::RawPage;
use std::sync::Arc;

/// Strategy for decoding a raw page into a typed value
pub trait Decoder<T>: Send + Sync {
    /// Decode the page body
    fn decode(&self, page: &RawPage) -> Result<T>;
}

impl<T, D: Decoder<T> + ?Sized> Decoder<T> for Arc<D> {
    fn decode(&self, page: &RawPage) -> Result<T> {
        (**self).decode(page)
    }
}

impl<T, D: Decoder<T> + ?Sized> Decoder<T> for Box<D> {
    fn decode(&self, page: &RawPage) -> Result<T> {
        (**self).decode(page)
    }
}
