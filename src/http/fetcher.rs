//! Single-page fetch capability

use super::client::HttpClient;
use crate::error::{Error, Result};
use crate::query::Query;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One undecoded response
#[derive(Debug, Clone)]
pub struct RawPage {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

impl RawPage {
    /// Create a page from its parts
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Create a 200 page with no headers
    pub fn from_body(body: impl Into<Bytes>) -> Self {
        Self::new(200, HeaderMap::new(), body)
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|e| Error::decode(format!("Response body is not UTF-8: {e}")))
    }
}

/// Performs one GET for a page descriptor
///
/// Implementations must be safe to call from many tasks at once and should
/// return [`Error::Cancelled`] promptly once `cancel` fires.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the page described by `query`
    async fn fetch(&self, query: &Query, cancel: &CancellationToken) -> Result<RawPage>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, query: &Query, cancel: &CancellationToken) -> Result<RawPage> {
        (**self).fetch(query, cancel).await
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, query: &Query, cancel: &CancellationToken) -> Result<RawPage> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Fetch of {} cancelled", query);
                Err(Error::Cancelled)
            }
            page = self.get_page(query) => page,
        }
    }
}
