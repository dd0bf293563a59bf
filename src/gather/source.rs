//! Fetch-then-decode step shared by both stages

use crate::decode::Decoder;
use crate::error::{Error, Result};
use crate::http::Fetcher;
use crate::query::Query;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

/// A fetcher paired with the decoder for its pages
#[derive(Debug)]
pub struct PageSource<F, D> {
    fetcher: F,
    decoder: D,
}

impl<F: Fetcher, D> PageSource<F, D> {
    /// Pair a fetcher with a decoder
    pub fn new(fetcher: F, decoder: D) -> Self {
        Self { fetcher, decoder }
    }

    /// Fetch and decode one page
    ///
    /// Fails with [`Error::Cancelled`] without touching the network once
    /// `cancel` has fired.
    pub async fn load<T>(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<(HeaderMap, T)>
    where
        D: Decoder<T>,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let page = self.fetcher.fetch(query, cancel).await?;
        let value = self.decoder.decode(&page)?;
        Ok((page.headers, value))
    }
}
