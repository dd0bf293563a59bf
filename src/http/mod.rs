//! HTTP client module
//!
//! Provides the single-request capability the gather pipeline consumes:
//! one authenticated GET per page descriptor, returning status, headers and
//! the raw body.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Private Tokens**: `PRIVATE-TOKEN` header for GitLab-style APIs
//! - **Cancellation**: fetches abort when their token is cancelled

mod client;
mod fetcher;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use fetcher::{Fetcher, RawPage};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
